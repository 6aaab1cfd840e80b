//! WGSL sources and the uniform contract checked before compilation.
//!
//! Host code never addresses uniforms by free-form strings. Every value it
//! uploads is a [`UniformField`], and each shader lists the fields it relies
//! on. At startup the WGSL text is scanned for its struct declarations and
//! `var<uniform>` bindings, and every field must resolve with the expected
//! type and in layout order, so a renamed or reordered member fails loudly
//! instead of reading garbage.

use std::collections::HashMap;

use crate::error::ShaderError;

const UNIFORMS_WGSL: &str = include_str!("shaders/uniforms.wgsl");
const LIT_WGSL: &str = include_str!("shaders/lit.wgsl");
const LAMP_WGSL: &str = include_str!("shaders/lamp.wgsl");
const SCREEN_WGSL: &str = include_str!("shaders/screen.wgsl");

/// Every uniform value the host writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformField {
    View,
    Projection,
    ViewPosition,
    SpotLightEnabled,
    PointLightPosition,
    PointLightConstant,
    PointLightAmbient,
    PointLightLinear,
    PointLightDiffuse,
    PointLightQuadratic,
    PointLightSpecular,
    SpotLightPosition,
    SpotLightConstant,
    SpotLightDirection,
    SpotLightLinear,
    SpotLightAmbient,
    SpotLightQuadratic,
    SpotLightDiffuse,
    SpotLightCutOff,
    SpotLightSpecular,
    SpotLightOuterCutOff,
    DirLightDirection,
    DirLightAmbient,
    DirLightDiffuse,
    DirLightSpecular,
    Model,
    NormalMatrix,
    Shininess,
    TexelSize,
    BlurEnabled,
}

const MAT4: &str = "mat4x4<f32>";
const VEC3: &str = "vec3<f32>";
const VEC2: &str = "vec2<f32>";
const F32: &str = "f32";
const U32: &str = "u32";

impl UniformField {
    /// Dotted path from the uniform binding to the member.
    pub const fn path(self) -> &'static str {
        use UniformField::*;
        match self {
            View => "frame.view",
            Projection => "frame.projection",
            ViewPosition => "frame.view_position",
            SpotLightEnabled => "frame.spot_light_enabled",
            PointLightPosition => "frame.point_light.position",
            PointLightConstant => "frame.point_light.att_constant",
            PointLightAmbient => "frame.point_light.ambient",
            PointLightLinear => "frame.point_light.att_linear",
            PointLightDiffuse => "frame.point_light.diffuse",
            PointLightQuadratic => "frame.point_light.att_quadratic",
            PointLightSpecular => "frame.point_light.specular",
            SpotLightPosition => "frame.spot_light.position",
            SpotLightConstant => "frame.spot_light.att_constant",
            SpotLightDirection => "frame.spot_light.direction",
            SpotLightLinear => "frame.spot_light.att_linear",
            SpotLightAmbient => "frame.spot_light.ambient",
            SpotLightQuadratic => "frame.spot_light.att_quadratic",
            SpotLightDiffuse => "frame.spot_light.diffuse",
            SpotLightCutOff => "frame.spot_light.cut_off",
            SpotLightSpecular => "frame.spot_light.specular",
            SpotLightOuterCutOff => "frame.spot_light.outer_cut_off",
            DirLightDirection => "frame.dir_light.direction",
            DirLightAmbient => "frame.dir_light.ambient",
            DirLightDiffuse => "frame.dir_light.diffuse",
            DirLightSpecular => "frame.dir_light.specular",
            Model => "object.model",
            NormalMatrix => "object.normal_matrix",
            Shininess => "object.shininess",
            TexelSize => "screen.texel_size",
            BlurEnabled => "screen.blur_enabled",
        }
    }

    pub const fn wgsl_type(self) -> &'static str {
        use UniformField::*;
        match self {
            View | Projection | Model | NormalMatrix => MAT4,
            SpotLightEnabled | BlurEnabled => U32,
            PointLightConstant | PointLightLinear | PointLightQuadratic | SpotLightConstant
            | SpotLightLinear | SpotLightQuadratic | SpotLightCutOff | SpotLightOuterCutOff
            | Shininess => F32,
            TexelSize => VEC2,
            _ => VEC3,
        }
    }
}

const FRAME_FIELDS: &[UniformField] = {
    use UniformField::*;
    &[
        View,
        Projection,
        ViewPosition,
        SpotLightEnabled,
        PointLightPosition,
        PointLightConstant,
        PointLightAmbient,
        PointLightLinear,
        PointLightDiffuse,
        PointLightQuadratic,
        PointLightSpecular,
        SpotLightPosition,
        SpotLightConstant,
        SpotLightDirection,
        SpotLightLinear,
        SpotLightAmbient,
        SpotLightQuadratic,
        SpotLightDiffuse,
        SpotLightCutOff,
        SpotLightSpecular,
        SpotLightOuterCutOff,
        DirLightDirection,
        DirLightAmbient,
        DirLightDiffuse,
        DirLightSpecular,
    ]
};

const OBJECT_FIELDS: &[UniformField] = &[
    UniformField::Model,
    UniformField::NormalMatrix,
    UniformField::Shininess,
];

/// A shader program and the uniform fields the host feeds it.
#[derive(Debug, Clone, Copy)]
pub struct ShaderContract {
    pub name: &'static str,
    /// WGSL pieces concatenated into the module source.
    pub sources: &'static [&'static str],
    pub uniform_groups: &'static [&'static [UniformField]],
}

pub const LIT: ShaderContract = ShaderContract {
    name: "lit",
    sources: &[UNIFORMS_WGSL, LIT_WGSL],
    uniform_groups: &[FRAME_FIELDS, OBJECT_FIELDS],
};

pub const LAMP: ShaderContract = ShaderContract {
    name: "lamp",
    sources: &[UNIFORMS_WGSL, LAMP_WGSL],
    uniform_groups: &[FRAME_FIELDS, &[UniformField::Model]],
};

pub const SCREEN: ShaderContract = ShaderContract {
    name: "screen",
    sources: &[SCREEN_WGSL],
    uniform_groups: &[&[UniformField::TexelSize, UniformField::BlurEnabled]],
};

impl ShaderContract {
    /// Full WGSL source for this program.
    pub fn source(&self) -> String {
        self.sources.join("\n")
    }

    fn fields(&self) -> impl Iterator<Item = UniformField> + '_ {
        self.uniform_groups.iter().flat_map(|group| group.iter().copied())
    }

    /// Checks `source` against this contract.
    pub fn validate(&self, source: &str) -> Result<(), ShaderError> {
        let layout = WgslLayout::parse(source);
        let mut last_seen: HashMap<String, (usize, &'static str)> = HashMap::new();

        for field in self.fields() {
            let path = field.path();
            let mut segments = path.split('.');
            let binding = segments.next().unwrap_or_default();
            let mut ty = layout
                .uniforms
                .get(binding)
                .ok_or_else(|| ShaderError::MissingBinding {
                    shader: self.name,
                    binding: binding.to_owned(),
                })?
                .clone();
            let mut parent = binding.to_owned();

            for member in segments {
                let members = layout
                    .structs
                    .get(&ty)
                    .ok_or_else(|| ShaderError::MissingStruct {
                        shader: self.name,
                        name: ty.clone(),
                    })?;
                let (index, (_, member_ty)) = members
                    .iter()
                    .enumerate()
                    .find(|(_, (name, _))| name == member)
                    .ok_or(ShaderError::MissingField {
                        shader: self.name,
                        path,
                    })?;

                if let Some(&(previous_index, previous)) = last_seen.get(&parent) {
                    if index < previous_index {
                        return Err(ShaderError::OutOfOrder {
                            shader: self.name,
                            path,
                            previous,
                        });
                    }
                }
                last_seen.insert(parent.clone(), (index, path));

                ty = member_ty.clone();
                parent.push('.');
                parent.push_str(member);
            }

            if ty != field.wgsl_type() {
                return Err(ShaderError::TypeMismatch {
                    shader: self.name,
                    path,
                    expected: field.wgsl_type(),
                    found: ty,
                });
            }
        }
        Ok(())
    }

    /// Validates and compiles the program.
    pub fn create_module(&self, device: &wgpu::Device) -> Result<wgpu::ShaderModule, ShaderError> {
        let source = self.source();
        self.validate(&source)?;
        log::debug!("shader `{}` satisfies {} uniform fields", self.name, self.fields().count());
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }
}

/// Struct members and uniform bindings declared in a WGSL module.
#[derive(Debug, Default)]
struct WgslLayout {
    structs: HashMap<String, Vec<(String, String)>>,
    uniforms: HashMap<String, String>,
}

impl WgslLayout {
    fn parse(source: &str) -> Self {
        let text: String = source
            .lines()
            .map(|line| line.split("//").next().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");

        let mut layout = WgslLayout::default();

        let mut rest = text.as_str();
        while let Some(start) = find_keyword(rest, "struct") {
            let after = &rest[start + "struct".len()..];
            let (Some(open), Some(close)) = (after.find('{'), after.find('}')) else {
                break;
            };
            if close < open {
                rest = &after[close + 1..];
                continue;
            }
            let name = after[..open].trim().to_owned();
            let members = after[open + 1..close]
                .split(',')
                .filter_map(parse_member)
                .collect();
            layout.structs.insert(name, members);
            rest = &after[close + 1..];
        }

        let mut rest = text.as_str();
        while let Some(start) = rest.find("var<uniform>") {
            let after = &rest[start + "var<uniform>".len()..];
            let end = after.find(';').unwrap_or(after.len());
            if let Some((name, ty)) = parse_member(&after[..end]) {
                layout.uniforms.insert(name, ty);
            }
            rest = &after[end..];
        }

        layout
    }
}

/// Finds `keyword` as a whole word.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let mut offset = 0;
    while let Some(found) = text[offset..].find(keyword) {
        let start = offset + found;
        let end = start + keyword.len();
        let before_ok = text[..start].chars().next_back().map_or(true, |c| !is_ident(c));
        let after_ok = text[end..].chars().next().map_or(true, |c| !is_ident(c));
        if before_ok && after_ok {
            return Some(start);
        }
        offset = end;
    }
    None
}

/// Parses `@attr(..) name: type` into `(name, type)` with whitespace removed
/// from the type.
fn parse_member(member: &str) -> Option<(String, String)> {
    let mut member = member.trim();
    while let Some(attr) = member.strip_prefix('@') {
        let ident_end = attr
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(attr.len());
        let mut remaining = attr[ident_end..].trim_start();
        if remaining.starts_with('(') {
            let close = remaining.find(')')?;
            remaining = &remaining[close + 1..];
        }
        member = remaining.trim_start();
    }

    let (name, ty) = member.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let ty: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
    Some((name.to_owned(), ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_shaders_satisfy_their_contracts() {
        for contract in [LIT, LAMP, SCREEN] {
            contract
                .validate(&contract.source())
                .unwrap_or_else(|e| panic!("{e}"));
        }
    }

    #[test]
    fn parses_structs_attributes_and_bindings() {
        let layout = WgslLayout::parse(
            "struct In { @location(0) pos: vec3<f32>, @builtin(position) clip : vec4< f32 >, }\n\
             // struct Hidden { a: f32 }\n\
             @group(0) @binding(0) var<uniform> data: In;",
        );
        assert_eq!(
            layout.structs["In"],
            vec![
                ("pos".to_owned(), "vec3<f32>".to_owned()),
                ("clip".to_owned(), "vec4<f32>".to_owned()),
            ]
        );
        assert!(!layout.structs.contains_key("Hidden"));
        assert_eq!(layout.uniforms["data"], "In");
    }

    #[test]
    fn renamed_member_is_reported() {
        let source = LIT.source().replacen("    cut_off: f32,", "    cutoff: f32,", 1);
        assert_eq!(
            LIT.validate(&source),
            Err(ShaderError::MissingField {
                shader: "lit",
                path: "frame.spot_light.cut_off",
            })
        );
    }

    #[test]
    fn mistyped_member_is_reported() {
        let source = SCREEN.source().replace("blur_enabled: u32", "blur_enabled: f32");
        assert!(matches!(
            SCREEN.validate(&source),
            Err(ShaderError::TypeMismatch { path: "screen.blur_enabled", .. })
        ));
    }

    #[test]
    fn reordered_members_are_reported() {
        let source = LAMP.source().replacen(
            "    view: mat4x4<f32>,\n    projection: mat4x4<f32>,",
            "    projection: mat4x4<f32>,\n    view: mat4x4<f32>,",
            1,
        );
        assert_eq!(
            LAMP.validate(&source),
            Err(ShaderError::OutOfOrder {
                shader: "lamp",
                path: "frame.projection",
                previous: "frame.view",
            })
        );
    }

    #[test]
    fn missing_binding_is_reported() {
        let source = LIT.source().replace("var<uniform> object", "var<uniform> instance");
        assert!(matches!(
            LIT.validate(&source),
            Err(ShaderError::MissingBinding { binding, .. }) if binding == "object"
        ));
    }

    #[test]
    fn every_field_has_a_wgsl_type() {
        for field in FRAME_FIELDS.iter().chain(OBJECT_FIELDS) {
            assert!(field.path().contains('.'));
            assert!(!field.wgsl_type().is_empty());
        }
    }
}
