// GPU-side uniform blocks. Field order and padding mirror the WGSL structs
// in shaders/uniforms.wgsl and shaders/screen.wgsl; see `shader` for the
// startup check that keeps them in agreement.

use glam::Mat4;

use crate::lights::{DirectionalLight, PointLight, SpotLight};
use crate::math::normal_matrix;
use crate::state::ProgramState;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightUniform {
    position: [f32; 3],
    att_constant: f32,
    ambient: [f32; 3],
    att_linear: f32,
    diffuse: [f32; 3],
    att_quadratic: f32,
    specular: [f32; 3],
    padding: f32,
}

impl From<&PointLight> for PointLightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.to_array(),
            att_constant: light.constant,
            ambient: light.ambient.to_array(),
            att_linear: light.linear,
            diffuse: light.diffuse.to_array(),
            att_quadratic: light.quadratic,
            specular: light.specular.to_array(),
            padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpotLightUniform {
    position: [f32; 3],
    att_constant: f32,
    direction: [f32; 3],
    att_linear: f32,
    ambient: [f32; 3],
    att_quadratic: f32,
    diffuse: [f32; 3],
    cut_off: f32,
    specular: [f32; 3],
    outer_cut_off: f32,
}

impl From<&SpotLight> for SpotLightUniform {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: light.position.to_array(),
            att_constant: light.constant,
            direction: light.direction.to_array(),
            att_linear: light.linear,
            ambient: light.ambient.to_array(),
            att_quadratic: light.quadratic,
            diffuse: light.diffuse.to_array(),
            cut_off: light.cut_off,
            specular: light.specular.to_array(),
            outer_cut_off: light.outer_cut_off,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirLightUniform {
    direction: [f32; 3],
    padding0: f32,
    ambient: [f32; 3],
    padding1: f32,
    diffuse: [f32; 3],
    padding2: f32,
    specular: [f32; 3],
    padding3: f32,
}

impl From<&DirectionalLight> for DirLightUniform {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction.to_array(),
            padding0: 0.0,
            ambient: light.ambient.to_array(),
            padding1: 0.0,
            diffuse: light.diffuse.to_array(),
            padding2: 0.0,
            specular: light.specular.to_array(),
            padding3: 0.0,
        }
    }
}

/// Per-frame block bound at group 0 by every scene pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    view_position: [f32; 3],
    spot_light_enabled: u32,
    point_light: PointLightUniform,
    spot_light: SpotLightUniform,
    dir_light: DirLightUniform,
}

impl FrameUniforms {
    pub fn new(state: &ProgramState, aspect_ratio: f32) -> Self {
        let camera = &state.camera;
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection(aspect_ratio).to_cols_array_2d(),
            view_position: camera.position.to_array(),
            spot_light_enabled: u32::from(state.spot_light_enabled),
            point_light: (&state.point_light).into(),
            spot_light: (&state.spot_light).into(),
            dir_light: (&state.dir_light).into(),
        }
    }
}

/// Per-object block bound at group 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    shininess: f32,
    padding: [f32; 3],
}

impl ObjectUniforms {
    pub fn new(model: Mat4, shininess: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            shininess,
            padding: [0.0; 3],
        }
    }
}

/// Screen pass parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenUniforms {
    texel_size: [f32; 2],
    blur_enabled: u32,
    padding: u32,
}

impl ScreenUniforms {
    pub fn new(width: u32, height: u32, blur_enabled: bool) -> Self {
        Self {
            texel_size: [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32],
            blur_enabled: u32::from(blur_enabled),
            padding: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::mem::size_of;

    #[test]
    fn sizes_match_wgsl_layout() {
        assert_eq!(size_of::<PointLightUniform>(), 64);
        assert_eq!(size_of::<SpotLightUniform>(), 80);
        assert_eq!(size_of::<DirLightUniform>(), 64);
        assert_eq!(size_of::<FrameUniforms>(), 352);
        assert_eq!(size_of::<ObjectUniforms>(), 144);
        assert_eq!(size_of::<ScreenUniforms>(), 16);
    }

    #[test]
    fn frame_uniforms_follow_state() {
        let mut state = ProgramState::new();
        state.camera.position = Vec3::new(1.0, 1.0, 1.0);
        state.spot_light_enabled = true;
        state.attach_spot_light_to_camera();

        let uniforms = FrameUniforms::new(&state, 4.0 / 3.0);
        assert_eq!(uniforms.view_position, [1.0, 1.0, 1.0]);
        assert_eq!(uniforms.spot_light_enabled, 1);
        assert_eq!(uniforms.spot_light.position, [1.0, 1.0, 1.0]);
        assert_eq!(uniforms.spot_light.direction, state.camera.front.to_array());
        assert_eq!(uniforms.point_light.att_quadratic, 0.032);
    }

    #[test]
    fn screen_texel_size_tracks_target() {
        let uniforms = ScreenUniforms::new(800, 600, true);
        assert_eq!(uniforms.texel_size, [1.0 / 800.0, 1.0 / 600.0]);
        assert_eq!(uniforms.blur_enabled, 1);
        assert_eq!(ScreenUniforms::new(0, 0, false).texel_size, [1.0, 1.0]);
    }
}
