//! Wavefront OBJ/MTL reader for the scene models.
//!
//! Handles `v`, `vt`, `vn`, `f`, `usemtl` and `mtllib`. Polygons are
//! triangulated as fans and a new mesh starts whenever the material
//! changes. Vertices are deduplicated per mesh. Corners without a normal
//! get the normal of their face.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::error::{ViewerError, ViewerResult};
use crate::geometry::ModelVertex;

/// Material definition from an MTL library. Texture paths are resolved
/// against the directory of the library.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjMaterial {
    pub name: String,
    pub diffuse_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub shininess: f32,
    pub diffuse_texture: Option<PathBuf>,
    pub specular_texture: Option<PathBuf>,
}

impl ObjMaterial {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse_color: [0.8; 3],
            specular_color: [0.0; 3],
            shininess: 32.0,
            diffuse_texture: None,
            specular_texture: None,
        }
    }
}

/// Triangles sharing one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub material: Option<String>,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjModel {
    pub meshes: Vec<ObjMesh>,
    pub materials: Vec<ObjMaterial>,
}

impl ObjModel {
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

/// Reads an OBJ file together with the material libraries it references.
pub fn load_obj(path: &Path) -> ViewerResult<ObjModel> {
    let file = File::open(path).map_err(|e| ViewerError::io(path, e))?;
    let model = parse_obj(BufReader::new(file), path)?;
    log::debug!(
        "{}: {} meshes, {} triangles, {} materials",
        path.display(),
        model.meshes.len(),
        model.triangle_count(),
        model.materials.len()
    );
    Ok(model)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NormalRef {
    Index(usize),
    /// Bits of a computed face normal.
    Face([u32; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    uv: Option<usize>,
    normal: NormalRef,
}

/// One `v/vt/vn` corner of a face, still in file numbering.
#[derive(Debug, Clone, Copy)]
struct Corner {
    position: i64,
    uv: Option<i64>,
    normal: Option<i64>,
}

fn parse_corner(token: &str) -> Result<Corner, String> {
    let mut parts = token.split('/');
    let index = |part: Option<&str>| -> Result<Option<i64>, String> {
        match part {
            None | Some("") => Ok(None),
            Some(s) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("invalid index `{s}` in `{token}`")),
        }
    };
    let position =
        index(parts.next())?.ok_or_else(|| format!("face corner `{token}` has no position"))?;
    let uv = index(parts.next())?;
    let normal = index(parts.next())?;
    Ok(Corner {
        position,
        uv,
        normal,
    })
}

/// Maps a 1-based or negative (relative) index onto `0..len`.
fn resolve_index(index: i64, len: usize, what: &str) -> Result<usize, String> {
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len as i64 + i,
        _ => return Err(format!("{what} index 0 is not valid")),
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(format!("{what} index {index} out of range (have {len})"));
    }
    Ok(resolved as usize)
}

fn parse_floats<const N: usize>(
    tokens: &mut std::str::SplitWhitespace<'_>,
    required: usize,
) -> Result<[f32; N], String> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        match tokens.next() {
            Some(t) => *slot = t.parse().map_err(|_| format!("invalid number `{t}`"))?,
            None if i < required => return Err(format!("expected {required} numbers")),
            None => break,
        }
    }
    Ok(out)
}

struct MeshBuilder {
    mesh: ObjMesh,
    lookup: HashMap<VertexKey, u32>,
}

impl MeshBuilder {
    fn new(material: Option<String>) -> Self {
        Self {
            mesh: ObjMesh {
                material,
                ..ObjMesh::default()
            },
            lookup: HashMap::new(),
        }
    }

    fn push(&mut self, key: VertexKey, vertex: impl FnOnce() -> ModelVertex) {
        let next = self.mesh.vertices.len() as u32;
        let index = *self.lookup.entry(key).or_insert_with(|| {
            self.mesh.vertices.push(vertex());
            next
        });
        self.mesh.indices.push(index);
    }
}

/// Parses OBJ text. `path` locates `mtllib` references and labels errors.
pub fn parse_obj<R: BufRead>(reader: R, path: &Path) -> ViewerResult<ObjModel> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();

    let mut materials: Vec<ObjMaterial> = Vec::new();
    let mut meshes: Vec<ObjMesh> = Vec::new();
    let mut current = MeshBuilder::new(None);

    for (line_index, line) in reader.lines().enumerate() {
        let line_no = line_index + 1;
        let line = line.map_err(|e| ViewerError::io(path, e))?;
        let err = |message: String| ViewerError::obj(path, line_no, message);

        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let mut tokens = s.split_whitespace();
        let tag = tokens.next().unwrap_or_default();
        match tag {
            "v" => positions.push(Vec3::from(parse_floats::<3>(&mut tokens, 3).map_err(err)?)),
            "vt" => uvs.push(parse_floats::<2>(&mut tokens, 1).map_err(err)?),
            "vn" => normals.push(Vec3::from(parse_floats::<3>(&mut tokens, 3).map_err(err)?)),
            "usemtl" => {
                let name = tokens.next().map(str::to_owned);
                if name != current.mesh.material {
                    let finished = std::mem::replace(&mut current, MeshBuilder::new(name));
                    if !finished.mesh.indices.is_empty() {
                        meshes.push(finished.mesh);
                    }
                }
            }
            "mtllib" => {
                for library in tokens {
                    let mtl_path = base_dir.join(library);
                    match File::open(&mtl_path) {
                        Ok(file) => materials.extend(parse_mtl(BufReader::new(file), &mtl_path)?),
                        // models still render with fallback materials
                        Err(e) => log::warn!("{}: {e}", mtl_path.display()),
                    }
                }
            }
            "f" => {
                let corners = tokens
                    .map(parse_corner)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(err)?;
                if corners.len() < 3 {
                    return Err(err(format!(
                        "face has {} corners, need at least 3",
                        corners.len()
                    )));
                }

                let mut keys = Vec::with_capacity(corners.len());
                for corner in &corners {
                    let position =
                        resolve_index(corner.position, positions.len(), "position").map_err(err)?;
                    let uv = corner
                        .uv
                        .map(|i| resolve_index(i, uvs.len(), "texture coordinate"))
                        .transpose()
                        .map_err(err)?;
                    let normal = corner
                        .normal
                        .map(|i| resolve_index(i, normals.len(), "normal"))
                        .transpose()
                        .map_err(err)?;
                    keys.push((position, uv, normal));
                }

                for t in 1..keys.len() - 1 {
                    let triangle = [keys[0], keys[t], keys[t + 1]];
                    let [a, b, c] = triangle.map(|(p, _, _)| positions[p]);
                    let face_normal = (b - a).cross(c - a).normalize_or_zero();

                    for (position, uv, normal) in triangle {
                        let normal_ref = match normal {
                            Some(n) => NormalRef::Index(n),
                            None => NormalRef::Face(face_normal.to_array().map(f32::to_bits)),
                        };
                        let key = VertexKey {
                            position,
                            uv,
                            normal: normal_ref,
                        };
                        current.push(key, || ModelVertex {
                            position: positions[position].to_array(),
                            normal: normal.map_or(face_normal, |n| normals[n]).to_array(),
                            uv: uv.map_or([0.0, 0.0], |i| uvs[i]),
                        });
                    }
                }
            }
            // groups, smoothing and the rest do not affect drawing
            _ => {}
        }
    }

    if !current.mesh.indices.is_empty() {
        meshes.push(current.mesh);
    }

    Ok(ObjModel { meshes, materials })
}

/// Parses MTL text. Texture paths are taken relative to `path`'s directory.
pub fn parse_mtl<R: BufRead>(reader: R, path: &Path) -> ViewerResult<Vec<ObjMaterial>> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut materials = Vec::new();
    let mut current: Option<ObjMaterial> = None;

    for (line_index, line) in reader.lines().enumerate() {
        let line_no = line_index + 1;
        let line = line.map_err(|e| ViewerError::io(path, e))?;
        let err = |message: String| ViewerError::obj(path, line_no, message);

        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let mut tokens = s.split_whitespace();
        let tag = tokens.next().unwrap_or_default();

        if tag == "newmtl" {
            let name = tokens
                .next()
                .ok_or_else(|| err("`newmtl` without a name".into()))?;
            materials.extend(current.replace(ObjMaterial::named(name)));
            continue;
        }

        let Some(material) = current.as_mut() else {
            continue;
        };
        match tag {
            "Kd" => material.diffuse_color = parse_floats::<3>(&mut tokens, 3).map_err(err)?,
            "Ks" => material.specular_color = parse_floats::<3>(&mut tokens, 3).map_err(err)?,
            "Ns" => material.shininess = parse_floats::<1>(&mut tokens, 1).map_err(err)?[0],
            // options such as `-s 1 1 1` precede the file name
            "map_Kd" => material.diffuse_texture = tokens.last().map(|f| base_dir.join(f)),
            "map_Ks" => material.specular_texture = tokens.last().map(|f| base_dir.join(f)),
            _ => {}
        }
    }
    materials.extend(current);

    Ok(materials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ViewerResult<ObjModel> {
        parse_obj(text.as_bytes(), Path::new("models/test.obj"))
    }

    #[test]
    fn quads_are_fan_triangulated_and_shared_corners_reused() {
        let model = parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             vn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1 4/4/1\n",
        )
        .unwrap();

        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[2].uv, [1.0, 1.0]);
        assert_eq!(mesh.vertices[3].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.material, None);
    }

    #[test]
    fn negative_indices_count_back_from_the_end() {
        let model = parse("v 0 0 0\nv 2 0 0\nv 0 2 0\nf -3 -2 -1\n").unwrap();
        let positions: Vec<_> = model.meshes[0].vertices.iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]]);
    }

    #[test]
    fn missing_normals_fall_back_to_face_normal() {
        let model = parse("v 0 0 0\nv 0 0 1\nv 1 0 0\nf 1 2 3\n").unwrap();
        for v in &model.meshes[0].vertices {
            assert!(Vec3::from(v.normal).abs_diff_eq(Vec3::Y, 1e-6), "{:?}", v.normal);
            assert_eq!(v.uv, [0.0, 0.0]);
        }
    }

    #[test]
    fn material_changes_split_meshes() {
        let model = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
             usemtl wood\nf 1 2 3\nf 2 4 3\n\
             usemtl glass\nf 1 2 4\n\
             usemtl glass\nf 1 4 3\n",
        )
        .unwrap();

        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].material.as_deref(), Some("wood"));
        assert_eq!(model.meshes[0].indices.len(), 6);
        assert_eq!(model.meshes[1].material.as_deref(), Some("glass"));
        assert_eq!(model.meshes[1].indices.len(), 6);
        // indices restart in each mesh
        assert_eq!(model.meshes[1].indices[0], 0);
        assert_eq!(model.triangle_count(), 4);
    }

    #[test]
    fn errors_name_the_line() {
        let error = parse("v 0 0 0\nv 1 0 0\n# comment\nf 1 2 7\n").unwrap_err();
        match error {
            ViewerError::Obj { path, line, message } => {
                assert_eq!(path, Path::new("models/test.obj"));
                assert_eq!(line, 4);
                assert!(message.contains("out of range"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(
            parse("v 0 0\n"),
            Err(ViewerError::Obj { line: 1, .. })
        ));
        assert!(matches!(
            parse("v 0 0 0\nv 1 0 0\nf 1 2\n"),
            Err(ViewerError::Obj { line: 3, .. })
        ));
        assert!(matches!(
            parse("v 0 0 0\nf 0 1 1\n"),
            Err(ViewerError::Obj { line: 2, .. })
        ));
    }

    #[test]
    fn mtl_textures_resolve_next_to_the_library() {
        let text = "\
            # exported\n\
            newmtl porcelain\n\
            Kd 0.9 0.9 0.85\n\
            Ks 0.5 0.5 0.5\n\
            Ns 96\n\
            map_Kd cup_diffuse.png\n\
            map_Ks -s 1 1 1 cup_specular.png\n\
            newmtl plain\n";
        let materials = parse_mtl(text.as_bytes(), Path::new("objects/cup/cup.mtl")).unwrap();

        assert_eq!(materials.len(), 2);
        let porcelain = &materials[0];
        assert_eq!(porcelain.name, "porcelain");
        assert_eq!(porcelain.diffuse_color, [0.9, 0.9, 0.85]);
        assert_eq!(porcelain.specular_color, [0.5, 0.5, 0.5]);
        assert_eq!(porcelain.shininess, 96.0);
        assert_eq!(
            porcelain.diffuse_texture.as_deref(),
            Some(Path::new("objects/cup/cup_diffuse.png"))
        );
        assert_eq!(
            porcelain.specular_texture.as_deref(),
            Some(Path::new("objects/cup/cup_specular.png"))
        );
        assert_eq!(materials[1], ObjMaterial::named("plain"));
    }

    #[test]
    fn load_obj_reads_referenced_libraries() {
        let dir = std::env::temp_dir().join(format!("tearoom-3d-obj-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("box.mtl"), "newmtl red\nKd 1 0 0\n").unwrap();
        std::fs::write(
            dir.join("box.obj"),
            "mtllib box.mtl missing.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n",
        )
        .unwrap();

        let model = load_obj(&dir.join("box.obj")).unwrap();
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.materials[0].diffuse_color, [1.0, 0.0, 0.0]);
        assert_eq!(model.meshes[0].material.as_deref(), Some("red"));

        assert!(matches!(
            load_obj(&dir.join("nope.obj")),
            Err(ViewerError::Io { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
