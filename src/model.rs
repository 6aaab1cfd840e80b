// GPU copies of loaded models

use std::path::Path;

use wgpu::util::DeviceExt;

use crate::error::ViewerResult;
use crate::geometry::ModelVertex;
use crate::obj::{self, ObjMaterial, ObjModel};
use crate::texture::{self, Texture};

/// Layout of bind group 2 in the lit shader: diffuse map, specular map, sampler.
pub fn material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("material bind group layout"),
        entries: &[
            texture_entry(0),
            texture_entry(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Diffuse and specular maps bound together.
pub struct Material {
    pub name: String,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        name: &str,
        diffuse: &Texture,
        specular: &Texture,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(name),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self {
            name: name.to_owned(),
            bind_group,
        }
    }

    /// Uploads the maps named by an MTL entry, substituting solid colours for
    /// maps that are absent or unreadable.
    fn from_obj(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        material: &ObjMaterial,
    ) -> Self {
        let map = |path: &Option<std::path::PathBuf>, color: [f32; 3], kind: &str| {
            let fallback = texture::color_to_rgba(color);
            match path {
                Some(path) => Texture::load_or(device, queue, path, fallback),
                None => Texture::solid(device, queue, fallback, &format!("{} {kind}", material.name)),
            }
        };
        let diffuse = map(&material.diffuse_texture, material.diffuse_color, "diffuse");
        let specular = map(&material.specular_texture, material.specular_color, "specular");
        log::debug!("material `{}` (Ns {})", material.name, material.shininess);
        Self::new(device, layout, sampler, &material.name, &diffuse, &specular)
    }
}

pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material: usize,
}

/// A model ready to draw: one buffer pair per mesh plus its materials.
pub struct GpuModel {
    meshes: Vec<GpuMesh>,
    materials: Vec<Material>,
}

impl GpuModel {
    /// Reads an OBJ file and uploads it.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        path: &Path,
    ) -> ViewerResult<Self> {
        let model = obj::load_obj(path)?;
        let name = path
            .file_stem()
            .map_or_else(|| path.to_string_lossy(), |s| s.to_string_lossy());
        log::info!("loaded model {}", path.display());
        Ok(Self::upload(device, queue, layout, sampler, &name, &model))
    }

    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        name: &str,
        model: &ObjModel,
    ) -> Self {
        let mut materials: Vec<Material> = model
            .materials
            .iter()
            .map(|m| Material::from_obj(device, queue, layout, sampler, m))
            .collect();

        let mut meshes = Vec::with_capacity(model.meshes.len());
        for (i, mesh) in model.meshes.iter().enumerate() {
            let found = mesh
                .material
                .as_deref()
                .and_then(|wanted| materials.iter().position(|m| m.name == wanted));
            let material = match found {
                Some(index) => index,
                None => {
                    if let Some(wanted) = &mesh.material {
                        log::warn!("{name}: material `{wanted}` is not defined");
                    }
                    let fallback = ObjMaterial::named(format!("{name} default"));
                    materials.push(Material::from_obj(device, queue, layout, sampler, &fallback));
                    materials.len() - 1
                }
            };

            meshes.push(GpuMesh {
                vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{name} vertices {i}")),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{name} indices {i}")),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
                material,
            });
        }

        log::debug!(
            "{name}: {} meshes, {} materials, {} triangles",
            meshes.len(),
            materials.len(),
            model.triangle_count()
        );
        Self { meshes, materials }
    }

    /// A single mesh drawn with a prepared material. Used for the painting box.
    pub fn from_vertices(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        material: Material,
    ) -> Self {
        let indices: Vec<u32> = (0..vertices.len() as u32).collect();
        let mesh = GpuMesh {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} vertices")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} indices")),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
            material: 0,
        };
        Self {
            meshes: vec![mesh],
            materials: vec![material],
        }
    }

    /// Draws every mesh. Groups 0 and 1 must already be bound.
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        for mesh in &self.meshes {
            pass.set_bind_group(2, &self.materials[mesh.material].bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
