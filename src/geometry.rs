// Hand-built meshes: the icosahedron lamp, the painting box and the
// full-screen quad used by the screen pass.

/// Vertex layout shared by loaded models and the painting.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Position-only vertex of the lamp.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LampVertex {
    pub position: [f32; 3],
}

impl LampVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LampVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Regular icosahedron centred on the origin, edge length `(5 - √5) / 5`.
pub fn lamp_vertices() -> [LampVertex; 12] {
    let t = (1.0 + 5f32.sqrt()) / 2.0;
    let u = (5.0 - 5f32.sqrt()) / 10.0;
    let ut = u * t;
    [
        [ut, u, 0.0],
        [-ut, u, 0.0],
        [ut, -u, 0.0],
        [-ut, -u, 0.0],
        [u, 0.0, ut],
        [u, 0.0, -ut],
        [-u, 0.0, ut],
        [-u, 0.0, -ut],
        [0.0, ut, u],
        [0.0, -ut, u],
        [0.0, ut, -u],
        [0.0, -ut, -u],
    ]
    .map(|position| LampVertex { position })
}

#[rustfmt::skip]
pub const LAMP_INDICES: [u32; 60] = [
    0, 8, 4,
    0, 5, 10,
    2, 4, 9,
    2, 11, 5,
    1, 6, 8,
    1, 10, 7,
    3, 9, 6,
    3, 7, 11,
    0, 10, 8,
    1, 8, 10,
    2, 9, 11,
    3, 11, 9,
    4, 2, 0,
    5, 0, 2,
    6, 1, 3,
    7, 3, 1,
    8, 6, 4,
    9, 4, 6,
    10, 5, 7,
    11, 7, 5,
];

/// Unit cube with per-face normals; the painting is a scaled copy of it.
pub fn painting_vertices() -> Vec<ModelVertex> {
    // (normal, four corners in fan order with their uvs)
    #[rustfmt::skip]
    let faces: [([f32; 3], [([f32; 3], [f32; 2]); 4]); 6] = [
        ([0.0, 0.0, -1.0], [
            ([-0.5, -0.5, -0.5], [0.0, 0.0]),
            ([ 0.5, -0.5, -0.5], [1.0, 0.0]),
            ([ 0.5,  0.5, -0.5], [1.0, 1.0]),
            ([-0.5,  0.5, -0.5], [0.0, 1.0]),
        ]),
        ([0.0, 0.0, 1.0], [
            ([-0.5, -0.5,  0.5], [0.0, 0.0]),
            ([ 0.5, -0.5,  0.5], [1.0, 0.0]),
            ([ 0.5,  0.5,  0.5], [1.0, 1.0]),
            ([-0.5,  0.5,  0.5], [0.0, 1.0]),
        ]),
        ([-1.0, 0.0, 0.0], [
            ([-0.5,  0.5,  0.5], [1.0, 0.0]),
            ([-0.5,  0.5, -0.5], [1.0, 1.0]),
            ([-0.5, -0.5, -0.5], [0.0, 1.0]),
            ([-0.5, -0.5,  0.5], [0.0, 0.0]),
        ]),
        ([1.0, 0.0, 0.0], [
            ([ 0.5,  0.5,  0.5], [1.0, 0.0]),
            ([ 0.5,  0.5, -0.5], [1.0, 1.0]),
            ([ 0.5, -0.5, -0.5], [0.0, 1.0]),
            ([ 0.5, -0.5,  0.5], [0.0, 0.0]),
        ]),
        ([0.0, -1.0, 0.0], [
            ([-0.5, -0.5, -0.5], [0.0, 1.0]),
            ([ 0.5, -0.5, -0.5], [1.0, 1.0]),
            ([ 0.5, -0.5,  0.5], [1.0, 0.0]),
            ([-0.5, -0.5,  0.5], [0.0, 0.0]),
        ]),
        ([0.0, 1.0, 0.0], [
            ([-0.5,  0.5, -0.5], [0.0, 1.0]),
            ([ 0.5,  0.5, -0.5], [1.0, 1.0]),
            ([ 0.5,  0.5,  0.5], [1.0, 0.0]),
            ([-0.5,  0.5,  0.5], [0.0, 0.0]),
        ]),
    ];

    faces
        .iter()
        .flat_map(|(normal, corners)| {
            [0, 1, 2, 2, 3, 0].map(|i| ModelVertex {
                position: corners[i].0,
                normal: *normal,
                uv: corners[i].1,
            })
        })
        .collect()
}

/// Two triangles covering clip space. `uv` has its origin at the top left,
/// matching how render targets are addressed.
#[rustfmt::skip]
pub const SCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0,  1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [ 1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [-1.0,  1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [ 1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [ 1.0,  1.0], uv: [1.0, 0.0] },
];
