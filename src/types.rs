/// Uniform buffer layout shared by every dithering fragment shader
///
/// Mirrors `DitherUniforms` in the WGSL sources; 64 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DitherUniforms {
    pub background: [f32; 4],
    pub foreground: [f32; 4],
    pub threshold: f32,
    pub contrast: f32,
    pub midtones: f32,
    pub highlights: f32,
    pub scale: f32,
    pub _pad: f32,
    pub resolution: [f32; 2],
}

/// Full-screen quad vertex
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Clip-space quad with the texture's top-left at uv (0, 0)
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
];

pub const QUAD_INDICES: [u16; 6] = [0, 3, 2, 0, 2, 1];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<DitherUniforms>(), 64);
        assert_eq!(std::mem::size_of::<DitherUniforms>() % 16, 0);
    }

    #[test]
    fn test_quad_vertex_stride() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
        assert_eq!(QuadVertex::layout().array_stride, 16);
    }

    #[test]
    fn test_quad_indices_cover_two_triangles() {
        assert_eq!(QUAD_INDICES.len(), 6);
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }
}
