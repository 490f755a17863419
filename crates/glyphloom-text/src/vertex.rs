// Vertex type shared by text and shape buffers.

use bytemuck::{Pod, Zeroable};
use glyphloom_core::Rect;

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }

    /// Corners of `rect` in TL, TR, BR, BL order with the given UV corners.
    pub fn quad(rect: Rect, uv_min: [f32; 2], uv_max: [f32; 2]) -> [Self; VERTICES_PER_QUAD] {
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());
        [
            Self::new(x0, y0, uv_min[0], uv_min[1]),
            Self::new(x1, y0, uv_max[0], uv_min[1]),
            Self::new(x1, y1, uv_max[0], uv_max[1]),
            Self::new(x0, y1, uv_min[0], uv_max[1]),
        ]
    }
}

/// Index list drawing `quads` consecutive quads as two triangles each.
pub fn quad_indices(quads: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(quads * INDICES_PER_QUAD);
    for q in 0..quads as u32 {
        let base = q * VERTICES_PER_QUAD as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    indices
}
