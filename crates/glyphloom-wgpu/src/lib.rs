// wgpu upload helpers
// Keeps a GPU texture in step with an atlas and streams dirty vertex slots.

mod buffer;
mod texture;

pub use buffer::{byte_range, QuadBuffer, QUAD_VERTEX_LAYOUT};
pub use texture::{AtlasSync, AtlasTexture};
