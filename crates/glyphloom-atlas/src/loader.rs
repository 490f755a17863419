use glyphloom_core::GlyphRasterizer;

use crate::{FontDescriptor, Result};

pub type BoxedRasterizer = Box<dyn GlyphRasterizer + Send>;

/// Resolves a descriptor to a rasterizer for its face at `descriptor.size() * scale` pixels.
/// Failures must surface as [`crate::AtlasError::ResourceUnavailable`]; never substitute another font.
pub trait FontLoader {
    fn load(&self, descriptor: &FontDescriptor, scale: f32) -> Result<BoxedRasterizer>;
}
