// Glyph atlas packing
// One growable coverage texture per font descriptor, filled on demand.

mod atlas;
mod cache;
mod config;
mod cosmic;
mod descriptor;
mod error;
mod loader;
mod tests;

#[cfg(any(test, feature = "test-support"))]
pub mod fixture;

pub use atlas::{EnsureOutcome, FontAtlas, GlyphPlacement, TextureHandle};
pub use cache::{AtlasCache, SharedAtlas};
pub use config::{config_path, AtlasConfig, DEFAULT_MAX_TEXTURE_HEIGHT, DEFAULT_TEXTURE_WIDTH};
pub use cosmic::{CosmicFontLoader, CosmicRasterizer};
pub use descriptor::FontDescriptor;
pub use error::{AtlasError, Result};
pub use loader::{BoxedRasterizer, FontLoader};
