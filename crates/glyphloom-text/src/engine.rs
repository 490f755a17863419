// Entry point tying the atlas registry to text runs.

use glyphloom_atlas::{AtlasCache, AtlasConfig, FontDescriptor, FontLoader, Result};
use glyphloom_core::{Anchor, Size, Vec2};

use crate::layout::measure;
use crate::{TextRun, TextStyle};

pub struct TextEngine {
    cache: AtlasCache,
}

impl TextEngine {
    pub fn new(cache: AtlasCache) -> Self {
        Self { cache }
    }

    pub fn with_loader(loader: impl FontLoader + Send + Sync + 'static, config: AtlasConfig) -> Self {
        Self::new(AtlasCache::new(loader, config))
    }

    pub fn cache(&self) -> &AtlasCache {
        &self.cache
    }

    /// Create a run on the atlas for `descriptor`. Fails only when the font
    /// cannot be loaded; layout happens on the first [`TextRun::layout`].
    pub fn text_run(
        &self,
        descriptor: &FontDescriptor,
        text: impl Into<String>,
        position: Vec2,
        anchor: Anchor,
        style: TextStyle,
    ) -> Result<TextRun> {
        let atlas = self.cache.get_or_create(descriptor)?;
        Ok(TextRun::new(atlas, text, position, anchor, style))
    }

    /// Size of `text` in atlas pixels without building any geometry.
    pub fn measure(&self, descriptor: &FontDescriptor, text: &str, style: &TextStyle) -> Result<Size> {
        let atlas = self.cache.get_or_create(descriptor)?;
        let mut atlas = atlas.lock();
        measure(&mut atlas, text, style.letter_spacing, style.line_spacing)
    }
}
