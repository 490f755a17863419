// cosmic-text backed font loading and glyph rasterization.

use std::collections::HashMap;
use std::sync::Arc;

use cosmic_text::{
    fontdb, Attrs, Buffer as CosmicBuffer, Family, FontSystem, LayoutGlyph, Metrics, Shaping,
    SwashCache, SwashContent,
};
use glyphloom_core::{FontMetrics, GlyphBitmap, GlyphBounds, GlyphRasterizer};

use crate::{AtlasError, BoxedRasterizer, FontDescriptor, FontLoader, Result};

/// Loads fonts from registered in-memory data or, failing that, from the filesystem.
pub struct CosmicFontLoader {
    preloaded: HashMap<String, Arc<Vec<u8>>>,
    locale: String,
}

impl Default for CosmicFontLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CosmicFontLoader {
    pub fn new() -> Self {
        Self {
            preloaded: HashMap::new(),
            locale: "en-US".to_string(),
        }
    }

    /// Register font bytes under a resource name so descriptors can refer to
    /// bundled fonts without touching the filesystem.
    pub fn with_font_data(mut self, resource: impl Into<String>, data: Vec<u8>) -> Self {
        self.register(resource, data);
        self
    }

    pub fn register(&mut self, resource: impl Into<String>, data: Vec<u8>) {
        self.preloaded.insert(resource.into(), Arc::new(data));
    }

    fn font_bytes(&self, resource: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(data) = self.preloaded.get(resource) {
            return Ok(Arc::clone(data));
        }
        std::fs::read(resource)
            .map(Arc::new)
            .map_err(|e| AtlasError::unavailable(resource, e))
    }
}

impl FontLoader for CosmicFontLoader {
    fn load(&self, descriptor: &FontDescriptor, scale: f32) -> Result<BoxedRasterizer> {
        let resource = descriptor.resource();
        let data = self.font_bytes(resource)?;

        // A private database keeps cosmic-text from falling back to other faces.
        let mut db = fontdb::Database::new();
        db.load_font_source(fontdb::Source::Binary(data));
        let (font_id, family) = {
            let face = db
                .faces()
                .next()
                .ok_or_else(|| AtlasError::unavailable(resource, "no font faces in data"))?;
            let family = face
                .families
                .first()
                .map(|(name, _)| name.clone())
                .ok_or_else(|| AtlasError::unavailable(resource, "face has no family name"))?;
            (face.id, family)
        };

        let mut font_system = FontSystem::new_with_locale_and_db(self.locale.clone(), db);
        let font_size = descriptor.size() * scale;
        let metrics = {
            let font = font_system
                .get_font(font_id)
                .ok_or_else(|| AtlasError::unavailable(resource, "face failed to parse"))?;
            let m = font.as_swash().metrics(&[]).scale(font_size);
            FontMetrics {
                ascent: m.ascent,
                descent: m.descent.abs(),
            }
        };

        log::debug!("Loaded {} ({}) at {}px", resource, family, font_size);
        Ok(Box::new(CosmicRasterizer {
            font_system,
            swash_cache: SwashCache::new(),
            family,
            font_id,
            font_size,
            metrics,
        }))
    }
}

/// One face at one pixel size, rasterized through swash.
pub struct CosmicRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    family: String,
    font_id: fontdb::ID,
    font_size: f32,
    metrics: FontMetrics,
}

impl CosmicRasterizer {
    fn shape(&mut self, text: &str) -> Vec<LayoutGlyph> {
        let line_height = (self.font_size * 1.2).ceil();
        let metrics = Metrics::new(self.font_size, line_height);

        let mut buffer = CosmicBuffer::new(&mut self.font_system, metrics);
        buffer.set_text(
            &mut self.font_system,
            text,
            Attrs::new().family(Family::Name(&self.family)),
            Shaping::Advanced,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        buffer
            .layout_runs()
            .flat_map(|run| run.glyphs.iter().cloned())
            .collect()
    }

    /// Shaped glyph for `ch`, or `None` when the face maps it to .notdef.
    fn glyph(&mut self, ch: char) -> Option<LayoutGlyph> {
        let mut utf8 = [0u8; 4];
        let glyph = self.shape(ch.encode_utf8(&mut utf8)).into_iter().next()?;
        (glyph.glyph_id != 0 && glyph.font_id == self.font_id).then_some(glyph)
    }
}

impl GlyphRasterizer for CosmicRasterizer {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn bounds(&mut self, ch: char) -> Option<GlyphBounds> {
        let glyph = self.glyph(ch)?;
        let physical = glyph.physical((0.0, 0.0), 1.0);
        let bounds = match self
            .swash_cache
            .get_image(&mut self.font_system, physical.cache_key)
        {
            Some(image) if image.placement.width > 0 && image.placement.height > 0 => {
                let p = image.placement;
                GlyphBounds {
                    min_x: p.left as f32,
                    min_y: -p.top as f32,
                    max_x: (p.left + p.width as i32) as f32,
                    max_y: (p.height as i32 - p.top) as f32,
                    advance: glyph.w,
                }
            }
            _ => GlyphBounds::blank(glyph.w),
        };
        Some(bounds)
    }

    fn kerning(&mut self, prev: char, next: char) -> f32 {
        let pair: String = [prev, next].iter().collect();
        let glyphs = self.shape(&pair);
        match glyphs.as_slice() {
            [first, second] => second.x - (first.x + first.w),
            _ => 0.0,
        }
    }

    fn rasterize(&mut self, ch: char) -> Option<GlyphBitmap> {
        let glyph = self.glyph(ch)?;
        let physical = glyph.physical((0.0, 0.0), 1.0);
        let image = self
            .swash_cache
            .get_image(&mut self.font_system, physical.cache_key)
            .as_ref()?;

        let width = image.placement.width;
        let height = image.placement.height;
        if width == 0 || height == 0 {
            return None;
        }

        let coverage: Vec<u8> = match image.content {
            SwashContent::Mask => image.data.clone(),
            SwashContent::Color => {
                image.data.chunks(4).map(|c| c.get(3).copied().unwrap_or(255)).collect()
            }
            SwashContent::SubpixelMask => {
                image.data.chunks(3).map(|c| {
                    let r = c.first().copied().unwrap_or(0) as u16;
                    let g = c.get(1).copied().unwrap_or(0) as u16;
                    let b = c.get(2).copied().unwrap_or(0) as u16;
                    ((r + g + b) / 3) as u8
                }).collect()
            }
        };

        Some(GlyphBitmap {
            left: image.placement.left,
            top: image.placement.top,
            width,
            height,
            coverage,
        })
    }
}
