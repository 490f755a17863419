// Table-driven font for tests and benches. Every glyph is a solid block over its ink bounds.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glyphloom_core::{FontMetrics, GlyphBitmap, GlyphBounds, GlyphRasterizer};

use crate::{AtlasError, BoxedRasterizer, FontDescriptor, FontLoader, Result};

#[derive(Debug, Clone, Default)]
pub struct FixtureFont {
    metrics: FontMetrics,
    glyphs: HashMap<char, GlyphBounds>,
    kerning: HashMap<(char, char), f32>,
}

impl FixtureFont {
    /// A font with no glyphs at all.
    pub fn empty(ascent: f32, descent: f32) -> Self {
        Self {
            metrics: FontMetrics { ascent, descent },
            ..Default::default()
        }
    }

    /// Printable ASCII with a fixed advance. Ink leaves one pixel on each side
    /// and one pixel below the ascent; the space is blank.
    pub fn monospace(advance: f32, ascent: f32, descent: f32) -> Self {
        let mut font = Self::empty(ascent, descent);
        for ch in ' '..='~' {
            let bounds = if ch == ' ' {
                GlyphBounds::blank(advance)
            } else {
                GlyphBounds {
                    min_x: 1.0,
                    min_y: -(ascent - 1.0),
                    max_x: advance - 1.0,
                    max_y: 0.0,
                    advance,
                }
            };
            font.glyphs.insert(ch, bounds);
        }
        font
    }

    pub fn with_glyph(mut self, ch: char, bounds: GlyphBounds) -> Self {
        self.glyphs.insert(ch, bounds);
        self
    }

    pub fn without_glyph(mut self, ch: char) -> Self {
        self.glyphs.remove(&ch);
        self
    }

    pub fn with_kerning(mut self, prev: char, next: char, kerning: f32) -> Self {
        self.kerning.insert((prev, next), kerning);
        self
    }

    /// Same font with every metric multiplied by `scale`.
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            metrics: FontMetrics {
                ascent: self.metrics.ascent * scale,
                descent: self.metrics.descent * scale,
            },
            glyphs: self
                .glyphs
                .iter()
                .map(|(ch, b)| {
                    let scaled = GlyphBounds {
                        min_x: b.min_x * scale,
                        min_y: b.min_y * scale,
                        max_x: b.max_x * scale,
                        max_y: b.max_y * scale,
                        advance: b.advance * scale,
                    };
                    (*ch, scaled)
                })
                .collect(),
            kerning: self
                .kerning
                .iter()
                .map(|(pair, k)| (*pair, k * scale))
                .collect(),
        }
    }
}

impl GlyphRasterizer for FixtureFont {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn bounds(&mut self, ch: char) -> Option<GlyphBounds> {
        self.glyphs.get(&ch).copied()
    }

    fn kerning(&mut self, prev: char, next: char) -> f32 {
        self.kerning.get(&(prev, next)).copied().unwrap_or(0.0)
    }

    fn rasterize(&mut self, ch: char) -> Option<GlyphBitmap> {
        let b = self.glyphs.get(&ch)?;
        let width = (b.max_x - b.min_x).ceil();
        let height = (b.max_y - b.min_y).ceil();
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let (width, height) = (width as u32, height as u32);
        Some(GlyphBitmap {
            left: b.min_x.ceil() as i32,
            top: -b.min_y.ceil() as i32,
            width,
            height,
            coverage: vec![255; (width * height) as usize],
        })
    }
}

/// Hands out [`FixtureFont`]s by resource name and counts how often it was asked.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    default_font: FixtureFont,
    fonts: HashMap<String, FixtureFont>,
    failing: HashSet<String>,
    loads: Arc<AtomicUsize>,
}

impl FixtureLoader {
    pub fn new(default_font: FixtureFont) -> Self {
        Self {
            default_font,
            fonts: HashMap::new(),
            failing: HashSet::new(),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_font(mut self, resource: impl Into<String>, font: FixtureFont) -> Self {
        self.fonts.insert(resource.into(), font);
        self
    }

    /// Make loads of `resource` fail as if the file were absent.
    pub fn failing(mut self, resource: impl Into<String>) -> Self {
        self.failing.insert(resource.into());
        self
    }

    /// Shared load counter; stays valid after the loader moves into a cache.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl FontLoader for FixtureLoader {
    fn load(&self, descriptor: &FontDescriptor, scale: f32) -> Result<BoxedRasterizer> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let resource = descriptor.resource();
        if self.failing.contains(resource) {
            return Err(AtlasError::unavailable(resource, "no such fixture"));
        }
        let font = self.fonts.get(resource).unwrap_or(&self.default_font);
        Ok(Box::new(font.scaled(scale)))
    }
}
