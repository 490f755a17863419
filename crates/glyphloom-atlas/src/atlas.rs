// Glyph atlas: row packing of rasterized glyphs into a growable coverage image.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glyphloom_core::{GlyphBitmap, GlyphBounds, Rect};
use image::GrayImage;

use crate::{AtlasConfig, AtlasError, BoxedRasterizer, FontDescriptor, Result};

/// Where a glyph's ink lives in the atlas and how it sits relative to the pen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    /// Top-left corner of the ink in atlas pixels.
    pub x: f32,
    pub y: f32,
    /// Ink size in pixels.
    pub width: f32,
    pub height: f32,
    /// Gap between pen and ink, negative when the ink starts left of the pen.
    pub left_bearing: f32,
    pub right_bearing: f32,
    /// Atlas ascent minus glyph ascent.
    pub offset_y: f32,
}

impl GlyphPlacement {
    /// Pen advance implied by the bearings, before kerning and letter spacing.
    pub fn advance(&self) -> f32 {
        self.left_bearing + self.width + self.right_bearing
    }

    pub fn ink_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Opaque handle to the atlas texture. A new generation means the pixels or
/// extents changed and any uploaded copy is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    atlas_id: u64,
    generation: u64,
}

impl TextureHandle {
    pub fn atlas_id(&self) -> u64 {
        self.atlas_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of one [`FontAtlas::ensure`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnsureOutcome {
    /// Glyphs packed by this call.
    pub placed: usize,
    /// Code points the font had no glyph for, first seen in this call.
    pub missing: usize,
}

impl EnsureOutcome {
    pub fn changed(&self) -> bool {
        self.placed > 0
    }
}

/// Whole-pixel metrics of a glyph about to be packed.
#[derive(Debug, Clone, Copy)]
struct GlyphMetrics {
    width: f32,
    height: f32,
    left: f32,
    right: f32,
    offset_y: f32,
    advance: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    x: f32,
    y: f32,
    /// Right-most ink edge in the current row.
    row_ink_end: f32,
    /// Lowest ink edge in the current row.
    row_ink_bottom: f32,
    /// Lowest ink edge of all finished rows. No ink may start above it.
    floor: f32,
}

impl Cursor {
    /// Height the image needs to hold the current row and every ink rect.
    fn required_height(&self, line_height: f32) -> f32 {
        (self.y + line_height).max(self.row_ink_bottom).max(self.floor)
    }

    fn wrap(&mut self, line_height: f32) {
        self.floor = self.floor.max(self.row_ink_bottom);
        self.x = 0.0;
        self.y += line_height;
        self.row_ink_end = 0.0;
        self.row_ink_bottom = 0.0;
    }
}

struct Planned {
    ch: char,
    metrics: GlyphMetrics,
    pen_x: f32,
    pen_y: f32,
}

pub struct FontAtlas {
    id: u64,
    descriptor: FontDescriptor,
    rasterizer: BoxedRasterizer,
    image: GrayImage,
    texture: TextureHandle,
    placements: HashMap<char, GlyphPlacement>,
    missing: HashSet<char>,
    kerning: HashMap<(char, char), f32>,
    cursor: Cursor,
    total_width: f32,
    total_height: f32,
    max_height: u32,
    line_height: f32,
    ascent: f32,
    descent: f32,
    scale: f32,
}

impl FontAtlas {
    /// Create an atlas and pack the configured pre-seed range into it.
    pub fn new(
        id: u64,
        descriptor: FontDescriptor,
        rasterizer: BoxedRasterizer,
        config: &AtlasConfig,
    ) -> Result<Self> {
        let metrics = rasterizer.metrics();
        let ascent = metrics.ascent.ceil();
        let line_height = (metrics.ascent + metrics.descent).ceil();
        if line_height.is_nan() || line_height <= 0.0 {
            return Err(AtlasError::unavailable(
                descriptor.resource(),
                format!("font reports line height {line_height}"),
            ));
        }
        if line_height as u32 > config.max_texture_height {
            return Err(AtlasError::AtlasOverflow {
                descriptor,
                required: line_height as u32,
                limit: config.max_texture_height,
            });
        }

        let mut atlas = Self {
            id,
            image: GrayImage::new(config.texture_width, line_height as u32),
            texture: TextureHandle {
                atlas_id: id,
                generation: 0,
            },
            descriptor,
            rasterizer,
            placements: HashMap::new(),
            missing: HashSet::new(),
            kerning: HashMap::new(),
            cursor: Cursor::default(),
            total_width: config.texture_width as f32,
            total_height: line_height,
            max_height: config.max_texture_height,
            line_height,
            ascent,
            descent: metrics.descent.ceil(),
            scale: config.device_scale,
        };

        let seed: String = config.preseed().collect();
        let outcome = atlas.ensure(&seed)?;
        log::info!(
            "Created atlas {} for {}: {} glyphs, {}x{}",
            atlas.id,
            atlas.descriptor,
            outcome.placed,
            atlas.total_width,
            atlas.total_height
        );
        Ok(atlas)
    }

    /// Pack every code point of `text` that is not in the atlas yet.
    ///
    /// Code points the font lacks are remembered and skipped. On overflow the
    /// atlas is left exactly as it was.
    pub fn ensure(&mut self, text: &str) -> Result<EnsureOutcome> {
        let (fresh, missing) = self.collect_fresh(text);
        if fresh.is_empty() {
            return Ok(EnsureOutcome { placed: 0, missing });
        }

        let (plan, cursor) = self.plan(&fresh)?;
        let required = cursor.required_height(self.line_height);
        if required > self.max_height as f32 {
            log::error!(
                "Atlas for {} would grow to {}px (limit {}px)",
                self.descriptor,
                required,
                self.max_height
            );
            return Err(AtlasError::AtlasOverflow {
                descriptor: self.descriptor.clone(),
                required: required as u32,
                limit: self.max_height,
            });
        }

        self.cursor = cursor;
        self.grow_to(required)?;

        for planned in &plan {
            let m = planned.metrics;
            if let Some(bitmap) = self.rasterizer.rasterize(planned.ch) {
                self.blit(&bitmap, planned.pen_x, planned.pen_y + self.ascent);
            }
            // Stored origin addresses the ink, not the pen.
            self.placements.insert(
                planned.ch,
                GlyphPlacement {
                    x: planned.pen_x + m.left,
                    y: planned.pen_y + m.offset_y,
                    width: m.width,
                    height: m.height,
                    left_bearing: m.left,
                    right_bearing: m.right,
                    offset_y: m.offset_y,
                },
            );
        }
        self.texture.generation += 1;

        Ok(EnsureOutcome {
            placed: plan.len(),
            missing,
        })
    }

    fn collect_fresh(&mut self, text: &str) -> (Vec<(char, GlyphMetrics)>, usize) {
        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        let mut missing = 0;

        for ch in text.chars() {
            if ch.is_control()
                || self.placements.contains_key(&ch)
                || self.missing.contains(&ch)
                || !seen.insert(ch)
            {
                continue;
            }
            match self.rasterizer.bounds(ch) {
                Some(bounds) => fresh.push((ch, self.whole_pixel_metrics(&bounds))),
                None => {
                    log::debug!("No glyph for {:?} (U+{:04X}) in {}", ch, ch as u32, self.descriptor);
                    self.missing.insert(ch);
                    missing += 1;
                }
            }
        }
        (fresh, missing)
    }

    fn whole_pixel_metrics(&self, bounds: &GlyphBounds) -> GlyphMetrics {
        let advance = bounds.advance.ceil();
        let glyph_ascent = -bounds.min_y.ceil();
        GlyphMetrics {
            width: (bounds.max_x - bounds.min_x).ceil(),
            height: (bounds.max_y - bounds.min_y).ceil(),
            left: bounds.min_x.ceil(),
            right: advance - bounds.max_x.ceil(),
            offset_y: self.ascent - glyph_ascent,
            advance,
        }
    }

    /// Assign pen positions to a batch without touching the placement tables.
    fn plan(&mut self, fresh: &[(char, GlyphMetrics)]) -> Result<(Vec<Planned>, Cursor)> {
        let mut cursor = self.cursor;
        let mut plan = Vec::with_capacity(fresh.len());
        let mut prev: Option<char> = None;

        for &(ch, m) in fresh {
            // Ink wider than the advance (italics, overhangs) consumes extra room.
            let mut advance = m.advance;
            if m.width > m.advance {
                if m.left < 0.0 {
                    advance -= m.left;
                } else if m.right < 0.0 {
                    advance -= m.right;
                }
            }

            let mut pen = cursor.x;
            if let Some(prev) = prev {
                pen += self.kerning(prev, ch);
            }
            if m.left < 0.0 {
                pen -= m.left;
            }
            pen = pen.max(cursor.row_ink_end - m.left);

            if (pen + advance).max(pen + m.left + m.width) > self.total_width {
                cursor.wrap(self.line_height);
                pen = (-m.left).max(0.0);
                if (pen + advance).max(pen + m.left + m.width) > self.total_width {
                    return Err(AtlasError::AtlasOverflow {
                        descriptor: self.descriptor.clone(),
                        required: (pen + advance).max(pen + m.left + m.width) as u32,
                        limit: self.total_width as u32,
                    });
                }
            }

            // Ink reaching above the ascent must stay clear of earlier rows and the image top.
            let pen_y = cursor.y.max(cursor.floor - m.offset_y);
            plan.push(Planned {
                ch,
                metrics: m,
                pen_x: pen,
                pen_y,
            });
            cursor.x = pen + advance;
            cursor.row_ink_end = cursor.row_ink_end.max(pen + m.left + m.width);
            if m.height > 0.0 {
                cursor.row_ink_bottom = cursor.row_ink_bottom.max(pen_y + m.offset_y + m.height);
            }
            prev = Some(ch);
        }
        Ok((plan, cursor))
    }

    fn grow_to(&mut self, required: f32) -> Result<()> {
        if required <= self.total_height {
            return Ok(());
        }
        let height = required as u32;
        if self.image.height() < height {
            let width = self.image.width();
            let mut raw = std::mem::replace(&mut self.image, GrayImage::new(0, 0)).into_raw();
            raw.resize(width as usize * height as usize, 0);
            self.image = GrayImage::from_raw(width, height, raw).ok_or_else(|| {
                AtlasError::AtlasOverflow {
                    descriptor: self.descriptor.clone(),
                    required: height,
                    limit: self.max_height,
                }
            })?;
        }
        log::debug!(
            "Atlas for {} grew {} -> {}px",
            self.descriptor,
            self.total_height,
            required
        );
        self.total_height = required;
        Ok(())
    }

    /// Copy coverage into the image with the pen at `pen_x` on `baseline`, clipped to the image.
    fn blit(&mut self, bitmap: &GlyphBitmap, pen_x: f32, baseline: f32) {
        let x0 = pen_x as i64 + bitmap.left as i64;
        let y0 = baseline as i64 - bitmap.top as i64;
        let (width, height) = (self.image.width() as i64, self.image.height() as i64);

        for row in 0..bitmap.height as i64 {
            let y = y0 + row;
            if y < 0 || y >= height {
                continue;
            }
            for col in 0..bitmap.width as i64 {
                let x = x0 + col;
                if x < 0 || x >= width {
                    continue;
                }
                let index = (row * bitmap.width as i64 + col) as usize;
                let value = bitmap.coverage.get(index).copied().unwrap_or(0);
                let pixel = self.image.get_pixel_mut(x as u32, y as u32);
                pixel.0[0] = pixel.0[0].max(value);
            }
        }
    }

    /// Kerning between two adjacent code points in whole pixels.
    pub fn kerning(&mut self, prev: char, next: char) -> f32 {
        if let Some(k) = self.kerning.get(&(prev, next)) {
            return *k;
        }
        let k = self.rasterizer.kerning(prev, next).ceil();
        self.kerning.insert((prev, next), k);
        k
    }

    pub fn placement(&self, ch: char) -> Option<&GlyphPlacement> {
        self.placements.get(&ch)
    }

    pub fn has_placement(&self, ch: char) -> bool {
        self.placements.contains_key(&ch)
    }

    /// True once the font has reported that it cannot render `ch`.
    pub fn is_missing(&self, ch: char) -> bool {
        self.missing.contains(&ch)
    }

    pub fn ink_rect(&self, ch: char) -> Option<Rect> {
        self.placement(ch).map(GlyphPlacement::ink_rect)
    }

    /// Normalized texture coordinates of the ink's top-left and bottom-right corners.
    pub fn uv(&self, ch: char) -> Option<([f32; 2], [f32; 2])> {
        let p = self.placement(ch)?;
        let (w, h) = (self.total_width, self.total_height);
        Some((
            [p.x / w, p.y / h],
            [(p.x + p.width) / w, (p.y + p.height) / h],
        ))
    }

    pub fn placements(&self) -> impl Iterator<Item = (char, &GlyphPlacement)> {
        self.placements.iter().map(|(ch, p)| (*ch, p))
    }

    pub fn glyph_count(&self) -> usize {
        self.placements.len()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn descent(&self) -> f32 {
        self.descent
    }

    pub fn total_width(&self) -> f32 {
        self.total_width
    }

    pub fn total_height(&self) -> f32 {
        self.total_height
    }

    /// Next free packing position.
    pub fn cursor(&self) -> (f32, f32) {
        (self.cursor.x, self.cursor.y)
    }

    /// Device scale the glyphs were rasterized at.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Dump the coverage image, useful when glyph spacing looks off.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}
