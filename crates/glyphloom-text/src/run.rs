// TextRun: one block of text with cached layout and its quad buffer.

use std::ops::Range;
use std::sync::Arc;

use glyphloom_atlas::{FontAtlas, Result, SharedAtlas, TextureHandle};
use glyphloom_core::{Anchor, Color, FillStyle, Padding, Rect, Size, Vec2};

use crate::dirty::{Dirty, RunKeys, VertexBuffer};
use crate::layout::{walk, GlyphQuad};
use crate::vertex::{quad_indices, QuadVertex, INDICES_PER_QUAD, VERTICES_PER_QUAD};

/// Styling of a text block. Sizes and padding are in atlas pixels; the fixed
/// width and height overrides are logical and get multiplied by the device scale.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub letter_spacing: f32,
    pub line_spacing: f32,
    /// Background width override, replacing the measured width.
    pub width: Option<f32>,
    /// Background height override, replacing the measured height.
    pub height: Option<f32>,
    pub padding: Padding,
    pub fill: FillStyle,
    pub color: Color,
    pub background: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            letter_spacing: 0.0,
            line_spacing: 0.0,
            width: None,
            height: None,
            padding: Padding::default(),
            fill: FillStyle::Full,
            color: Color::WHITE,
            background: Color::TRANSPARENT,
        }
    }
}

/// What a [`TextRun::layout`] call did.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutReport {
    /// At least one vertex value changed.
    pub changed: bool,
    /// The glyph walk ran again.
    pub relayout: bool,
    /// Vertex slots not yet uploaded.
    pub dirty: Option<Range<usize>>,
    /// Measured block size in atlas pixels.
    pub ink_size: Size,
    /// Background box in logical coordinates, for pointer hit-testing.
    pub hit_box: Rect,
    pub texture: TextureHandle,
    pub glyph_count: usize,
}

pub struct TextRun {
    atlas: SharedAtlas,
    text: String,
    style: TextStyle,
    position: Vec2,
    anchor: Anchor,

    keys: Option<RunKeys>,
    glyphs: Vec<GlyphQuad>,
    ink_size: Size,
    background: Rect,
    hit_box: Rect,
    vertices: VertexBuffer,
}

impl TextRun {
    /// `position` is the nominal point the anchor of the block is placed on.
    pub fn new(
        atlas: SharedAtlas,
        text: impl Into<String>,
        position: Vec2,
        anchor: Anchor,
        style: TextStyle,
    ) -> Self {
        Self {
            atlas,
            text: text.into(),
            style,
            position,
            anchor,
            keys: None,
            glyphs: Vec::new(),
            ink_size: Size::ZERO,
            background: Rect::default(),
            hit_box: Rect::default(),
            vertices: VertexBuffer::new(),
        }
    }

    // ── Setters ──

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.anchor = anchor;
    }

    pub fn set_letter_spacing(&mut self, spacing: f32) {
        self.style.letter_spacing = spacing;
    }

    pub fn set_line_spacing(&mut self, spacing: f32) {
        self.style.line_spacing = spacing;
    }

    /// Fix the background size per axis; `None` falls back to the measured size.
    pub fn set_size_override(&mut self, width: Option<f32>, height: Option<f32>) {
        self.style.width = width;
        self.style.height = height;
    }

    pub fn set_padding(&mut self, padding: Padding) {
        self.style.padding = padding;
    }

    pub fn set_fill(&mut self, fill: FillStyle) {
        self.style.fill = fill;
    }

    pub fn set_color(&mut self, color: Color) {
        self.style.color = color;
    }

    pub fn set_background(&mut self, color: Color) {
        self.style.background = color;
    }

    // ── Layout ──

    /// Bring the vertex buffer up to date.
    ///
    /// Glyphs are walked again only when the text or spacing changed; moving
    /// the block, resizing its background or atlas growth only re-emit vertices.
    /// Nothing is recomputed when no input changed.
    pub fn layout(&mut self) -> Result<LayoutReport> {
        let atlas = Arc::clone(&self.atlas);
        let mut atlas = atlas.lock();

        let current = RunKeys::capture(&self.text, &self.style, self.position, self.anchor, &atlas);
        let dirty = Dirty::between(self.keys.as_ref(), &current);
        if dirty.is_clean() {
            return Ok(self.report(&atlas, false, false));
        }

        if dirty.relayout {
            atlas.ensure(&self.text)?;
            self.glyphs.clear();
            let glyphs = &mut self.glyphs;
            self.ink_size = walk(
                &mut atlas,
                &self.text,
                self.style.letter_spacing,
                self.style.line_spacing,
                |quad| glyphs.push(quad),
            );
            log::debug!(
                "Laid out {:?}: {} quads, {}x{}",
                self.text,
                self.glyphs.len(),
                self.ink_size.width,
                self.ink_size.height
            );
        }

        let changed = self.emit(&atlas);
        // Extents may have moved during ensure.
        self.keys = Some(RunKeys::capture(&self.text, &self.style, self.position, self.anchor, &atlas));
        Ok(self.report(&atlas, changed, dirty.relayout))
    }

    /// Write background and glyph quads, translated to the anchored origin.
    fn emit(&mut self, atlas: &FontAtlas) -> bool {
        let scale = atlas.scale();
        let measured = self.ink_size;
        let display = Size::new(
            self.style.width.map_or(measured.width, |w| w * scale),
            self.style.height.map_or(measured.height, |h| h * scale),
        );
        let pad = self.style.padding;
        self.background = Rect::new(
            (measured.width - display.width) / 2.0 - pad.left,
            (measured.height - display.height) / 2.0 - pad.top,
            display.width + pad.left + pad.right,
            display.height + pad.top + pad.bottom,
        );

        let origin = Vec2::new(
            self.position.x - measured.width / scale * self.anchor.x,
            self.position.y - measured.height / scale * self.anchor.y,
        );
        let offset = Vec2::new(origin.x * scale, origin.y * scale);
        self.hit_box = Rect::new(
            origin.x + self.background.x / scale,
            origin.y + self.background.y / scale,
            self.background.width / scale,
            self.background.height / scale,
        );

        self.vertices
            .resize(VERTICES_PER_QUAD * (1 + self.glyphs.len()));
        let mut changed = self.vertices.set_all(
            0,
            &QuadVertex::quad(translate(self.background, offset), [0.0; 2], [0.0; 2]),
        );
        for (i, glyph) in self.glyphs.iter().enumerate() {
            let (uv_min, uv_max) = atlas.uv(glyph.ch).unwrap_or(([0.0; 2], [0.0; 2]));
            let quad = QuadVertex::quad(translate(glyph.rect, offset), uv_min, uv_max);
            changed |= self.vertices.set_all(VERTICES_PER_QUAD * (1 + i), &quad);
        }
        changed
    }

    fn report(&self, atlas: &FontAtlas, changed: bool, relayout: bool) -> LayoutReport {
        LayoutReport {
            changed,
            relayout,
            dirty: self.vertices.dirty(),
            ink_size: self.ink_size,
            hit_box: self.hit_box,
            texture: atlas.texture(),
            glyph_count: self.glyphs.len(),
        }
    }

    // ── Draw data ──

    /// Background quad first, then one quad per glyph with ink.
    pub fn vertices(&self) -> &[QuadVertex] {
        self.vertices.as_slice()
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertices
    }

    /// For uploads that consume the dirty range.
    pub fn vertex_buffer_mut(&mut self) -> &mut VertexBuffer {
        &mut self.vertices
    }

    pub fn indices(&self) -> Vec<u32> {
        if self.vertices.is_empty() {
            return Vec::new();
        }
        quad_indices(1 + self.glyphs.len())
    }

    /// Index range of the glyph quads.
    pub fn glyph_range(&self) -> Range<u32> {
        let start = INDICES_PER_QUAD as u32;
        start..start + (INDICES_PER_QUAD * self.glyphs.len()) as u32
    }

    /// Index range to draw with the background color: the block quad for
    /// [`FillStyle::Full`], the glyph quads themselves for [`FillStyle::Wrap`].
    pub fn background_range(&self) -> Range<u32> {
        match self.style.fill {
            FillStyle::Full => 0..INDICES_PER_QUAD as u32,
            FillStyle::Wrap => self.glyph_range(),
        }
    }

    /// Background rectangles in block-local atlas pixels.
    pub fn background_rects(&self) -> Vec<Rect> {
        match self.style.fill {
            FillStyle::Full => vec![self.background],
            FillStyle::Wrap => self.glyphs.iter().map(|g| g.rect).collect(),
        }
    }

    /// Background geometry is always emitted; this says whether it is visible.
    pub fn draws_background(&self) -> bool {
        !self.style.background.is_transparent()
    }

    // ── Accessors ──

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn atlas(&self) -> &SharedAtlas {
        &self.atlas
    }

    pub fn ink_size(&self) -> Size {
        self.ink_size
    }

    pub fn hit_box(&self) -> Rect {
        self.hit_box
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

fn translate(rect: Rect, offset: Vec2) -> Rect {
    Rect::new(rect.x + offset.x, rect.y + offset.y, rect.width, rect.height)
}
