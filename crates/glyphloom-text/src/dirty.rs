// Change detection: what a layout call has to redo, and which vertex slots need uploading.

use std::ops::Range;

use glyphloom_atlas::FontAtlas;
use glyphloom_core::{Anchor, FillStyle, Padding, Vec2};

use crate::{QuadVertex, TextStyle};

/// Inputs that change glyph positions inside the block.
#[derive(Debug, Clone, PartialEq)]
struct LayoutKey {
    text: String,
    letter_spacing: f32,
    line_spacing: f32,
}

/// Inputs that only move the block or its background.
#[derive(Debug, Clone, PartialEq)]
struct PlacementKey {
    position: Vec2,
    anchor: Anchor,
    width: Option<f32>,
    height: Option<f32>,
    padding: Padding,
    fill: FillStyle,
    atlas_extents: (f32, f32),
    scale: f32,
}

/// Snapshot of everything a text run's buffer depends on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunKeys {
    layout: LayoutKey,
    placement: PlacementKey,
}

impl RunKeys {
    pub(crate) fn capture(
        text: &str,
        style: &TextStyle,
        position: Vec2,
        anchor: Anchor,
        atlas: &FontAtlas,
    ) -> Self {
        Self {
            layout: LayoutKey {
                text: text.to_string(),
                letter_spacing: style.letter_spacing,
                line_spacing: style.line_spacing,
            },
            placement: PlacementKey {
                position,
                anchor,
                width: style.width,
                height: style.height,
                padding: style.padding,
                fill: style.fill,
                atlas_extents: (atlas.total_width(), atlas.total_height()),
                scale: atlas.scale(),
            },
        }
    }
}

/// Work required by one layout call, computed once up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dirty {
    /// Text or spacing changed: glyphs must be walked again.
    pub relayout: bool,
    /// Position, anchor, override size, padding, fill or atlas extents changed:
    /// vertices must be re-emitted.
    pub reposition: bool,
}

impl Dirty {
    pub const CLEAN: Self = Self {
        relayout: false,
        reposition: false,
    };

    pub(crate) fn between(previous: Option<&RunKeys>, current: &RunKeys) -> Self {
        match previous {
            None => Self {
                relayout: true,
                reposition: true,
            },
            Some(prev) => {
                let relayout = prev.layout != current.layout;
                Self {
                    relayout,
                    reposition: relayout || prev.placement != current.placement,
                }
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.relayout && !self.reposition
    }
}

// ──────────────────────────────────────────────
// VertexBuffer
// ──────────────────────────────────────────────

/// CPU copy of a vertex buffer that remembers which slots changed since the
/// last upload.
#[derive(Debug, Clone, Default)]
pub struct VertexBuffer {
    vertices: Vec<QuadVertex>,
    dirty: Option<Range<usize>>,
}

impl VertexBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn as_slice(&self) -> &[QuadVertex] {
        &self.vertices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Change the vertex count. New slots are zeroed; any length change makes
    /// the whole buffer dirty.
    pub fn resize(&mut self, len: usize) {
        if len == self.vertices.len() {
            return;
        }
        self.vertices.resize(len, QuadVertex::default());
        self.mark_all_dirty();
    }

    /// Store `vertex` at `index`. Returns true when the stored value changed.
    /// Out-of-range writes are ignored.
    pub fn set(&mut self, index: usize, vertex: QuadVertex) -> bool {
        let Some(slot) = self.vertices.get_mut(index) else {
            return false;
        };
        if *slot == vertex {
            return false;
        }
        *slot = vertex;
        self.widen(index..index + 1);
        true
    }

    /// Write consecutive vertices starting at `first`. Returns true if any changed.
    pub fn set_all(&mut self, first: usize, vertices: &[QuadVertex]) -> bool {
        let mut changed = false;
        for (i, v) in vertices.iter().enumerate() {
            changed |= self.set(first + i, *v);
        }
        changed
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = (!self.vertices.is_empty()).then(|| 0..self.vertices.len());
    }

    /// Slots written since the last [`take_dirty`](Self::take_dirty).
    pub fn dirty(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    pub fn take_dirty(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }

    fn widen(&mut self, range: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(range.start)..d.end.max(range.end),
            None => range,
        });
    }
}
