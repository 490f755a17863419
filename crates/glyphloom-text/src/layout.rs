// Pen walk over a string against an atlas's placement tables.

use glyphloom_atlas::{FontAtlas, Result};
use glyphloom_core::{Rect, Size};

/// A glyph's ink rectangle in block-local atlas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GlyphQuad {
    pub ch: char,
    pub rect: Rect,
}

/// Walk `text` with the pen starting at the origin, calling `emit` for every
/// glyph with ink. Returns the ink size of the block.
///
/// `\n` ends a line. Code points without a placement contribute nothing.
pub(crate) fn walk(
    atlas: &mut FontAtlas,
    text: &str,
    letter_spacing: f32,
    line_spacing: f32,
    mut emit: impl FnMut(GlyphQuad),
) -> Size {
    let line_height = atlas.line_height();
    let (mut x, mut y, mut max_width) = (0.0f32, 0.0f32, 0.0f32);
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if ch == '\n' {
            max_width = max_width.max(x);
            x = 0.0;
            y += line_height + line_spacing;
            prev = None;
            continue;
        }
        let Some(p) = atlas.placement(ch).copied() else {
            continue;
        };
        if let Some(prev) = prev {
            x += atlas.kerning(prev, ch);
        }
        if p.width > 0.0 && p.height > 0.0 {
            emit(GlyphQuad {
                ch,
                rect: Rect::new(x + p.left_bearing, y + p.offset_y, p.width, p.height),
            });
        }
        x += p.advance() + letter_spacing;
        prev = Some(ch);
    }

    Size::new(max_width.max(x), y + line_height)
}

/// Ink size of `text` in atlas pixels, packing any glyphs it needs first.
///
/// An empty string is one empty line: `(0, line_height)`.
pub fn measure(atlas: &mut FontAtlas, text: &str, letter_spacing: f32, line_spacing: f32) -> Result<Size> {
    atlas.ensure(text)?;
    Ok(walk(atlas, text, letter_spacing, line_spacing, |_| {}))
}
