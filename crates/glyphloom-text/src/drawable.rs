// Closed set of drawable kinds and the buffer generation for each.

use glyphloom_atlas::Result;
use glyphloom_core::{Color, Rect, Vec2};

use crate::{LayoutReport, QuadVertex, TextRun, VertexBuffer};

/// Line stipple: each bit of `pattern` is drawn or skipped for `factor` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stipple {
    pub factor: i32,
    pub pattern: u16,
}

impl Stipple {
    pub const SOLID: Self = Self {
        factor: 1,
        pattern: 0xFFFF,
    };

    pub const fn new(factor: i32, pattern: u16) -> Self {
        Self { factor, pattern }
    }

    pub fn is_solid(&self) -> bool {
        self.pattern == 0xFFFF
    }

    /// Rotate the pattern one bit left, carrying the high bit around.
    /// Animating a solid pattern has no visible effect, so it is left alone.
    pub fn shift_left(&mut self) {
        if !self.is_solid() {
            self.pattern = self.pattern.rotate_left(1);
        }
    }

    pub fn shift_right(&mut self) {
        if !self.is_solid() {
            self.pattern = self.pattern.rotate_right(1);
        }
    }
}

/// Filled rectangle with its top-left corner at the local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectShape {
    pub width: f32,
    pub height: f32,
    pub color: Color,
}

/// Open polyline in absolute coordinates, drawn as a line strip.
#[derive(Debug, Clone, PartialEq)]
pub struct StippleLine {
    pub points: Vec<Vec2>,
    pub line_width: f32,
    pub stipple: Stipple,
    pub color: Color,
}

/// Rectangle outline drawn as four line segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StippleRect {
    pub width: f32,
    pub height: f32,
    pub line_width: f32,
    pub stipple: Stipple,
    pub color: Color,
}

pub enum Drawable {
    Text(TextRun),
    Rect(RectShape),
    StippleLine(StippleLine),
    StippleRect(StippleRect),
}

impl Drawable {
    pub fn kind(&self) -> &'static str {
        match self {
            Drawable::Text(_) => "text",
            Drawable::Rect(_) => "rect",
            Drawable::StippleLine(_) => "stipple line",
            Drawable::StippleRect(_) => "stipple rect",
        }
    }

    pub fn stipple(&self) -> Option<Stipple> {
        match self {
            Drawable::StippleLine(line) => Some(line.stipple),
            Drawable::StippleRect(rect) => Some(rect.stipple),
            _ => None,
        }
    }

    pub fn stipple_mut(&mut self) -> Option<&mut Stipple> {
        match self {
            Drawable::StippleLine(line) => Some(&mut line.stipple),
            Drawable::StippleRect(rect) => Some(&mut rect.stipple),
            _ => None,
        }
    }
}

fn unsupported(pass: &str, drawable: &Drawable) {
    log::warn!("{} not supported by the {} pass, skipping", drawable.kind(), pass);
}

/// Text pass. Other kinds are skipped with a warning and yield `Ok(None)`.
pub fn prepare_text(drawable: &mut Drawable) -> Result<Option<LayoutReport>> {
    match drawable {
        Drawable::Text(run) => run.layout().map(Some),
        other => {
            unsupported("text", other);
            Ok(None)
        }
    }
}

/// Shape pass: writes local-space vertices into `buffer` and returns whether
/// any changed. Text is skipped with a warning.
pub fn prepare_shape(drawable: &Drawable, buffer: &mut VertexBuffer) -> bool {
    match drawable {
        Drawable::Rect(rect) => {
            buffer.resize(4);
            let quad = QuadVertex::quad(Rect::new(0.0, 0.0, rect.width, rect.height), [0.0; 2], [0.0; 2]);
            buffer.set_all(0, &quad)
        }
        Drawable::StippleLine(line) => {
            buffer.resize(line.points.len());
            let vertices: Vec<_> = line
                .points
                .iter()
                .map(|p| QuadVertex::new(p.x, p.y, 0.0, 0.0))
                .collect();
            buffer.set_all(0, &vertices)
        }
        Drawable::StippleRect(rect) => {
            let (w, h) = (rect.width, rect.height);
            let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
            // Segments: top, right, bottom, left.
            let vertices: Vec<_> = (0..4)
                .flat_map(|i| [corners[i], corners[(i + 1) % 4]])
                .map(|(x, y)| QuadVertex::new(x, y, 0.0, 0.0))
                .collect();
            buffer.resize(vertices.len());
            buffer.set_all(0, &vertices)
        }
        Drawable::Text(_) => {
            unsupported("shape", drawable);
            false
        }
    }
}
