// Text layout and quad generation
// Turns a string plus an atlas into background and glyph quads, skipping work
// when nothing relevant changed since the last call.

mod dirty;
mod drawable;
mod engine;
mod layout;
mod run;
mod vertex;

pub use dirty::{Dirty, VertexBuffer};
pub use drawable::{prepare_shape, prepare_text, Drawable, RectShape, Stipple, StippleLine, StippleRect};
pub use engine::TextEngine;
pub use layout::measure;
pub use run::{LayoutReport, TextRun, TextStyle};
pub use vertex::{quad_indices, QuadVertex, INDICES_PER_QUAD, VERTICES_PER_QUAD};
