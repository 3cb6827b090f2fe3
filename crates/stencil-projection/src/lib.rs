pub mod meta;
mod projection;
mod render;

pub use projection::{FieldProjection, Projection, ProjectionOp};
pub use render::RenderError;
