mod error;
mod expr;
mod parse;
mod text;

pub use error::ParseError;
pub use expr::{MatchExpr, MatchFragment};
pub use text::parse_document;
