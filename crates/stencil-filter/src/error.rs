use std::fmt;

/// Parse error for match fragments and relaxed document text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}
