use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Marker segment for "the first array element matched by the query".
pub(crate) const POSITIONAL: &str = "$";

/// Start a typed field path at a named document member.
pub fn field(name: impl Into<String>) -> FieldPath {
    FieldPath {
        segments: vec![name.into()],
    }
}

/// A dotted field path built segment by segment.
///
/// The typed counterpart to raw string paths: segments are held
/// individually, so positional markers and array indexes are explicit
/// rather than spliced into text. Paths are symbolic — wire names are
/// looked up against a [`FieldMap`](crate::FieldMap) only when a
/// definition renders, never at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Descend into a member of an embedded document or array element.
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.segments.push(name.into());
        self
    }

    /// Address a single array element by index.
    pub fn at(mut self, index: usize) -> Self {
        self.segments.push(index.to_string());
        self
    }

    /// Address the first array element matched by the query (`path.$`).
    pub fn first_match(mut self) -> Self {
        self.segments.push(POSITIONAL.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The logical dotted form, e.g. `pets.$`.
    pub fn text(&self) -> String {
        self.segments.join(".")
    }
}

/// A reference to a document field: raw dotted text, or a typed
/// [`FieldPath`]. Both are resolved against a field map when the
/// enclosing definition renders; they differ only in how the caller
/// spells the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRef {
    Raw(String),
    Typed(FieldPath),
}

impl FieldRef {
    /// Path segments in order. Raw paths split on `.`; typed paths
    /// yield their stored segments.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            FieldRef::Raw(path) => path.split('.').collect(),
            FieldRef::Typed(path) => path.segments.iter().map(String::as_str).collect(),
        }
    }

    /// The dotted path exactly as supplied, unresolved.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            FieldRef::Raw(path) => Cow::Borrowed(path),
            FieldRef::Typed(path) => Cow::Owned(path.text()),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(path: &str) -> Self {
        FieldRef::Raw(path.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(path: String) -> Self {
        FieldRef::Raw(path)
    }
}

impl From<FieldPath> for FieldRef {
    fn from(path: FieldPath) -> Self {
        FieldRef::Typed(path)
    }
}

impl From<&FieldPath> for FieldRef {
    fn from(path: &FieldPath) -> Self {
        FieldRef::Typed(path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment() {
        let path = field("status");
        assert_eq!(path.text(), "status");
        assert_eq!(path.segments(), ["status"]);
    }

    #[test]
    fn child_segments_join_with_dots() {
        let path = field("pets").child("name");
        assert_eq!(path.text(), "pets.name");
    }

    #[test]
    fn first_match_appends_positional_marker() {
        let path = field("pets").first_match();
        assert_eq!(path.text(), "pets.$");
        assert_eq!(path.segments(), ["pets", "$"]);
    }

    #[test]
    fn at_appends_numeric_segment() {
        let path = field("pets").at(2).child("name");
        assert_eq!(path.text(), "pets.2.name");
    }

    #[test]
    fn raw_ref_splits_on_dots() {
        let field_ref = FieldRef::from("pets.name");
        assert_eq!(field_ref.segments(), ["pets", "name"]);
        assert_eq!(field_ref.text(), "pets.name");
    }

    #[test]
    fn typed_ref_keeps_segments() {
        let field_ref = FieldRef::from(field("pets").first_match());
        assert_eq!(field_ref.segments(), ["pets", "$"]);
        assert_eq!(field_ref.text(), "pets.$");
    }

    #[test]
    fn raw_and_typed_agree_on_equivalent_paths() {
        let raw = FieldRef::from("pets.name");
        let typed = FieldRef::from(field("pets").child("name"));
        assert_eq!(raw.segments(), typed.segments());
    }
}
