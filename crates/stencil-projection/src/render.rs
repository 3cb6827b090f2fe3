use std::fmt;

use bson::{Bson, Document, doc};
use stencil_filter::ParseError;
use stencil_schema::FieldMap;

use crate::meta;
use crate::projection::{FieldProjection, Projection, ProjectionOp};

/// Error produced when a projection cannot be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A `$meta` entry named a kind outside the known set.
    InvalidMetaKind(String),
    /// A stored match fragment failed to parse.
    Match(ParseError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidMetaKind(kind) => write!(f, "unknown meta kind '{kind}'"),
            RenderError::Match(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<ParseError> for RenderError {
    fn from(err: ParseError) -> Self {
        RenderError::Match(err)
    }
}

impl Projection {
    /// Render the projection into its canonical wire document.
    ///
    /// Entries render in insertion order, with logical names resolved
    /// through `map`. When two entries render to the same name the
    /// later entry wins, taking both the value and the later position.
    pub fn render(&self, map: &FieldMap) -> Result<Document, RenderError> {
        let mut out = Document::new();
        for entry in &self.ops {
            let (name, value) = render_entry(entry, map)?;
            out.remove(&name);
            out.insert(name, value);
        }
        Ok(out)
    }
}

fn render_entry(entry: &FieldProjection, map: &FieldMap) -> Result<(String, Bson), RenderError> {
    let value = match &entry.op {
        // Raw entries keep the name exactly as written.
        ProjectionOp::Raw(value) => {
            return Ok((entry.field.text().into_owned(), value.clone()));
        }
        ProjectionOp::Include => Bson::Int32(1),
        ProjectionOp::Exclude => Bson::Int32(0),
        ProjectionOp::ElemMatch(fragment) => {
            let matched = fragment.render(map.element_map(&entry.field))?;
            Bson::Document(doc! { "$elemMatch": matched })
        }
        ProjectionOp::Meta(kind) => {
            if !meta::is_valid(kind) {
                return Err(RenderError::InvalidMetaKind(kind.clone()));
            }
            Bson::Document(doc! { "$meta": kind.as_str() })
        }
        // The array self-reference uses the resolved name.
        ProjectionOp::Slice(limit) => {
            let wire = map.resolve(&entry.field);
            let array_ref = format!("${wire}");
            let value = Bson::Document(doc! { "$slice": [array_ref, *limit] });
            return Ok((wire, value));
        }
        ProjectionOp::SliceRange { skip, limit } => {
            Bson::Document(doc! { "$slice": [*skip, *limit] })
        }
    };
    Ok((map.resolve(&entry.field), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_filter::MatchExpr;
    use stencil_schema::field;

    fn contact_map() -> FieldMap {
        FieldMap::new()
            .field("first_name", "fn")
            .field("favorite_colors", "colors")
            .nested("pets", "pets", FieldMap::new().field("kind", "k"))
    }

    #[test]
    fn include_and_exclude_render_flags() {
        let doc = Projection::new()
            .include(field("first_name"))
            .exclude("last_name")
            .render(&contact_map())
            .unwrap();
        assert_eq!(doc, doc! { "fn": 1, "last_name": 0 });
    }

    #[test]
    fn meta_renders_after_validation() {
        let doc = Projection::new()
            .meta("score", meta::TEXT_SCORE)
            .render(&contact_map())
            .unwrap();
        assert_eq!(doc, doc! { "score": { "$meta": "textScore" } });
    }

    #[test]
    fn unknown_meta_kind_fails_at_render() {
        let err = Projection::new()
            .meta("score", "textscore")
            .render(&contact_map())
            .unwrap_err();
        assert_eq!(err, RenderError::InvalidMetaKind("textscore".to_string()));
    }

    #[test]
    fn slice_references_the_resolved_array() {
        let doc = Projection::new()
            .slice(field("favorite_colors"), 3)
            .render(&contact_map())
            .unwrap();
        assert_eq!(doc, doc! { "colors": { "$slice": ["$colors", 3] } });
    }

    #[test]
    fn slice_range_has_no_self_reference() {
        let doc = Projection::new()
            .slice_range(field("favorite_colors"), 2, 3)
            .render(&contact_map())
            .unwrap();
        assert_eq!(doc, doc! { "colors": { "$slice": [2, 3] } });
    }

    #[test]
    fn elem_match_resolves_through_the_element_map() {
        let doc = Projection::new()
            .elem_match(field("pets"), MatchExpr::eq(field("kind"), "cat"))
            .render(&contact_map())
            .unwrap();
        assert_eq!(doc, doc! { "pets": { "$elemMatch": { "k": "cat" } } });
    }

    #[test]
    fn elem_match_text_errors_surface_at_render() {
        let err = Projection::new()
            .elem_match("pets", "{kind: }")
            .render(&contact_map())
            .unwrap_err();
        assert!(matches!(err, RenderError::Match(_)));
    }

    #[test]
    fn raw_entries_skip_resolution() {
        let doc = Projection::from(doc! { "first_name": 1 })
            .render(&contact_map())
            .unwrap();
        assert_eq!(doc, doc! { "first_name": 1 });
    }

    #[test]
    fn empty_projection_renders_empty() {
        let doc = Projection::new().render(&contact_map()).unwrap();
        assert_eq!(doc, doc! {});
    }
}
