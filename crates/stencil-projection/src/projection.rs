use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use stencil_filter::{MatchFragment, ParseError, parse_document};
use stencil_schema::FieldRef;

use crate::meta;

/// What to do with one projected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionOp {
    Include,
    Exclude,
    ElemMatch(MatchFragment),
    Meta(String),
    Slice(i32),
    SliceRange { skip: i32, limit: i32 },
    /// A pre-rendered value whose field name is emitted verbatim.
    Raw(Bson),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProjection {
    pub field: FieldRef,
    pub op: ProjectionOp,
}

/// An ordered list of projection entries.
///
/// Entries record what was asked for, in the order it was asked.
/// Duplicate handling and field-name resolution are deferred to
/// [`render`](Projection::render), so a projection can be built before
/// the mapping it will render against is known.
///
/// ```
/// use stencil_projection::Projection;
/// use stencil_schema::{FieldMap, field};
///
/// let map = FieldMap::new().field("first_name", "fn");
/// let doc = Projection::new()
///     .include(field("first_name"))
///     .exclude("last_name")
///     .render(&map)
///     .unwrap();
///
/// assert_eq!(doc, bson::doc! { "fn": 1, "last_name": 0 });
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub ops: Vec<FieldProjection>,
}

impl Projection {
    pub fn new() -> Self {
        Projection::default()
    }

    /// Concatenate projections into one, keeping their order.
    ///
    /// Combining is purely structural: rendering the combined
    /// projection gives the same document as chaining the same calls
    /// on a single builder.
    pub fn combine(parts: impl IntoIterator<Item = Projection>) -> Self {
        let mut ops = Vec::new();
        for part in parts {
            ops.extend(part.ops);
        }
        Projection { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(mut self, field: impl Into<FieldRef>, op: ProjectionOp) -> Self {
        self.ops.push(FieldProjection {
            field: field.into(),
            op,
        });
        self
    }

    pub fn include(self, field: impl Into<FieldRef>) -> Self {
        self.push(field, ProjectionOp::Include)
    }

    pub fn exclude(self, field: impl Into<FieldRef>) -> Self {
        self.push(field, ProjectionOp::Exclude)
    }

    /// Project only the first element of an array field that matches
    /// the fragment.
    pub fn elem_match(
        self,
        field: impl Into<FieldRef>,
        fragment: impl Into<MatchFragment>,
    ) -> Self {
        self.push(field, ProjectionOp::ElemMatch(fragment.into()))
    }

    /// Project a metadata value under the given name. The kind is
    /// checked against the known set when the projection renders.
    pub fn meta(self, field: impl Into<FieldRef>, kind: impl Into<String>) -> Self {
        self.push(field, ProjectionOp::Meta(kind.into()))
    }

    /// Shorthand for the relevance-score projection.
    pub fn text_score(self, field: impl Into<FieldRef>) -> Self {
        self.meta(field, meta::TEXT_SCORE)
    }

    /// Project the leading `limit` elements of an array field, or the
    /// trailing ones when `limit` is negative.
    pub fn slice(self, field: impl Into<FieldRef>, limit: i32) -> Self {
        self.push(field, ProjectionOp::Slice(limit))
    }

    /// Project `limit` elements starting at `skip`.
    pub fn slice_range(self, field: impl Into<FieldRef>, skip: i32, limit: i32) -> Self {
        self.push(field, ProjectionOp::SliceRange { skip, limit })
    }

    /// Parse relaxed projection text. Every entry comes back raw, so
    /// names render verbatim.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Projection::from(parse_document(text)?))
    }
}

impl From<Document> for Projection {
    fn from(doc: Document) -> Self {
        let ops = doc
            .into_iter()
            .map(|(name, value)| FieldProjection {
                field: FieldRef::Raw(name),
                op: ProjectionOp::Raw(value),
            })
            .collect();
        Projection { ops }
    }
}
