use serde::{Deserialize, Serialize};

use crate::field::{FieldRef, POSITIONAL};

/// One declared document member: the logical (in-code) name, the wire
/// name it is stored under, and an optional element map describing the
/// members of an embedded document or of array elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedField {
    pub logical: String,
    pub wire: String,
    pub element: Option<FieldMap>,
}

/// An ordered field-mapping table: logical member names to wire names.
///
/// Field references resolve segment-wise. A segment declared in the
/// active map is replaced by its wire name and the walk descends into
/// that field's element map, if any. Positional (`$`) and numeric
/// segments pass through verbatim and leave the active map unchanged.
/// Unknown segments also pass through verbatim — an unmapped name is
/// never an error — but end the resolution context, so everything after
/// them is emitted as written.
///
/// ```
/// use stencil_schema::{FieldMap, field};
///
/// let map = FieldMap::new()
///     .field("first_name", "fn")
///     .nested("pets", "pets", FieldMap::new().field("name", "name"));
///
/// assert_eq!(map.resolve(&field("pets").child("name").into()), "pets.name");
/// assert_eq!(map.resolve(&"last_name".into()), "last_name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    fields: Vec<MappedField>,
}

impl FieldMap {
    /// An empty map; every path resolves to itself.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a scalar member.
    pub fn field(mut self, logical: impl Into<String>, wire: impl Into<String>) -> Self {
        self.fields.push(MappedField {
            logical: logical.into(),
            wire: wire.into(),
            element: None,
        });
        self
    }

    /// Declare an embedded-document or array member whose elements have
    /// their own field map.
    pub fn nested(
        mut self,
        logical: impl Into<String>,
        wire: impl Into<String>,
        element: FieldMap,
    ) -> Self {
        self.fields.push(MappedField {
            logical: logical.into(),
            wire: wire.into(),
            element: Some(element),
        });
        self
    }

    pub fn get(&self, logical: &str) -> Option<&MappedField> {
        self.fields.iter().find(|f| f.logical == logical)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve a field reference to its dotted wire path.
    pub fn resolve(&self, field: &FieldRef) -> String {
        let mut wire = String::new();
        let mut active: Option<&FieldMap> = Some(self);

        for segment in field.segments() {
            if !wire.is_empty() {
                wire.push('.');
            }
            if is_passthrough(segment) {
                wire.push_str(segment);
                continue;
            }
            match active.and_then(|map| map.get(segment)) {
                Some(mapped) => {
                    wire.push_str(&mapped.wire);
                    active = mapped.element.as_ref();
                }
                None => {
                    wire.push_str(segment);
                    active = None;
                }
            }
        }

        wire
    }

    /// The map governing sub-fields beneath a path, if one is declared.
    ///
    /// Positional and numeric segments do not change the active map, so
    /// `pets.$` and `pets.0` both yield the element map of `pets`.
    pub fn element_map(&self, field: &FieldRef) -> Option<&FieldMap> {
        let mut active = Some(self);
        for segment in field.segments() {
            if is_passthrough(segment) {
                continue;
            }
            active = active
                .and_then(|map| map.get(segment))
                .and_then(|mapped| mapped.element.as_ref());
        }
        active
    }
}

/// Positional markers and numeric array indexes have no logical name to
/// map; they are emitted as written.
fn is_passthrough(segment: &str) -> bool {
    segment == POSITIONAL || (!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::field;

    fn contact_map() -> FieldMap {
        FieldMap::new()
            .field("first_name", "fn")
            .field("age", "age")
            .nested(
                "pets",
                "pets",
                FieldMap::new().field("name", "name").field("kind", "k"),
            )
    }

    #[test]
    fn resolves_declared_scalar() {
        let map = contact_map();
        assert_eq!(map.resolve(&"first_name".into()), "fn");
    }

    #[test]
    fn unknown_name_passes_through() {
        let map = contact_map();
        assert_eq!(map.resolve(&"last_name".into()), "last_name");
    }

    #[test]
    fn resolves_nested_member() {
        let map = contact_map();
        assert_eq!(map.resolve(&"pets.name".into()), "pets.name");
        assert_eq!(map.resolve(&"pets.kind".into()), "pets.k");
    }

    #[test]
    fn typed_and_raw_resolve_identically() {
        let map = contact_map();
        let typed = FieldRef::from(field("pets").child("kind"));
        let raw = FieldRef::from("pets.kind");
        assert_eq!(map.resolve(&typed), map.resolve(&raw));
    }

    #[test]
    fn positional_marker_is_preserved() {
        let map = contact_map();
        assert_eq!(map.resolve(&"pets.$".into()), "pets.$");
        assert_eq!(map.resolve(&"unmapped.$".into()), "unmapped.$");
    }

    #[test]
    fn numeric_segment_keeps_element_map_active() {
        let map = contact_map();
        let path = FieldRef::from(field("pets").at(0).child("kind"));
        assert_eq!(map.resolve(&path), "pets.0.k");
    }

    #[test]
    fn positional_segment_keeps_element_map_active() {
        let map = contact_map();
        let path = FieldRef::from(field("pets").first_match().child("name"));
        assert_eq!(map.resolve(&path), "pets.$.name");
    }

    #[test]
    fn segments_after_unknown_name_pass_verbatim() {
        let map = contact_map();
        assert_eq!(map.resolve(&"last_name.kind".into()), "last_name.kind");
    }

    #[test]
    fn empty_map_resolves_everything_verbatim() {
        let map = FieldMap::new();
        assert!(map.is_empty());
        assert_eq!(map.resolve(&"pets.name".into()), "pets.name");
    }

    #[test]
    fn element_map_of_array_field() {
        let map = contact_map();
        let element = map.element_map(&"pets".into()).unwrap();
        assert_eq!(element.resolve(&"kind".into()), "k");
    }

    #[test]
    fn element_map_through_positional_segment() {
        let map = contact_map();
        let element = map.element_map(&"pets.$".into()).unwrap();
        assert_eq!(element.resolve(&"name".into()), "name");
    }

    #[test]
    fn element_map_of_scalar_or_unknown_is_none() {
        let map = contact_map();
        assert!(map.element_map(&"age".into()).is_none());
        assert!(map.element_map(&"last_name".into()).is_none());
    }
}
