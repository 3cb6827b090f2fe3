use std::collections::HashSet;

use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};
use stencil_schema::{FieldMap, FieldRef};

use crate::error::ParseError;
use crate::parse::validate_regex;

/// A recursive match-expression tree: the filter fragment language used
/// inside `$elemMatch` projections.
///
/// Owns field references and values so a fragment can outlive whatever
/// text or document it was parsed from. Field names are symbolic until
/// [`render`](MatchExpr::render) resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchExpr {
    // Logical
    And(Vec<MatchExpr>),
    Or(Vec<MatchExpr>),
    // Comparison — field reference + value, owned
    Eq(FieldRef, Bson),
    Gt(FieldRef, Bson),
    Gte(FieldRef, Bson),
    Lt(FieldRef, Bson),
    Lte(FieldRef, Bson),
    // Existence
    Exists(FieldRef, bool),
    // Pattern — kept as written; validated when constructed or parsed
    Regex(FieldRef, String, Option<String>),
}

impl MatchExpr {
    pub fn eq(field: impl Into<FieldRef>, value: impl Into<Bson>) -> Self {
        MatchExpr::Eq(field.into(), value.into())
    }

    pub fn gt(field: impl Into<FieldRef>, value: impl Into<Bson>) -> Self {
        MatchExpr::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<FieldRef>, value: impl Into<Bson>) -> Self {
        MatchExpr::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<FieldRef>, value: impl Into<Bson>) -> Self {
        MatchExpr::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<FieldRef>, value: impl Into<Bson>) -> Self {
        MatchExpr::Lte(field.into(), value.into())
    }

    pub fn exists(field: impl Into<FieldRef>, exists: bool) -> Self {
        MatchExpr::Exists(field.into(), exists)
    }

    /// A `$regex` condition. The pattern (and `i`/`s`/`m`/`x` option
    /// flags) are validated here; rendering is then infallible.
    pub fn regex(
        field: impl Into<FieldRef>,
        pattern: impl Into<String>,
        options: Option<&str>,
    ) -> Result<Self, ParseError> {
        let pattern = pattern.into();
        validate_regex(&pattern, options)?;
        Ok(MatchExpr::Regex(
            field.into(),
            pattern,
            options.map(str::to_string),
        ))
    }

    pub fn and(children: impl IntoIterator<Item = MatchExpr>) -> Self {
        MatchExpr::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = MatchExpr>) -> Self {
        MatchExpr::Or(children.into_iter().collect())
    }

    /// Render the expression into a canonical filter document.
    ///
    /// Field names resolve through `map` when one is given (unmapped
    /// names pass through verbatim). An `And` whose children target
    /// distinct names renders as flat sibling keys; otherwise it falls
    /// back to an explicit `$and` array.
    pub fn render(&self, map: Option<&FieldMap>) -> Document {
        match self {
            MatchExpr::And(children) => render_and(children, map),
            MatchExpr::Or(children) => {
                let parts: Vec<Bson> = children
                    .iter()
                    .map(|child| Bson::Document(child.render(map)))
                    .collect();
                doc! { "$or": parts }
            }
            MatchExpr::Eq(field, value) => {
                let mut out = Document::new();
                out.insert(resolve(field, map), value.clone());
                out
            }
            MatchExpr::Gt(field, value) => operator_doc(field, "$gt", value.clone(), map),
            MatchExpr::Gte(field, value) => operator_doc(field, "$gte", value.clone(), map),
            MatchExpr::Lt(field, value) => operator_doc(field, "$lt", value.clone(), map),
            MatchExpr::Lte(field, value) => operator_doc(field, "$lte", value.clone(), map),
            MatchExpr::Exists(field, exists) => {
                operator_doc(field, "$exists", Bson::Boolean(*exists), map)
            }
            MatchExpr::Regex(field, pattern, options) => {
                let mut condition = doc! { "$regex": pattern.as_str() };
                if let Some(options) = options {
                    condition.insert("$options", options.as_str());
                }
                let mut out = Document::new();
                out.insert(resolve(field, map), condition);
                out
            }
        }
    }
}

fn resolve(field: &FieldRef, map: Option<&FieldMap>) -> String {
    match map {
        Some(map) => map.resolve(field),
        None => field.text().into_owned(),
    }
}

fn operator_doc(field: &FieldRef, op: &str, value: Bson, map: Option<&FieldMap>) -> Document {
    let mut condition = Document::new();
    condition.insert(op, value);
    let mut out = Document::new();
    out.insert(resolve(field, map), condition);
    out
}

fn render_and(children: &[MatchExpr], map: Option<&FieldMap>) -> Document {
    let parts: Vec<Document> = children.iter().map(|child| child.render(map)).collect();

    let distinct = {
        let mut seen = HashSet::new();
        parts
            .iter()
            .flat_map(|part| part.keys())
            .all(|key| seen.insert(key.as_str()))
    };

    if distinct {
        let mut merged = Document::new();
        for part in parts {
            for (key, value) in part {
                merged.insert(key, value);
            }
        }
        merged
    } else {
        let parts: Vec<Bson> = parts.into_iter().map(Bson::Document).collect();
        doc! { "$and": parts }
    }
}

/// The payload of an `$elemMatch` projection, stored opaquely until the
/// enclosing projection renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFragment {
    /// A typed expression tree.
    Expr(MatchExpr),
    /// Raw filter text, parsed at render time.
    Text(String),
    /// A pre-rendered filter document, emitted as-is.
    Doc(Document),
}

impl MatchFragment {
    /// Render the fragment against the element map of the enclosing
    /// array field.
    ///
    /// Inner field names resolve through `map` with verbatim fallback,
    /// independently of how the outer path resolved. `Doc` fragments
    /// are emitted untouched; `Text` fragments surface parse errors
    /// here, not when the fragment was stored.
    pub fn render(&self, map: Option<&FieldMap>) -> Result<Document, ParseError> {
        match self {
            MatchFragment::Expr(expr) => Ok(expr.render(map)),
            MatchFragment::Text(text) => Ok(MatchExpr::parse(text)?.render(map)),
            MatchFragment::Doc(doc) => Ok(doc.clone()),
        }
    }
}

impl From<MatchExpr> for MatchFragment {
    fn from(expr: MatchExpr) -> Self {
        MatchFragment::Expr(expr)
    }
}

impl From<&str> for MatchFragment {
    fn from(text: &str) -> Self {
        MatchFragment::Text(text.to_string())
    }
}

impl From<String> for MatchFragment {
    fn from(text: String) -> Self {
        MatchFragment::Text(text)
    }
}

impl From<Document> for MatchFragment {
    fn from(doc: Document) -> Self {
        MatchFragment::Doc(doc)
    }
}
