use bson::{Bson, Document};
use regex::Regex;
use stencil_schema::FieldRef;

use crate::error::ParseError;
use crate::expr::MatchExpr;
use crate::text::parse_document;

impl MatchExpr {
    /// Parse relaxed filter text into an expression tree.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let doc = parse_document(text)?;
        MatchExpr::from_document(&doc)
    }

    /// Build an expression tree from a filter document.
    ///
    /// Top-level keys combine as an implicit `And`; a single key
    /// becomes that condition directly. An empty document is rejected
    /// rather than treated as match-all.
    pub fn from_document(doc: &Document) -> Result<Self, ParseError> {
        if doc.is_empty() {
            return Err(ParseError("empty match document".to_string()));
        }
        let mut children = Vec::new();
        for (key, value) in doc {
            if key.starts_with('$') {
                match key.as_str() {
                    "$and" => children.push(parse_logical_array(value, MatchExpr::And)?),
                    "$or" => children.push(parse_logical_array(value, MatchExpr::Or)?),
                    other => return Err(ParseError(format!("unknown operator '{other}'"))),
                }
            } else {
                children.push(parse_field_condition(key, value)?);
            }
        }
        if children.len() == 1 {
            // Emptiness is ruled out above.
            return Ok(children.pop().unwrap());
        }
        Ok(MatchExpr::And(children))
    }
}

fn parse_logical_array(
    value: &Bson,
    make: fn(Vec<MatchExpr>) -> MatchExpr,
) -> Result<MatchExpr, ParseError> {
    let Bson::Array(items) = value else {
        return Err(ParseError("logical operators take an array".to_string()));
    };
    if items.is_empty() {
        return Err(ParseError(
            "logical operators need at least one clause".to_string(),
        ));
    }
    let mut children = Vec::with_capacity(items.len());
    for item in items {
        let Bson::Document(doc) = item else {
            return Err(ParseError("logical clauses must be documents".to_string()));
        };
        children.push(MatchExpr::from_document(doc)?);
    }
    Ok(make(children))
}

fn parse_field_condition(field: &str, value: &Bson) -> Result<MatchExpr, ParseError> {
    let field = FieldRef::Raw(field.to_string());
    match value {
        Bson::Document(doc) if is_operator_doc(doc) => parse_operator_doc(field, doc),
        other => Ok(MatchExpr::Eq(field, other.clone())),
    }
}

// A value document is an operator condition when its first key is
// `$`-prefixed; anything else is an equality match on the embedded
// document itself.
fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn parse_operator_doc(field: FieldRef, doc: &Document) -> Result<MatchExpr, ParseError> {
    if doc.contains_key("$regex") {
        return parse_regex(field, doc);
    }
    let mut children = Vec::new();
    for (key, value) in doc {
        let expr = match key.as_str() {
            "$eq" => MatchExpr::Eq(field.clone(), value.clone()),
            "$gt" => MatchExpr::Gt(field.clone(), value.clone()),
            "$gte" => MatchExpr::Gte(field.clone(), value.clone()),
            "$lt" => MatchExpr::Lt(field.clone(), value.clone()),
            "$lte" => MatchExpr::Lte(field.clone(), value.clone()),
            "$exists" => match value {
                Bson::Boolean(exists) => MatchExpr::Exists(field.clone(), *exists),
                _ => return Err(ParseError("$exists takes a boolean".to_string())),
            },
            "$options" => {
                return Err(ParseError("$options requires a $regex sibling".to_string()));
            }
            other => return Err(ParseError(format!("unknown operator '{other}'"))),
        };
        children.push(expr);
    }
    if children.len() == 1 {
        return Ok(children.pop().unwrap());
    }
    Ok(MatchExpr::And(children))
}

fn parse_regex(field: FieldRef, doc: &Document) -> Result<MatchExpr, ParseError> {
    let mut pattern = None;
    let mut options = None;
    for (key, value) in doc {
        match (key.as_str(), value) {
            ("$regex", Bson::String(text)) => pattern = Some(text.clone()),
            ("$regex", _) => return Err(ParseError("$regex takes a string".to_string())),
            ("$options", Bson::String(text)) => options = Some(text.clone()),
            ("$options", _) => return Err(ParseError("$options takes a string".to_string())),
            (other, _) => {
                return Err(ParseError(format!("unexpected '{other}' beside $regex")));
            }
        }
    }
    // The caller checked for the $regex key.
    let pattern = pattern.unwrap();
    validate_regex(&pattern, options.as_deref())?;
    Ok(MatchExpr::Regex(field, pattern, options))
}

/// Check a pattern and its option flags without keeping the compiled
/// regex. Only `i`, `s`, `m` and `x` flags are accepted.
pub(crate) fn validate_regex(pattern: &str, options: Option<&str>) -> Result<(), ParseError> {
    if let Some(options) = options {
        for flag in options.chars() {
            if !matches!(flag, 'i' | 's' | 'm' | 'x') {
                return Err(ParseError(format!("unknown regex option '{flag}'")));
            }
        }
    }
    let full = match options {
        Some(options) if !options.is_empty() => format!("(?{options}){pattern}"),
        _ => pattern.to_string(),
    };
    Regex::new(&full).map_err(|err| ParseError(format!("invalid regex: {err}")))?;
    Ok(())
}
