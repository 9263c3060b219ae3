//! Query compiler
//!
//! Compiles the JSON query description used by templates and API filters
//! into a predicate tree that is evaluated directly against property bags.
//!
//! ```text
//! {"and": [{"==": {"category": "ALARM"}},
//!          {"or": [{">": {"time": 150}}, {"==": {"is_deleted": true}}]}]}
//! ```
//!
//! - `and` / `or` take a non-empty list of sub-expressions.
//! - `<`, `<=`, `==`, `!=`, `>=`, `>` take an object holding exactly one
//!   `{property: literal}` pair.
//! - At the top level only, `{property: literal}` is an implicit `==`.
//! - Every expression object has exactly one key; combine with `and`.
//!
//! A missing property never raises: it equals nothing, differs from every
//! literal, and is not ordered against anything.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

use super::{GraphError, PropertyBag, PropertyValue, Result};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

impl CompareOp {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">=" => Some(CompareOp::Ge),
            ">" => Some(CompareOp::Gt),
            _ => None,
        }
    }

    /// Operator token
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
        }
    }

    fn apply(self, actual: Option<&PropertyValue>, literal: &PropertyValue) -> bool {
        let actual = match actual {
            Some(value) => value,
            None => return self == CompareOp::Ne,
        };
        match self {
            CompareOp::Eq => actual.loose_eq(literal),
            CompareOp::Ne => !actual.loose_eq(literal),
            op => match actual.loose_cmp(literal) {
                Some(ord) => match op {
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Eq | CompareOp::Ne => false,
                },
                None => false,
            },
        }
    }
}

/// Compiled predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every child holds
    And(Vec<Predicate>),
    /// At least one child holds
    Or(Vec<Predicate>),
    /// Property comparison against a literal
    Compare {
        /// Operator
        op: CompareOp,
        /// Property name
        key: String,
        /// Literal to compare against
        literal: PropertyValue,
    },
}

impl Predicate {
    /// Evaluate against an element
    pub fn evaluate<B: PropertyBag + ?Sized>(&self, element: &B) -> bool {
        match self {
            Predicate::And(children) => children.iter().all(|c| c.evaluate(element)),
            Predicate::Or(children) => children.iter().any(|c| c.evaluate(element)),
            Predicate::Compare { op, key, literal } => op.apply(element.property(key), literal),
        }
    }
}

/// A compiled query together with its JSON description
#[derive(Debug, Clone)]
pub struct Query {
    source: serde_json::Value,
    root: Predicate,
}

impl Query {
    /// Compile a JSON query description
    pub fn compile(source: &serde_json::Value) -> Result<Self> {
        let root = compile_object(source, true).map_err(|e| {
            tracing::warn!(query = %source, error = %e, "invalid query");
            e
        })?;
        tracing::trace!(query = %source, "compiled query");
        Ok(Self {
            source: source.clone(),
            root,
        })
    }

    /// Parse and compile a JSON string
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| GraphError::InvalidQuery(format!("query is not valid JSON: {}", e)))?;
        Self::compile(&value)
    }

    /// Evaluate against an element
    pub fn matches<B: PropertyBag + ?Sized>(&self, element: &B) -> bool {
        self.root.evaluate(element)
    }

    /// Compiled predicate tree
    pub fn predicate(&self) -> &Predicate {
        &self.root
    }

    /// JSON description the query was compiled from
    pub fn as_json(&self) -> &serde_json::Value {
        &self.source
    }
}

/// Compile a JSON query into a reusable closure
pub fn create_predicate<B: PropertyBag + ?Sized>(
    source: &serde_json::Value,
) -> Result<impl Fn(&B) -> bool> {
    let query = Query::compile(source)?;
    Ok(move |element: &B| query.matches(element))
}

fn invalid(message: impl Into<String>) -> GraphError {
    GraphError::InvalidQuery(message.into())
}

fn single_entry<'a>(
    map: &'a serde_json::Map<String, serde_json::Value>,
    what: &str,
) -> Result<(&'a String, &'a serde_json::Value)> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        (None, _) => Err(invalid(format!("empty {}", what))),
        (Some(_), Some(_)) => Err(invalid(format!(
            "{} must have exactly one key, got {}",
            what,
            map.len()
        ))),
    }
}

fn compile_object(value: &serde_json::Value, top_level: bool) -> Result<Predicate> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(format!("expected an object, got {}", value)))?;
    let (key, operand) = single_entry(map, "query expression")?;

    match key.as_str() {
        "and" => Ok(Predicate::And(compile_list(key, operand)?)),
        "or" => Ok(Predicate::Or(compile_list(key, operand)?)),
        token => match CompareOp::parse(token) {
            Some(op) => compile_comparison(op, operand),
            None if top_level && is_literal(operand) => Ok(Predicate::Compare {
                op: CompareOp::Eq,
                key: key.clone(),
                literal: PropertyValue::from_json(operand),
            }),
            None => Err(invalid(format!("unknown operator `{}`", key))),
        },
    }
}

fn compile_list(op: &str, operand: &serde_json::Value) -> Result<Vec<Predicate>> {
    let items = operand
        .as_array()
        .ok_or_else(|| invalid(format!("`{}` requires a list of expressions", op)))?;
    if items.is_empty() {
        return Err(invalid(format!("`{}` requires at least one expression", op)));
    }
    items.iter().map(|item| compile_object(item, false)).collect()
}

fn compile_comparison(op: CompareOp, operand: &serde_json::Value) -> Result<Predicate> {
    let map = operand.as_object().ok_or_else(|| {
        invalid(format!(
            "`{}` requires an object of {{property: value}}",
            op.as_str()
        ))
    })?;
    let (key, literal) = single_entry(map, &format!("`{}` comparison", op.as_str()))?;
    if !is_literal(literal) {
        return Err(invalid(format!(
            "`{}` on `{}` requires a literal value",
            op.as_str(),
            key
        )));
    }
    Ok(Predicate::Compare {
        op,
        key: key.clone(),
        literal: PropertyValue::from_json(literal),
    })
}

fn is_literal(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(_) => false,
        serde_json::Value::Array(items) => items.iter().all(is_literal),
        _ => true,
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = serde_json::Value::deserialize(deserializer)?;
        Query::compile(&source).map_err(serde::de::Error::custom)
    }
}
