//! Schema Validator & Repairer for provider JSON.
//!
//! Schemas are declarative: a tree of `FieldSpec`s, each carrying its canonical
//! name, the alternate names providers tend to emit, its kind and whether it is
//! required. Validation is two-pass:
//!
//! 1. strict check against canonical names and types;
//! 2. only if that fails, a tolerant reshape (alias renames, wrapper fixes,
//!    numeric coercion, default filling, pruning of hollow items) followed by
//!    a second strict check.
//!
//! Unknown extra fields are ignored, never violations.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Number,
    Text,
    Object(&'static [FieldSpec]),
    /// Array of objects. Items violating a nested `min_items` are pruned on repair.
    List {
        fields: &'static [FieldSpec],
        min_items: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn number(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            kind: FieldKind::Number,
            required: true,
        }
    }

    pub const fn text(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            kind: FieldKind::Text,
            required: true,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }
}

/// A complete response contract.
#[derive(Debug)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub root: &'static [FieldSpec],
    /// A bare-array root is wrapped under this field.
    pub bare_array_field: Option<&'static str>,
    /// A root that is missing this object field but carries its children inline
    /// (e.g. a flat meal with top-level `ingredients`) is nested under it.
    pub inline_object_field: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response does not match {schema} ({} violations): {}", .violations.len(), summarize(.violations))]
    ShapeMismatch {
        schema: &'static str,
        violations: Vec<SchemaViolation>,
    },
}

fn summarize(violations: &[SchemaViolation]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = violations.iter().take(SHOWN).map(ToString::to_string).collect();
    if violations.len() > SHOWN {
        parts.push(format!("… and {} more", violations.len() - SHOWN));
    }
    parts.join("; ")
}

/// Typed output plus the list of repairs that were needed to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub repairs: Vec<String>,
}

impl<T> Validated<T> {
    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }
}

/// Parsed document, classified by whether it already satisfies the schema.
enum Shape {
    Strict(Value),
    NeedsReshape(Value, Vec<SchemaViolation>),
}

impl Shape {
    fn classify(value: Value, schema: &ResponseSchema) -> Self {
        let violations = check(&value, schema);
        if violations.is_empty() {
            Shape::Strict(value)
        } else {
            Shape::NeedsReshape(value, violations)
        }
    }
}

pub fn validate_and_repair<T: DeserializeOwned>(
    raw: &str,
    schema: &ResponseSchema,
) -> Result<Validated<T>, SchemaError> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

    let (value, repairs) = match Shape::classify(parsed, schema) {
        Shape::Strict(value) => (value, Vec::new()),
        Shape::NeedsReshape(mut value, first_violations) => {
            tracing::debug!(
                "{} failed strict check with {} violations, attempting repair",
                schema.name,
                first_violations.len()
            );
            let mut repairs = Vec::new();
            reshape(&mut value, schema, &mut repairs);
            let remaining = check(&value, schema);
            if !remaining.is_empty() {
                return Err(SchemaError::ShapeMismatch {
                    schema: schema.name,
                    violations: remaining,
                });
            }
            (value, repairs)
        }
    };

    let value = serde_json::from_value(value).map_err(|e| SchemaError::ShapeMismatch {
        schema: schema.name,
        violations: vec![SchemaViolation {
            path: "$".to_string(),
            expected: schema.name.to_string(),
            found: e.to_string(),
        }],
    })?;
    Ok(Validated { value, repairs })
}

// ────────────────────────────────────────────────────────────────────────────
// Strict check
// ────────────────────────────────────────────────────────────────────────────

pub fn check(value: &Value, schema: &ResponseSchema) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();
    match value.as_object() {
        Some(obj) => check_object(obj, schema.root, "$", &mut violations),
        None => violations.push(SchemaViolation {
            path: "$".to_string(),
            expected: "object".to_string(),
            found: describe(Some(value)),
        }),
    }
    violations
}

fn check_object(obj: &Map<String, Value>, fields: &[FieldSpec], path: &str, out: &mut Vec<SchemaViolation>) {
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        let value = obj.get(field.name);
        if value.map_or(true, Value::is_null) {
            if field.required {
                out.push(violation(&field_path, expected(&field.kind), value));
            }
            continue;
        }
        check_value(value, &field.kind, &field_path, out);
    }
}

fn check_value(value: Option<&Value>, kind: &FieldKind, path: &str, out: &mut Vec<SchemaViolation>) {
    match (kind, value) {
        (FieldKind::Number, Some(Value::Number(n))) if n.as_f64().is_some_and(|v| v >= 0.0) => {}
        (FieldKind::Text, Some(Value::String(_))) => {}
        (FieldKind::Object(fields), Some(Value::Object(obj))) => check_object(obj, fields, path, out),
        (FieldKind::List { fields, min_items }, Some(Value::Array(items))) => {
            if items.len() < *min_items {
                out.push(SchemaViolation {
                    path: path.to_string(),
                    expected: format!("array of at least {min_items} item(s)"),
                    found: describe(value),
                });
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                match item.as_object() {
                    Some(obj) => check_object(obj, fields, &item_path, out),
                    None => out.push(violation(&item_path, "object".to_string(), Some(item))),
                }
            }
        }
        _ => out.push(violation(path, expected(kind), value)),
    }
}

fn violation(path: &str, expected: String, found: Option<&Value>) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        expected,
        found: describe(found),
    }
}

fn expected(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Number => "non-negative number".to_string(),
        FieldKind::Text => "string".to_string(),
        FieldKind::Object(_) => "object".to_string(),
        FieldKind::List { .. } => "array".to_string(),
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(_)) => "boolean".to_string(),
        Some(Value::Number(n)) => format!("number {n}"),
        Some(Value::String(s)) => format!("string {:?}", s.chars().take(40).collect::<String>()),
        Some(Value::Array(a)) => format!("array of {}", a.len()),
        Some(Value::Object(_)) => "object".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Repair
// ────────────────────────────────────────────────────────────────────────────

fn reshape(value: &mut Value, schema: &ResponseSchema, repairs: &mut Vec<String>) {
    if let Some(field) = schema.bare_array_field {
        if value.is_array() {
            let mut wrapper = Map::new();
            wrapper.insert(field.to_string(), value.take());
            *value = Value::Object(wrapper);
            repairs.push(format!("wrapped bare array under {field}"));
        }
    }

    let Value::Object(obj) = value else {
        return;
    };

    if let Some(field) = schema.inline_object_field {
        nest_inline_object(obj, schema.root, field, repairs);
    }

    repair_object(obj, schema.root, "$", repairs);
}

/// Moves every root key that is not itself a root field into a new `field` object.
fn nest_inline_object(obj: &mut Map<String, Value>, root: &[FieldSpec], field: &str, repairs: &mut Vec<String>) {
    let Some(spec) = root.iter().find(|f| f.name == field) else {
        return;
    };
    let FieldKind::Object(children) = spec.kind else {
        return;
    };
    if obj.contains_key(spec.name) || spec.aliases.iter().any(|a| obj.contains_key(*a)) {
        return;
    }
    let carries_children = children
        .iter()
        .any(|c| obj.contains_key(c.name) || c.aliases.iter().any(|a| obj.contains_key(*a)));
    if !carries_children {
        return;
    }

    let is_root_field =
        |key: &str| root.iter().any(|f| f.name == key || f.aliases.iter().any(|a| *a == key));
    let inline_keys: Vec<String> = obj.keys().filter(|k| !is_root_field(k.as_str())).cloned().collect();
    let mut inner = Map::new();
    for key in inline_keys {
        if let Some(v) = obj.remove(&key) {
            inner.insert(key, v);
        }
    }
    obj.insert(spec.name.to_string(), Value::Object(inner));
    repairs.push(format!("nested inline fields under {}", spec.name));
}

fn repair_object(obj: &mut Map<String, Value>, fields: &[FieldSpec], path: &str, repairs: &mut Vec<String>) {
    for field in fields {
        let field_path = format!("{path}.{}", field.name);

        if !obj.contains_key(field.name) {
            if let Some(alias) = field.aliases.iter().find(|a| obj.contains_key(**a)) {
                if let Some(v) = obj.remove(*alias) {
                    obj.insert(field.name.to_string(), v);
                    repairs.push(format!("renamed {path}.{alias} to {}", field.name));
                }
            }
        }

        let present = obj.get(field.name).is_some_and(|v| !v.is_null());
        if !present {
            if field.required {
                if let Some(default) = default_for(&field.kind) {
                    obj.insert(field.name.to_string(), default);
                    repairs.push(format!("filled missing {field_path}"));
                }
            }
            continue;
        }

        if let Some(slot) = obj.get_mut(field.name) {
            repair_value(slot, &field.kind, &field_path, repairs);
        }
    }
}

fn default_for(kind: &FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Number => Some(Value::from(0)),
        FieldKind::Text => Some(Value::String(String::new())),
        FieldKind::Object(_) | FieldKind::List { .. } => None,
    }
}

fn repair_value(value: &mut Value, kind: &FieldKind, path: &str, repairs: &mut Vec<String>) {
    match kind {
        FieldKind::Number => {
            let coerced = match &*value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => parse_leading_number(s),
                _ => None,
            };
            let fixed = coerced.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0);
            let unchanged = matches!(&*value, Value::Number(n) if n.as_f64() == Some(fixed));
            if !unchanged {
                *value = serde_json::Number::from_f64(fixed).map_or(Value::from(0), Value::Number);
                repairs.push(format!("coerced {path} to {fixed}"));
            }
        }
        FieldKind::Text => {
            let text = match &*value {
                Value::String(_) => return,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => String::new(),
            };
            *value = Value::String(text);
            repairs.push(format!("coerced {path} to string"));
        }
        FieldKind::Object(fields) => {
            if let Value::Object(obj) = value {
                repair_object(obj, fields, path, repairs);
            }
        }
        FieldKind::List { fields, .. } => {
            if value.is_object() {
                let single = value.take();
                *value = Value::Array(vec![single]);
                repairs.push(format!("wrapped single object at {path} in an array"));
            }
            let Value::Array(items) = value else {
                return;
            };
            let before = items.len();
            items.retain(Value::is_object);
            for (i, item) in items.iter_mut().enumerate() {
                if let Value::Object(obj) = item {
                    repair_object(obj, fields, &format!("{path}[{i}]"), repairs);
                }
            }
            items.retain(|item| !is_hollow(item, fields));
            if items.len() != before {
                repairs.push(format!("dropped {} empty item(s) from {path}", before - items.len()));
            }
        }
    }
}

/// An item whose nested required list is missing or shorter than its minimum.
fn is_hollow(item: &Value, fields: &[FieldSpec]) -> bool {
    fields.iter().any(|f| match f.kind {
        FieldKind::List { min_items, .. } if f.required && min_items > 0 => item
            .get(f.name)
            .and_then(Value::as_array)
            .map_or(true, |a| a.len() < min_items),
        _ => false,
    })
}

/// Parses strings such as `"120"`, `"12.5 g"`, `"1,200 kcal"`.
fn parse_leading_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    let end = cleaned
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))))
        .map_or(cleaned.len(), |(i, _)| i);
    cleaned[..end].parse().ok()
}
