//! Typed values as seen by plan modifiers.
//!
//! A [`Value`] is either null (the attribute is absent), unknown (it will only
//! be known after apply), or a known value. Values carry no type of their own;
//! the [`Type`] comes from the schema and is checked with
//! [`Value::conforms_to`].

use std::{collections::BTreeMap, fmt};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Number};

use crate::path::{AttributePath, PathStep};

/// Key of the JSON object that stands in for an unknown value
pub const UNKNOWN_JSON_KEY: &str = "$unknown";

/// The type of a value, following the cty type system used by Terraform providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Number,
    String,
    /// Accepts a value of any type
    Dynamic,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object(BTreeMap<String, Type>),
}

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn set(element: Type) -> Type {
        Type::Set(Box::new(element))
    }

    pub fn map(element: Type) -> Type {
        Type::Map(Box::new(element))
    }

    pub fn object<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Type)>) -> Type {
        Type::Object(
            attributes
                .into_iter()
                .map(|(k, t)| (k.into(), t))
                .collect(),
        )
    }

    /// Parse the JSON representation of a cty type, as found in the `type`
    /// field of a provider schema attribute.
    ///
    /// ```text
    /// "string"
    /// ["list", "string"]
    /// ["object", {"name": "string", "port": "number"}]
    /// ```
    pub fn from_cty_json(json: &serde_json::Value) -> Result<Type> {
        match json {
            serde_json::Value::String(s) => match s.as_str() {
                "bool" => Ok(Type::Bool),
                "number" => Ok(Type::Number),
                "string" => Ok(Type::String),
                "dynamic" => Ok(Type::Dynamic),
                other => bail!("unknown primitive type: {}", other),
            },
            serde_json::Value::Array(parts) => {
                let kind = parts
                    .first()
                    .and_then(|k| k.as_str())
                    .context("type array must start with a type name")?;
                let arg = parts
                    .get(1)
                    .with_context(|| format!("type {} needs an argument", kind))?;
                match kind {
                    "list" => Ok(Type::list(Type::from_cty_json(arg)?)),
                    "set" => Ok(Type::set(Type::from_cty_json(arg)?)),
                    "map" => Ok(Type::map(Type::from_cty_json(arg)?)),
                    "object" => {
                        let attrs = arg
                            .as_object()
                            .context("object type needs a map of attribute types")?;
                        let mut r = BTreeMap::new();
                        for (name, t) in attrs {
                            let t = Type::from_cty_json(t)
                                .with_context(|| format!("in object attribute {}", name))?;
                            r.insert(name.clone(), t);
                        }
                        Ok(Type::Object(r))
                    }
                    other => bail!("unsupported type constructor: {}", other),
                }
            }
            other => bail!("invalid type JSON: {}", other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Dynamic => write!(f, "dynamic"),
            Type::List(t) => write!(f, "list({})", t),
            Type::Set(t) => write!(f, "set({})", t),
            Type::Map(t) => write!(f, "map({})", t),
            Type::Object(attrs) => {
                write!(f, "object({{")?;
                for (i, (name, t)) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, t)?;
                }
                write!(f, "}})")
            }
        }
    }
}

/// A configuration, plan or state value.
///
/// Set elements are kept in the order in which they were given, without
/// duplicates. That order is what the tree walk iterates over; equality of
/// sets ignores it.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Unknown,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn number(n: impl Into<Number>) -> Value {
        Value::Number(n.into())
    }

    pub fn list(elements: impl IntoIterator<Item = Value>) -> Value {
        Value::List(elements.into_iter().collect())
    }

    /// Build a set, dropping wholly known elements equal to an earlier one.
    ///
    /// Elements that contain unknowns are always kept: they may turn out to
    /// be different once known.
    pub fn set(elements: impl IntoIterator<Item = Value>) -> Value {
        let mut r: Vec<Value> = Vec::new();
        for e in elements {
            if !(e.is_wholly_known() && r.contains(&e)) {
                r.push(e);
            }
        }
        Value::Set(r)
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn object<K: Into<String>>(attributes: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Neither null nor unknown
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    /// Known, and without unknowns anywhere inside
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown => false,
            Value::List(es) | Value::Set(es) => es.iter().all(Value::is_wholly_known),
            Value::Map(es) | Value::Object(es) => es.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Short name of the value's shape, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Unknown => "unknown",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Whether this value can be stored in an attribute of type `t`.
    /// Null and unknown conform to every type.
    pub fn conforms_to(&self, t: &Type) -> bool {
        match (self, t) {
            (Value::Null | Value::Unknown, _) => true,
            (_, Type::Dynamic) => true,
            (Value::Bool(_), Type::Bool) => true,
            (Value::Number(_), Type::Number) => true,
            (Value::String(_), Type::String) => true,
            (Value::List(es), Type::List(et)) | (Value::Set(es), Type::Set(et)) => {
                es.iter().all(|e| e.conforms_to(et))
            }
            (Value::Map(es), Type::Map(et)) => es.values().all(|e| e.conforms_to(et)),
            (Value::Object(fields), Type::Object(attrs)) => {
                fields.len() == attrs.len()
                    && attrs
                        .iter()
                        .all(|(name, at)| fields.get(name).is_some_and(|v| v.conforms_to(at)))
            }
            _ => false,
        }
    }

    /// Look up a nested value. Missing children and children of null are
    /// null; children of unknown are unknown.
    pub fn at_path(&self, path: &AttributePath) -> Value {
        let mut current = self;
        for step in path.steps() {
            if current.is_unknown() {
                return Value::Unknown;
            }
            let next = match (step, current) {
                (PathStep::AttributeName(name), Value::Object(fields)) => fields.get(name),
                (PathStep::ElementKeyString(key), Value::Map(entries)) => entries.get(key),
                (PathStep::ElementKeyInt(idx), Value::List(elements)) => elements.get(*idx),
                (PathStep::ElementKeyValue(v), Value::Set(elements)) => {
                    elements.iter().find(|e| *e == v)
                }
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Value::Null,
            }
        }
        current.clone()
    }

    /// Type-directed conversion from JSON.
    ///
    /// JSON `null` is a null value, and `{"$unknown": true}` is an unknown value.
    pub fn from_json(json: &serde_json::Value, t: &Type) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        if is_unknown_marker(json) {
            return Ok(Value::Unknown);
        }
        match (t, json) {
            (Type::Bool, serde_json::Value::Bool(b)) => Ok(Value::Bool(*b)),
            (Type::Number, serde_json::Value::Number(n)) => Ok(Value::Number(n.clone())),
            (Type::String, serde_json::Value::String(s)) => Ok(Value::String(s.clone())),
            (Type::List(et), serde_json::Value::Array(es)) => Ok(Value::List(
                es.iter()
                    .enumerate()
                    .map(|(i, e)| {
                        Value::from_json(e, et).with_context(|| format!("in list element {}", i))
                    })
                    .collect::<Result<_>>()?,
            )),
            (Type::Set(et), serde_json::Value::Array(es)) => Ok(Value::set(
                es.iter()
                    .map(|e| Value::from_json(e, et).context("in set element"))
                    .collect::<Result<Vec<_>>>()?,
            )),
            (Type::Map(et), serde_json::Value::Object(es)) => {
                let mut r = BTreeMap::new();
                for (k, e) in es {
                    let v = Value::from_json(e, et)
                        .with_context(|| format!("in map element {:?}", k))?;
                    r.insert(k.clone(), v);
                }
                Ok(Value::Map(r))
            }
            (Type::Object(attrs), serde_json::Value::Object(fields)) => {
                for name in fields.keys() {
                    if !attrs.contains_key(name) {
                        bail!("unexpected object attribute: {}", name);
                    }
                }
                let mut r = BTreeMap::new();
                for (name, at) in attrs {
                    let v = match fields.get(name) {
                        Some(f) => Value::from_json(f, at)
                            .with_context(|| format!("in object attribute {}", name))?,
                        None => Value::Null,
                    };
                    r.insert(name.clone(), v);
                }
                Ok(Value::Object(r))
            }
            (Type::Dynamic, json) => Ok(Value::from_dynamic_json(json)),
            (t, json) => bail!("expected a value of type {}, got JSON {}", t, json),
        }
    }

    fn from_dynamic_json(json: &serde_json::Value) -> Value {
        if is_unknown_marker(json) {
            return Value::Unknown;
        }
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.clone()),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(es) => {
                Value::List(es.iter().map(Value::from_dynamic_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_dynamic_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Unknown => {
                let mut m = Map::new();
                m.insert(UNKNOWN_JSON_KEY.to_string(), serde_json::Value::Bool(true));
                serde_json::Value::Object(m)
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(es) | Value::Set(es) => {
                serde_json::Value::Array(es.iter().map(Value::to_json).collect())
            }
            Value::Map(es) | Value::Object(es) => serde_json::Value::Object(
                es.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn is_unknown_marker(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Object(m) => {
            m.len() == 1 && m.get(UNKNOWN_JSON_KEY) == Some(&serde_json::Value::Bool(true))
        }
        _ => false,
    }
}

fn number_eq(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn canonical_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Unknown, Value::Unknown) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_eq(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|e| b.contains(e))
            }
            (Value::Map(a), Value::Map(b)) | (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Canonical rendering: equal values render identically, which is what
/// attribute paths rely on for their ordering.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Unknown => write!(f, "<unknown>"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", canonical_number(n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(es) => {
                write!(f, "[")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Value::Set(es) => {
                let mut rendered: Vec<String> = es.iter().map(|e| e.to_string()).collect();
                rendered.sort();
                write!(f, "set[{}]", rendered.join(", "))
            }
            Value::Map(es) | Value::Object(es) => {
                write!(f, "{{")?;
                for (i, (k, v)) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}
