use std::fmt;

use indexmap::IndexMap;
use kwbridge_runtime::ObjectRef;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A value in the host's dynamic type system.
///
/// `Int` and `Float` are distinct kinds and `Bool` is never an integer.
/// `List` is an ordered sequence, `Set` an unordered collection (kept in
/// insertion order), `Map` a text-keyed mapping in insertion order and
/// `Handle` an opaque reference to a managed object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<HostValue>),
    Set(Vec<HostValue>),
    Map(IndexMap<String, HostValue>),
    Handle(ObjectRef),
}

impl HostValue {
    /// Host type name, as shown in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "None",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Text(_) => "str",
            HostValue::List(_) => "list",
            HostValue::Set(_) => "set",
            HostValue::Map(_) => "dict",
            HostValue::Handle(_) => "handle",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HostValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&ObjectRef> {
        match self {
            HostValue::Handle(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "None"),
            HostValue::Bool(true) => write!(f, "True"),
            HostValue::Bool(false) => write!(f, "False"),
            HostValue::Int(i) => write!(f, "{i}"),
            HostValue::Float(x) => write!(f, "{x:?}"),
            HostValue::Text(s) => write!(f, "{s}"),
            HostValue::List(items) | HostValue::Set(items) => {
                let (open, close) = if matches!(self, HostValue::Set(_)) {
                    ('{', '}')
                } else {
                    ('[', ']')
                };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
            HostValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            HostValue::Handle(obj) => write!(f, "<{obj:?}>"),
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HostValue::Null => serializer.serialize_unit(),
            HostValue::Bool(b) => serializer.serialize_bool(*b),
            HostValue::Int(i) => serializer.serialize_i64(*i),
            HostValue::Float(x) => serializer.serialize_f64(*x),
            HostValue::Text(s) => serializer.serialize_str(s),
            HostValue::List(items) | HostValue::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HostValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            HostValue::Handle(obj) => serializer.serialize_str(&format!("{obj:?}")),
        }
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(b) => HostValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => HostValue::Int(i),
                None => HostValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => HostValue::Text(s),
            serde_json::Value::Array(items) => {
                HostValue::List(items.into_iter().map(HostValue::from).collect())
            }
            serde_json::Value::Object(entries) => HostValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, HostValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&HostValue> for serde_json::Value {
    fn from(value: &HostValue) -> Self {
        serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<i32> for HostValue {
    fn from(i: i32) -> Self {
        HostValue::Int(i64::from(i))
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        HostValue::Int(i)
    }
}

impl From<f64> for HostValue {
    fn from(x: f64) -> Self {
        HostValue::Float(x)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Text(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Text(s)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, HostValue>> for HostValue {
    fn from(map: IndexMap<String, HostValue>) -> Self {
        HostValue::Map(map)
    }
}

impl From<ObjectRef> for HostValue {
    fn from(obj: ObjectRef) -> Self {
        HostValue::Handle(obj)
    }
}
