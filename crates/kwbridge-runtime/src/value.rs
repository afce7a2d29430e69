use std::fmt;

use indexmap::IndexMap;

use crate::class::ObjectRef;

/// A value as the managed runtime sees it.
///
/// Numbers keep their boxed width: `Integer` and `Float` are the 32-bit
/// wrappers, `Long` and `Double` the 64-bit ones. Lists and maps preserve
/// insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    List(Vec<ManagedValue>),
    Map(IndexMap<String, ManagedValue>),
    Object(ObjectRef),
}

impl ManagedValue {
    /// Runtime class name of the boxed value.
    pub fn type_name(&self) -> &str {
        match self {
            ManagedValue::Null => "null",
            ManagedValue::Boolean(_) => "rt.lang.Boolean",
            ManagedValue::Integer(_) => "rt.lang.Integer",
            ManagedValue::Long(_) => "rt.lang.Long",
            ManagedValue::Float(_) => "rt.lang.Float",
            ManagedValue::Double(_) => "rt.lang.Double",
            ManagedValue::Str(_) => "rt.lang.String",
            ManagedValue::List(_) => "rt.util.ArrayList",
            ManagedValue::Map(_) => "rt.util.LinkedHashMap",
            ManagedValue::Object(obj) => obj.class().name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ManagedValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ManagedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ManagedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ManagedValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ManagedValue::Integer(i) => Some(i64::from(*i)),
            ManagedValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ManagedValue::Float(f) => Some(f64::from(*f)),
            ManagedValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ManagedValue]> {
        match self {
            ManagedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ManagedValue>> {
        match self {
            ManagedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            ManagedValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Display for ManagedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedValue::Null => write!(f, "null"),
            ManagedValue::Boolean(b) => write!(f, "{b}"),
            ManagedValue::Integer(i) => write!(f, "{i}"),
            ManagedValue::Long(l) => write!(f, "{l}"),
            ManagedValue::Float(x) => write!(f, "{x:?}"),
            ManagedValue::Double(x) => write!(f, "{x:?}"),
            ManagedValue::Str(s) => write!(f, "{s}"),
            ManagedValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ManagedValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
            ManagedValue::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<bool> for ManagedValue {
    fn from(b: bool) -> Self {
        ManagedValue::Boolean(b)
    }
}

impl From<i32> for ManagedValue {
    fn from(i: i32) -> Self {
        ManagedValue::Integer(i)
    }
}

impl From<i64> for ManagedValue {
    fn from(l: i64) -> Self {
        ManagedValue::Long(l)
    }
}

impl From<f32> for ManagedValue {
    fn from(f: f32) -> Self {
        ManagedValue::Float(f)
    }
}

impl From<f64> for ManagedValue {
    fn from(d: f64) -> Self {
        ManagedValue::Double(d)
    }
}

impl From<&str> for ManagedValue {
    fn from(s: &str) -> Self {
        ManagedValue::Str(s.to_string())
    }
}

impl From<String> for ManagedValue {
    fn from(s: String) -> Self {
        ManagedValue::Str(s)
    }
}

impl From<Vec<String>> for ManagedValue {
    fn from(items: Vec<String>) -> Self {
        ManagedValue::List(items.into_iter().map(ManagedValue::Str).collect())
    }
}

impl From<ObjectRef> for ManagedValue {
    fn from(obj: ObjectRef) -> Self {
        ManagedValue::Object(obj)
    }
}

/// Declared type of a method parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
    Object,
    Str,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    List,
    Map,
    Void,
    Class(String),
}

impl TypeSig {
    /// The unqualified type name as reflection reports it.
    pub fn simple_name(&self) -> &str {
        match self {
            TypeSig::Object => "Object",
            TypeSig::Str => "String",
            TypeSig::Boolean => "boolean",
            TypeSig::Int => "int",
            TypeSig::Long => "long",
            TypeSig::Float => "float",
            TypeSig::Double => "double",
            TypeSig::List => "List",
            TypeSig::Map => "Map",
            TypeSig::Void => "void",
            TypeSig::Class(name) => name.rsplit('.').next().unwrap_or(name),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeSig::Boolean | TypeSig::Int | TypeSig::Long | TypeSig::Float | TypeSig::Double
        )
    }

    /// Convert `value` for a slot of this type, or `None` if it does not fit.
    ///
    /// Primitives unbox and widen (int → long → float → double); the only
    /// narrowing is double → float. Reference types also accept null.
    pub fn accept(&self, value: ManagedValue) -> Option<ManagedValue> {
        use ManagedValue as V;
        match (self, value) {
            (TypeSig::Object, v) => Some(v),
            (TypeSig::Void, _) => None,
            (TypeSig::Boolean, V::Boolean(b)) => Some(V::Boolean(b)),
            (TypeSig::Int, V::Integer(i)) => Some(V::Integer(i)),
            (TypeSig::Long, V::Integer(i)) => Some(V::Long(i64::from(i))),
            (TypeSig::Long, V::Long(l)) => Some(V::Long(l)),
            (TypeSig::Float, V::Integer(i)) => Some(V::Float(i as f32)),
            (TypeSig::Float, V::Long(l)) => Some(V::Float(l as f32)),
            (TypeSig::Float, V::Float(f)) => Some(V::Float(f)),
            (TypeSig::Float, V::Double(d)) => Some(V::Float(d as f32)),
            (TypeSig::Double, V::Integer(i)) => Some(V::Double(f64::from(i))),
            (TypeSig::Double, V::Long(l)) => Some(V::Double(l as f64)),
            (TypeSig::Double, V::Float(f)) => Some(V::Double(f64::from(f))),
            (TypeSig::Double, V::Double(d)) => Some(V::Double(d)),
            (sig, V::Null) if !sig.is_primitive() => Some(V::Null),
            (TypeSig::Str, V::Str(s)) => Some(V::Str(s)),
            (TypeSig::List, V::List(items)) => Some(V::List(items)),
            (TypeSig::Map, V::Map(map)) => Some(V::Map(map)),
            (TypeSig::Class(name), V::Object(obj)) if obj.class().name() == name.as_str() => {
                Some(V::Object(obj))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simple_name())
    }
}
