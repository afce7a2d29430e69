//! Value conversion between host and managed representations.
//!
//! Both directions are pure and recurse depth-first into containers. Argument
//! graphs must be acyclic; nothing here detects cycles. Containers are always
//! copied, handles are passed by reference.

use indexmap::IndexMap;
use kwbridge_runtime::ManagedValue;

use crate::value::HostValue;

/// Convert a host value to its managed form.
///
/// Integers become `Integer` when they fit in 32 bits and `Long` otherwise.
/// Floats become `Float` when exactly representable in 32 bits and `Double`
/// otherwise, so no value loses precision on the way in. Sets become lists.
pub fn to_managed(value: &HostValue) -> ManagedValue {
    match value {
        HostValue::Null => ManagedValue::Null,
        // Matched before any numeric arm; a bool is never an integer here.
        HostValue::Bool(b) => ManagedValue::Boolean(*b),
        HostValue::Int(i) => match i32::try_from(*i) {
            Ok(small) => ManagedValue::Integer(small),
            Err(_) => ManagedValue::Long(*i),
        },
        HostValue::Float(x) => float_to_managed(*x),
        HostValue::Text(s) => ManagedValue::Str(s.clone()),
        HostValue::List(items) | HostValue::Set(items) => {
            ManagedValue::List(items.iter().map(to_managed).collect())
        }
        HostValue::Map(entries) => ManagedValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), to_managed(v)))
                .collect(),
        ),
        HostValue::Handle(obj) => ManagedValue::Object(obj.clone()),
    }
}

fn float_to_managed(x: f64) -> ManagedValue {
    let narrow = x as f32;
    if x.is_nan() || f64::from(narrow) == x {
        ManagedValue::Float(narrow)
    } else {
        ManagedValue::Double(x)
    }
}

/// Convert a managed value to its host form.
pub fn to_host(value: &ManagedValue) -> HostValue {
    match value {
        ManagedValue::Null => HostValue::Null,
        ManagedValue::Boolean(b) => HostValue::Bool(*b),
        ManagedValue::Integer(i) => HostValue::Int(i64::from(*i)),
        ManagedValue::Long(i) => HostValue::Int(*i),
        ManagedValue::Float(x) => HostValue::Float(f64::from(*x)),
        ManagedValue::Double(x) => HostValue::Float(*x),
        ManagedValue::Str(s) => HostValue::Text(s.clone()),
        ManagedValue::List(items) => HostValue::List(items.iter().map(to_host).collect()),
        ManagedValue::Map(entries) => HostValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), to_host(v)))
                .collect(),
        ),
        ManagedValue::Object(obj) => HostValue::Handle(obj.clone()),
    }
}

pub fn args_to_managed(args: &[HostValue]) -> Vec<ManagedValue> {
    args.iter().map(to_managed).collect()
}

pub fn kwargs_to_managed(kwargs: &IndexMap<String, HostValue>) -> IndexMap<String, ManagedValue> {
    kwargs
        .iter()
        .map(|(k, v)| (k.clone(), to_managed(v)))
        .collect()
}
