use std::sync::Arc;

use indexmap::IndexMap;
use kwbridge_runtime::{ClassDef, ManagedRuntime, ManagedValue, ObjectRef, RuntimeError};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::BridgeError;
use crate::support::helper::{
    GET_DOC_FORMAT, GET_KEYWORD_ARGUMENTS, GET_KEYWORD_DOCUMENTATION, GET_KEYWORD_NAMES,
    GET_KEYWORD_TAGS, GET_KEYWORD_TYPES, GET_LIBRARY_SCOPE, GET_LIBRARY_VERSION, GET_NAME,
    RUN_KEYWORD,
};
use crate::support::{HELPER_CLASS, LIBRARY_ANNOTATION};

/// Name that asks for the library's own documentation.
pub const INTRO: &str = "__intro__";

/// One argument of a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
}

/// Everything the host needs to list a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub args: Vec<ArgumentDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Asks the support helper about a library object.
///
/// Nothing is cached but the helper class itself: every query goes back to
/// the object. Helper failures are returned as they are.
pub struct CapabilityIntrospector {
    runtime: Arc<ManagedRuntime>,
    class: Arc<ClassDef>,
    instance: ObjectRef,
    helper: OnceCell<Arc<ClassDef>>,
}

impl CapabilityIntrospector {
    pub fn new(runtime: Arc<ManagedRuntime>, instance: ObjectRef) -> Self {
        Self {
            runtime,
            class: instance.class().clone(),
            instance,
            helper: OnceCell::new(),
        }
    }

    fn helper(&self) -> Result<&Arc<ClassDef>, RuntimeError> {
        self.helper
            .get_or_try_init(|| self.runtime.find_class(HELPER_CLASS))
    }

    fn call(&self, method: &str, name: Option<&str>) -> Result<ManagedValue, BridgeError> {
        let mut args = vec![ManagedValue::Object(self.instance.clone())];
        if let Some(name) = name {
            args.push(ManagedValue::Str(name.to_string()));
        }
        tracing::debug!(operation = method, keyword = name, "Querying library helper");
        Ok(self.runtime.invoke_static(self.helper()?, method, args)?)
    }

    pub(crate) fn run_keyword(
        &self,
        name: &str,
        args: Vec<ManagedValue>,
        kwargs: IndexMap<String, ManagedValue>,
    ) -> Result<ManagedValue, RuntimeError> {
        self.runtime.invoke_static(
            self.helper()?,
            RUN_KEYWORD,
            vec![
                ManagedValue::Object(self.instance.clone()),
                ManagedValue::Str(name.to_string()),
                ManagedValue::List(args),
                ManagedValue::Map(kwargs),
            ],
        )
    }

    pub fn list_operation_names(&self) -> Result<Vec<String>, BridgeError> {
        strings(GET_KEYWORD_NAMES, self.call(GET_KEYWORD_NAMES, None)?)
    }

    pub fn list_argument_specs(&self, name: &str) -> Result<Vec<String>, BridgeError> {
        strings(GET_KEYWORD_ARGUMENTS, self.call(GET_KEYWORD_ARGUMENTS, Some(name))?)
    }

    pub fn list_argument_types(&self, name: &str) -> Result<Vec<String>, BridgeError> {
        strings(GET_KEYWORD_TYPES, self.call(GET_KEYWORD_TYPES, Some(name))?)
    }

    /// Keyword documentation. [`INTRO`] returns the library class's own
    /// documentation, falling back to the library annotation's.
    pub fn get_documentation(&self, name: &str) -> Result<Option<String>, BridgeError> {
        if name == INTRO {
            return Ok(self.intro());
        }
        optional_string(
            GET_KEYWORD_DOCUMENTATION,
            self.call(GET_KEYWORD_DOCUMENTATION, Some(name))?,
        )
    }

    fn intro(&self) -> Option<String> {
        if let Some(doc) = self.class.documentation() {
            return Some(doc.to_string());
        }
        self.class
            .annotation(LIBRARY_ANNOTATION)
            .and_then(|a| a.get("documentation"))
            .and_then(ManagedValue::as_str)
            .filter(|doc| !doc.is_empty())
            .map(str::to_string)
    }

    pub fn list_tags(&self, name: &str) -> Result<Vec<String>, BridgeError> {
        match self.call(GET_KEYWORD_TAGS, Some(name))? {
            ManagedValue::Null => Ok(Vec::new()),
            value => strings(GET_KEYWORD_TAGS, value),
        }
    }

    pub fn library_name(&self) -> Result<String, BridgeError> {
        required_string(GET_NAME, self.call(GET_NAME, None)?)
    }

    pub fn library_scope(&self) -> Result<String, BridgeError> {
        required_string(GET_LIBRARY_SCOPE, self.call(GET_LIBRARY_SCOPE, None)?)
    }

    pub fn library_version(&self) -> Result<Option<String>, BridgeError> {
        optional_string(GET_LIBRARY_VERSION, self.call(GET_LIBRARY_VERSION, None)?)
    }

    pub fn doc_format(&self) -> Result<String, BridgeError> {
        required_string(GET_DOC_FORMAT, self.call(GET_DOC_FORMAT, None)?)
    }

    /// Descriptors for every keyword, in keyword order.
    pub fn catalog(&self) -> Result<Vec<CapabilityDescriptor>, BridgeError> {
        self.list_operation_names()?
            .into_iter()
            .map(|name| {
                let specs = self.list_argument_specs(&name)?;
                let mut types = self.list_argument_types(&name)?.into_iter();
                let args = specs
                    .into_iter()
                    .map(|arg| ArgumentDescriptor {
                        name: arg,
                        type_hint: types.next(),
                    })
                    .collect();
                Ok(CapabilityDescriptor {
                    doc: self.get_documentation(&name)?,
                    tags: self.list_tags(&name)?,
                    args,
                    name,
                })
            })
            .collect()
    }
}

fn unexpected(context: &str, found: &ManagedValue) -> BridgeError {
    BridgeError::UnexpectedValue {
        context: context.to_string(),
        found: found.type_name().to_string(),
    }
}

fn strings(context: &str, value: ManagedValue) -> Result<Vec<String>, BridgeError> {
    let items = match value {
        ManagedValue::List(items) => items,
        other => return Err(unexpected(context, &other)),
    };
    items
        .into_iter()
        .map(|item| match item {
            ManagedValue::Str(s) => Ok(s),
            other => Err(unexpected(context, &other)),
        })
        .collect()
}

fn optional_string(context: &str, value: ManagedValue) -> Result<Option<String>, BridgeError> {
    match value {
        ManagedValue::Null => Ok(None),
        ManagedValue::Str(s) => Ok(Some(s)),
        other => Err(unexpected(context, &other)),
    }
}

fn required_string(context: &str, value: ManagedValue) -> Result<String, BridgeError> {
    match value {
        ManagedValue::Str(s) => Ok(s),
        other => Err(unexpected(context, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_serialize_compactly() {
        let descriptor = CapabilityDescriptor {
            name: "add".into(),
            args: vec![
                ArgumentDescriptor {
                    name: "a".into(),
                    type_hint: Some("int".into()),
                },
                ArgumentDescriptor {
                    name: "*args".into(),
                    type_hint: None,
                },
            ],
            doc: None,
            tags: vec![],
        };
        assert_eq!(
            serde_json::to_string(&descriptor).unwrap(),
            r#"{"name":"add","args":[{"name":"a","type":"int"},{"name":"*args"}]}"#
        );
    }

    #[test]
    fn helper_results_must_be_text() {
        assert_eq!(
            strings("x", ManagedValue::List(vec!["a".into(), "b".into()])).unwrap(),
            vec!["a", "b"]
        );
        assert!(strings("x", ManagedValue::List(vec![ManagedValue::Integer(1)])).is_err());
        assert!(strings("x", ManagedValue::Null).is_err());
        assert_eq!(optional_string("x", ManagedValue::Null).unwrap(), None);
    }
}
