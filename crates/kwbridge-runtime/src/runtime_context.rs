use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::class::{ClassDef, ObjectRef};
use crate::classpath::{ClassPath, ClassPathEntry, ClassProvider};
use crate::console::Console;
use crate::error::RuntimeError;
use crate::value::ManagedValue;

/// Parsed startup options.
///
/// Accepted tokens: `-ea` / `-enableassertions`, `-Dkey=value` (or `-Dkey`,
/// meaning an empty value), and any other flag starting with `-`, which is
/// kept verbatim. Anything else is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    assertions: bool,
    properties: IndexMap<String, String>,
    flags: Vec<String>,
}

impl RuntimeOptions {
    pub fn parse<I, S>(tokens: I) -> Result<Self, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        for token in tokens {
            let token = token.as_ref();
            match token {
                "-ea" | "-enableassertions" => options.assertions = true,
                "-da" | "-disableassertions" => options.assertions = false,
                _ if token.starts_with("-D") => {
                    let prop = &token[2..];
                    if prop.is_empty() {
                        return Err(RuntimeError::InvalidOption(token.to_string()));
                    }
                    let (key, value) = prop.split_once('=').unwrap_or((prop, ""));
                    options.properties.insert(key.to_string(), value.to_string());
                }
                _ if token.starts_with('-') && token.len() > 1 => {
                    options.flags.push(token.to_string())
                }
                _ => return Err(RuntimeError::InvalidOption(token.to_string())),
            }
        }
        Ok(options)
    }

    pub fn assertions_enabled(&self) -> bool {
        self.assertions
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Flags kept verbatim (`-Xmx1g`, `-verbose`, ...).
    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}

/// A running managed runtime instance.
///
/// Owns the class search path, directly defined classes and the console.
/// `ManagedRuntime` is `Send + Sync`; share it through `Arc`.
pub struct ManagedRuntime {
    options: RuntimeOptions,
    class_path: RwLock<ClassPath>,
    defined: RwLock<HashMap<String, Arc<ClassDef>>>,
    console: Console,
}

impl ManagedRuntime {
    pub fn new(options: RuntimeOptions) -> Result<Self, RuntimeError> {
        if let Some(encoding) = options.property("file.encoding") {
            let normalized = encoding.to_ascii_uppercase().replace('_', "-");
            if normalized != "UTF-8" && normalized != "UTF8" {
                return Err(RuntimeError::UnsupportedEncoding(encoding.to_string()));
            }
        }

        tracing::debug!(
            assertions = options.assertions,
            properties = options.properties.len(),
            flags = ?options.flags,
            "Managed runtime initialized"
        );

        Ok(Self {
            options,
            class_path: RwLock::new(ClassPath::new()),
            defined: RwLock::new(HashMap::new()),
            console: Console::native(),
        })
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn assertions_enabled(&self) -> bool {
        self.options.assertions
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.options.property(key)
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Current search path, in order.
    pub fn class_path(&self) -> Vec<PathBuf> {
        self.class_path.read().paths()
    }

    /// Append an entry to the search path. Returns false for duplicates.
    pub fn add_class_path(&self, entry: impl Into<ClassPathEntry>) -> bool {
        self.class_path.write().add(entry.into())
    }

    /// Append `path` with `provider` mounted on it.
    pub fn mount(&self, path: impl Into<PathBuf>, provider: Arc<dyn ClassProvider>) -> bool {
        self.add_class_path(ClassPathEntry::library(path, provider))
    }

    /// Define a class directly; it shadows anything on the search path.
    pub fn define_class(&self, class: Arc<ClassDef>) -> Arc<ClassDef> {
        tracing::debug!(class = class.name(), "Class defined");
        self.defined
            .write()
            .insert(class.name().to_string(), class.clone());
        class
    }

    pub fn find_class(&self, name: &str) -> Result<Arc<ClassDef>, RuntimeError> {
        if let Some(class) = self.defined.read().get(name) {
            return Ok(class.clone());
        }
        self.class_path
            .read()
            .find_class(name)?
            .ok_or_else(|| RuntimeError::ClassNotFound(name.to_string()))
    }

    /// Instantiate `class`. A throwable from the constructor escapes as
    /// [`RuntimeError::Thrown`].
    pub fn new_instance(
        &self,
        class: &Arc<ClassDef>,
        args: Vec<ManagedValue>,
        kwargs: IndexMap<String, ManagedValue>,
    ) -> Result<ObjectRef, RuntimeError> {
        let obj = class
            .construct(self, &args, &kwargs)
            .ok_or_else(|| RuntimeError::NotInstantiable(class.name().to_string()))??;
        tracing::debug!(object = ?obj, "Instance created");
        Ok(obj)
    }

    /// Call a static method from the host side.
    ///
    /// Unlike reflective invocation, a throwable raised by the method is not
    /// wrapped; it escapes as [`RuntimeError::Thrown`].
    pub fn call_static(
        &self,
        class_name: &str,
        method: &str,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue, RuntimeError> {
        let class = self.find_class(class_name)?;
        self.invoke_static(&class, method, args)
    }

    /// [`call_static`](Self::call_static) on an already resolved class.
    pub fn invoke_static(
        &self,
        class: &ClassDef,
        method: &str,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue, RuntimeError> {
        let def = class
            .declared_methods()
            .iter()
            .find(|m| m.is_static() && m.name() == method && m.params().len() == args.len())
            .ok_or_else(|| RuntimeError::MethodNotFound {
                class: class.name().to_string(),
                method: method.to_string(),
            })?;
        Ok(def.call(self, None, args)?)
    }
}
