use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// A throwable class together with its full superclass chain.
///
/// The chain is stored self-first, so `chain[0]` is the class name and the
/// last element is the hierarchy root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrowableClass {
    chain: Vec<String>,
}

impl ThrowableClass {
    /// A hierarchy root with no superclass.
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            chain: vec![name.into()],
        })
    }

    /// A class extending `parent`.
    pub fn extending(name: impl Into<String>, parent: &ThrowableClass) -> Arc<Self> {
        let mut chain = Vec::with_capacity(parent.chain.len() + 1);
        chain.push(name.into());
        chain.extend(parent.chain.iter().cloned());
        Arc::new(Self { chain })
    }

    pub fn name(&self) -> &str {
        &self.chain[0]
    }

    /// Simple (unqualified) class name.
    pub fn simple_name(&self) -> &str {
        let name = self.name();
        name.rsplit('.').next().unwrap_or(name)
    }

    pub fn superclass(&self) -> Option<&str> {
        self.chain.get(1).map(String::as_str)
    }

    /// True if this class is `name` or extends it.
    pub fn is_subclass_of(&self, name: &str) -> bool {
        self.chain.iter().any(|c| c == name)
    }
}

pub mod classes {
    //! Standard throwable classes every runtime knows about.

    use super::*;

    pub const THROWABLE: &str = "rt.lang.Throwable";
    pub const EXCEPTION: &str = "rt.lang.Exception";
    pub const RUNTIME_EXCEPTION: &str = "rt.lang.RuntimeException";
    pub const ILLEGAL_ARGUMENT: &str = "rt.lang.IllegalArgumentException";
    pub const INDEX_OUT_OF_BOUNDS: &str = "rt.lang.IndexOutOfBoundsException";
    pub const NULL_POINTER: &str = "rt.lang.NullPointerException";
    pub const CLASS_NOT_FOUND: &str = "rt.lang.ClassNotFoundException";
    pub const NO_SUCH_METHOD: &str = "rt.lang.NoSuchMethodException";
    pub const INVOCATION_TARGET: &str = "rt.lang.reflect.InvocationTargetException";

    static THROWABLE_CLASS: Lazy<Arc<ThrowableClass>> = Lazy::new(|| ThrowableClass::root(THROWABLE));
    static EXCEPTION_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(EXCEPTION, &THROWABLE_CLASS));
    static RUNTIME_EXCEPTION_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(RUNTIME_EXCEPTION, &EXCEPTION_CLASS));
    static ILLEGAL_ARGUMENT_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(ILLEGAL_ARGUMENT, &RUNTIME_EXCEPTION_CLASS));
    static INDEX_OUT_OF_BOUNDS_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(INDEX_OUT_OF_BOUNDS, &RUNTIME_EXCEPTION_CLASS));
    static NULL_POINTER_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(NULL_POINTER, &RUNTIME_EXCEPTION_CLASS));
    static CLASS_NOT_FOUND_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(CLASS_NOT_FOUND, &EXCEPTION_CLASS));
    static NO_SUCH_METHOD_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(NO_SUCH_METHOD, &EXCEPTION_CLASS));
    static INVOCATION_TARGET_CLASS: Lazy<Arc<ThrowableClass>> =
        Lazy::new(|| ThrowableClass::extending(INVOCATION_TARGET, &EXCEPTION_CLASS));

    pub fn throwable() -> Arc<ThrowableClass> {
        THROWABLE_CLASS.clone()
    }

    pub fn exception() -> Arc<ThrowableClass> {
        EXCEPTION_CLASS.clone()
    }

    pub fn runtime_exception() -> Arc<ThrowableClass> {
        RUNTIME_EXCEPTION_CLASS.clone()
    }

    pub fn illegal_argument() -> Arc<ThrowableClass> {
        ILLEGAL_ARGUMENT_CLASS.clone()
    }

    pub fn index_out_of_bounds() -> Arc<ThrowableClass> {
        INDEX_OUT_OF_BOUNDS_CLASS.clone()
    }

    pub fn null_pointer() -> Arc<ThrowableClass> {
        NULL_POINTER_CLASS.clone()
    }

    pub fn class_not_found() -> Arc<ThrowableClass> {
        CLASS_NOT_FOUND_CLASS.clone()
    }

    pub fn no_such_method() -> Arc<ThrowableClass> {
        NO_SUCH_METHOD_CLASS.clone()
    }

    pub fn invocation_target() -> Arc<ThrowableClass> {
        INVOCATION_TARGET_CLASS.clone()
    }
}

/// A managed exception object.
///
/// Carries its class, an optional message, an optional cause and the
/// rich-text flag reported by library exceptions (`false` for all others).
#[derive(Debug, Clone)]
pub struct Throwable {
    class: Arc<ThrowableClass>,
    message: Option<String>,
    cause: Option<Box<Throwable>>,
    html: bool,
}

impl Throwable {
    pub fn new(class: Arc<ThrowableClass>, message: impl Into<String>) -> Self {
        Self {
            class,
            message: Some(message.into()),
            cause: None,
            html: false,
        }
    }

    /// A throwable with no message (`getMessage()` returns nothing).
    pub fn without_message(class: Arc<ThrowableClass>) -> Self {
        Self {
            class,
            message: None,
            cause: None,
            html: false,
        }
    }

    pub fn with_cause(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    /// Wrap `cause` the way reflective invocation does.
    pub fn invocation_target(cause: Throwable) -> Self {
        Self::without_message(classes::invocation_target()).with_cause(cause)
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(classes::illegal_argument(), message)
    }

    pub fn null_pointer(message: impl Into<String>) -> Self {
        Self::new(classes::null_pointer(), message)
    }

    pub fn class(&self) -> &Arc<ThrowableClass> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&Throwable> {
        self.cause.as_deref()
    }

    pub fn is_html(&self) -> bool {
        self.html
    }

    pub fn is_instance_of(&self, class_name: &str) -> bool {
        self.class.is_subclass_of(class_name)
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class.name(), message),
            None => write!(f, "{}", self.class.name()),
        }
    }
}

impl std::error::Error for Throwable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
