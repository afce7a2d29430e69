use thiserror::Error;

use crate::throwable::Throwable;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("a managed runtime is already running in this process")]
    AlreadyRunning,

    #[error("invalid runtime option: {0}")]
    InvalidOption(String),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("no method {method} on {class}")]
    MethodNotFound { class: String, method: String },

    #[error("class {0} has no constructor")]
    NotInstantiable(String),

    #[error("unexpected value from {context}: {found}")]
    UnexpectedValue { context: String, found: String },

    #[error("{0}")]
    Thrown(Box<Throwable>),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// The managed throwable carried by this error, if it is one.
    pub fn as_thrown(&self) -> Option<&Throwable> {
        match self {
            RuntimeError::Thrown(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Throwable> for RuntimeError {
    fn from(t: Throwable) -> Self {
        RuntimeError::Thrown(Box::new(t))
    }
}
