use kwbridge_runtime::{RuntimeError, Throwable};
use thiserror::Error;

use crate::translate::TranslatedError;

/// Anything a bridge call can fail with.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// A domain failure raised by the keyword.
    #[error(transparent)]
    Translated(#[from] TranslatedError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// A managed throwable the bridge does not classify, passed through as is.
    #[error("{0}")]
    Thrown(Box<Throwable>),

    #[error("unexpected value from {context}: {found}")]
    UnexpectedValue { context: String, found: String },

    #[error(transparent)]
    Runtime(RuntimeError),
}

impl BridgeError {
    pub fn as_translated(&self) -> Option<&TranslatedError> {
        match self {
            BridgeError::Translated(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_invocation(&self) -> Option<&InvocationError> {
        match self {
            BridgeError::Invocation(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_thrown(&self) -> Option<&Throwable> {
        match self {
            BridgeError::Thrown(t) => Some(t),
            _ => None,
        }
    }
}

impl From<RuntimeError> for BridgeError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Thrown(t) => BridgeError::Thrown(t),
            other => BridgeError::Runtime(other),
        }
    }
}

impl From<Throwable> for BridgeError {
    fn from(t: Throwable) -> Self {
        BridgeError::Thrown(Box::new(t))
    }
}

/// The embedded runtime could not be brought up. Never retried.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to start managed runtime: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("managed runtime failed to start earlier in this process: {0}")]
    PreviouslyFailed(String),
}

/// A keyword failed with a throwable outside the domain exception hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.class_name, .message.as_deref()))]
pub struct InvocationError {
    pub class_name: String,
    pub message: Option<String>,
}

fn render(class_name: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{class_name}: {message}"),
        None => class_name.to_string(),
    }
}

impl InvocationError {
    pub fn from_cause(cause: &Throwable) -> Self {
        Self {
            class_name: cause.class_name().to_string(),
            message: cause.message().map(str::to_string),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwbridge_runtime::throwable::classes;

    #[test]
    fn invocation_error_shows_class_and_message() {
        let cause = Throwable::new(classes::index_out_of_bounds(), "nö geht nicht");
        let err = InvocationError::from_cause(&cause);
        assert_eq!(
            err.to_string(),
            "rt.lang.IndexOutOfBoundsException: nö geht nicht"
        );

        let bare = InvocationError::from_cause(&Throwable::without_message(classes::null_pointer()));
        assert_eq!(bare.to_string(), "rt.lang.NullPointerException");
    }

    #[test]
    fn thrown_runtime_errors_surface_as_throwables() {
        let err = BridgeError::from(RuntimeError::from(Throwable::illegal_argument("x")));
        assert_eq!(err.as_thrown().map(|t| t.class_name()), Some(classes::ILLEGAL_ARGUMENT));

        let err = BridgeError::from(RuntimeError::ClassNotFound("a.B".into()));
        assert!(matches!(err, BridgeError::Runtime(RuntimeError::ClassNotFound(_))));
    }
}
