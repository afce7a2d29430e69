use std::fmt;

use kwbridge_runtime::Throwable;
use kwbridge_runtime::throwable::classes;
use thiserror::Error;

use crate::error::InvocationError;
use crate::support::exceptions::{
    self, CONTINUABLE_FAILURE, ERROR, FAILURE, FATAL_ERROR, SKIP_EXECUTION,
};

/// Severity of a domain failure, as the host framework understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Error,
    ContinuableFailure,
    Failure,
    FatalError,
    SkipExecution,
}

/// First match wins.
const MATCH_ORDER: [(FailureKind, &str); 5] = [
    (FailureKind::ContinuableFailure, CONTINUABLE_FAILURE),
    (FailureKind::Error, ERROR),
    (FailureKind::Failure, FAILURE),
    (FailureKind::FatalError, FATAL_ERROR),
    (FailureKind::SkipExecution, SKIP_EXECUTION),
];

impl FailureKind {
    /// The kind whose exception class `t` is an instance of, if any.
    pub fn of(t: &Throwable) -> Option<Self> {
        MATCH_ORDER
            .iter()
            .find(|(_, class)| t.is_instance_of(class))
            .map(|(kind, _)| *kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Error => "Error",
            FailureKind::ContinuableFailure => "ContinuableFailure",
            FailureKind::Failure => "Failure",
            FailureKind::FatalError => "FatalError",
            FailureKind::SkipExecution => "SkipExecution",
        }
    }

    /// Later keywords may still run after this failure.
    pub fn allows_continuation(&self) -> bool {
        matches!(self, FailureKind::ContinuableFailure)
    }

    /// The whole run stops.
    pub fn aborts_run(&self) -> bool {
        matches!(self, FailureKind::FatalError)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain failure flattened for the host: kind, message and rich-text flag.
/// The throwable it came from stays reachable through `source()`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TranslatedError {
    pub kind: FailureKind,
    pub message: String,
    pub html: bool,
    #[source]
    original: Box<Throwable>,
}

impl TranslatedError {
    pub fn original(&self) -> &Throwable {
        &self.original
    }
}

#[derive(Debug)]
pub enum Classification {
    Translated(TranslatedError),
    /// The wrapped cause is outside the domain hierarchy.
    Invocation(InvocationError),
    /// Not something the bridge classifies; re-raise as is.
    Unclassified(Throwable),
}

/// Classify a throwable that escaped a keyword call.
///
/// An `InvocationTargetException` with a domain cause is translated from that
/// cause, with any other cause it becomes an [`InvocationError`]. A domain
/// exception thrown without the wrapper is translated directly. Everything
/// else, including a wrapper with no cause, is left unclassified.
pub fn classify(thrown: Throwable) -> Classification {
    if thrown.is_instance_of(classes::INVOCATION_TARGET) {
        match thrown.cause() {
            None => return Classification::Unclassified(thrown),
            Some(cause) if !exceptions::is_domain(cause) => {
                tracing::debug!(
                    cause = cause.class_name(),
                    "Keyword failed outside the domain hierarchy"
                );
                return Classification::Invocation(InvocationError::from_cause(cause));
            }
            Some(_) => {}
        }
        return Classification::Translated(translate(thrown, true));
    }

    if exceptions::is_domain(&thrown) {
        return Classification::Translated(translate(thrown, false));
    }

    Classification::Unclassified(thrown)
}

/// Build the host error from the domain exception: the cause of `original`
/// when `wrapped`, `original` itself otherwise.
///
/// A nested cause of one of the five kinds decides kind, message and flag;
/// otherwise the domain exception's own class decides, defaulting to
/// [`FailureKind::Error`] with its message and flag.
fn translate(original: Throwable, wrapped: bool) -> TranslatedError {
    let (kind, message, html) = {
        let domain = match original.cause() {
            Some(cause) if wrapped => cause,
            _ => &original,
        };
        let nested = domain
            .cause()
            .and_then(|nested| FailureKind::of(nested).map(|kind| (kind, nested)));
        let (kind, decider) = match nested {
            Some((kind, nested)) => (kind, nested),
            None => (FailureKind::of(domain).unwrap_or(FailureKind::Error), domain),
        };
        (
            kind,
            decider.message().unwrap_or_default().to_string(),
            decider.is_html(),
        )
    };

    tracing::debug!(kind = %kind, html, "Domain failure translated");
    TranslatedError {
        kind,
        message,
        html,
        original: Box::new(original),
    }
}
