//! Domain exception classes raised by keyword libraries.
//!
//! Every class extends [`KEYWORD_EXCEPTION`], which itself extends
//! `rt.lang.RuntimeException`. Libraries throw them with the constructor
//! helpers below:
//!
//! ```rust
//! use kwbridge::support::exceptions;
//!
//! let err = exceptions::fatal_error("<b>disk gone</b>").with_html(true);
//! assert_eq!(err.class_name(), exceptions::FATAL_ERROR);
//! assert!(err.is_html());
//! ```

use std::sync::Arc;

use kwbridge_runtime::throwable::classes;
use kwbridge_runtime::{Throwable, ThrowableClass};
use once_cell::sync::Lazy;

pub const KEYWORD_EXCEPTION: &str = "kwbridge.exceptions.KeywordException";
pub const CONTINUABLE_FAILURE: &str = "kwbridge.exceptions.ContinuableFailure";
pub const ERROR: &str = "kwbridge.exceptions.Error";
pub const FAILURE: &str = "kwbridge.exceptions.Failure";
pub const FATAL_ERROR: &str = "kwbridge.exceptions.FatalError";
pub const SKIP_EXECUTION: &str = "kwbridge.exceptions.SkipExecution";

static KEYWORD_EXCEPTION_CLASS: Lazy<Arc<ThrowableClass>> = Lazy::new(|| {
    ThrowableClass::extending(KEYWORD_EXCEPTION, &classes::runtime_exception())
});

fn subclass(name: &str) -> Arc<ThrowableClass> {
    ThrowableClass::extending(name, &KEYWORD_EXCEPTION_CLASS)
}

static CONTINUABLE_FAILURE_CLASS: Lazy<Arc<ThrowableClass>> =
    Lazy::new(|| subclass(CONTINUABLE_FAILURE));
static ERROR_CLASS: Lazy<Arc<ThrowableClass>> = Lazy::new(|| subclass(ERROR));
static FAILURE_CLASS: Lazy<Arc<ThrowableClass>> = Lazy::new(|| subclass(FAILURE));
static FATAL_ERROR_CLASS: Lazy<Arc<ThrowableClass>> = Lazy::new(|| subclass(FATAL_ERROR));
static SKIP_EXECUTION_CLASS: Lazy<Arc<ThrowableClass>> =
    Lazy::new(|| subclass(SKIP_EXECUTION));

pub fn keyword_exception_class() -> Arc<ThrowableClass> {
    KEYWORD_EXCEPTION_CLASS.clone()
}

/// True if `t` belongs to the domain exception hierarchy.
pub fn is_domain(t: &Throwable) -> bool {
    t.is_instance_of(KEYWORD_EXCEPTION)
}

/// A bare domain exception, classified as an error unless its cause says
/// otherwise.
pub fn keyword_exception(message: impl Into<String>) -> Throwable {
    Throwable::new(keyword_exception_class(), message)
}

pub fn continuable_failure(message: impl Into<String>) -> Throwable {
    Throwable::new(CONTINUABLE_FAILURE_CLASS.clone(), message)
}

pub fn error(message: impl Into<String>) -> Throwable {
    Throwable::new(ERROR_CLASS.clone(), message)
}

pub fn failure(message: impl Into<String>) -> Throwable {
    Throwable::new(FAILURE_CLASS.clone(), message)
}

pub fn fatal_error(message: impl Into<String>) -> Throwable {
    Throwable::new(FATAL_ERROR_CLASS.clone(), message)
}

pub fn skip_execution(message: impl Into<String>) -> Throwable {
    Throwable::new(SKIP_EXECUTION_CLASS.clone(), message)
}
