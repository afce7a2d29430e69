use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::RuntimeError;
use crate::runtime_context::{ManagedRuntime, RuntimeOptions};

static LAUNCHED: AtomicBool = AtomicBool::new(false);

/// Launch the process-wide managed runtime.
///
/// Only one runtime may be launched per process. Any later call fails with
/// [`RuntimeError::AlreadyRunning`], whoever made the first one; launching is
/// never retried, even if the first attempt failed during option validation.
pub fn launch(options: RuntimeOptions) -> Result<Arc<ManagedRuntime>, RuntimeError> {
    if LAUNCHED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        tracing::error!("Refusing to launch a second managed runtime in this process");
        return Err(RuntimeError::AlreadyRunning);
    }

    let runtime = ManagedRuntime::new(options)?;
    tracing::info!(
        assertions = runtime.assertions_enabled(),
        encoding = runtime.property("file.encoding").unwrap_or("UTF-8"),
        "Managed runtime launched"
    );
    Ok(Arc::new(runtime))
}

/// True once [`launch`] has been called in this process.
pub fn is_launched() -> bool {
    LAUNCHED.load(Ordering::Acquire)
}
