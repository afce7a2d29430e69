use std::sync::Arc;

use kwbridge_runtime::{ClassDef, ManagedRuntime, RuntimeError};

/// Turns a caller-supplied class identifier into a loaded class.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, runtime: &ManagedRuntime, identifier: &str) -> Result<Arc<ClassDef>, RuntimeError>;
}

/// Resolves through the runtime's own class lookup.
///
/// Accepts dotted names as well as `/` and `::` separated ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeClassResolver;

impl RuntimeClassResolver {
    pub fn normalize(identifier: &str) -> String {
        identifier.trim().replace("::", ".").replace('/', ".")
    }
}

impl ClassResolver for RuntimeClassResolver {
    fn resolve(&self, runtime: &ManagedRuntime, identifier: &str) -> Result<Arc<ClassDef>, RuntimeError> {
        let name = Self::normalize(identifier);
        tracing::debug!(identifier, class = %name, "Resolving library class");
        runtime.find_class(&name)
    }
}
