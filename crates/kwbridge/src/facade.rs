use std::sync::Arc;

use indexmap::IndexMap;
use kwbridge_runtime::{ClassDef, ClassPathEntry, ManagedRuntime, ObjectRef, RuntimeError};

use crate::error::BridgeError;
use crate::introspect::{CapabilityDescriptor, CapabilityIntrospector};
use crate::lifecycle::RuntimeState;
use crate::marshal;
use crate::resolver::{ClassResolver, RuntimeClassResolver};
use crate::translate::{Classification, classify};
use crate::value::HostValue;

/// Construction progress of a [`LibraryBridge`]. A built bridge is `Ready`
/// and stays that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacadeState {
    Uninitialized,
    RuntimeReady,
    ObjectConstructed,
    Ready,
}

/// A managed library object exposed to the host as a keyword library.
///
/// Owns one instance of the library class for its whole lifetime. There is
/// no close: the instance lives as long as the bridge, the runtime as long as
/// the process.
pub struct LibraryBridge {
    runtime_state: Arc<RuntimeState>,
    runtime: Arc<ManagedRuntime>,
    introspector: CapabilityIntrospector,
    instance: ObjectRef,
    state: FacadeState,
}

impl LibraryBridge {
    /// Build a bridge on the process-wide runtime.
    pub fn new(
        class: &str,
        class_path: Vec<ClassPathEntry>,
        args: Vec<HostValue>,
        kwargs: IndexMap<String, HostValue>,
    ) -> Result<Self, BridgeError> {
        let mut builder = Self::builder(class);
        builder.class_path = class_path;
        builder.args = args;
        builder.kwargs = kwargs;
        builder.build()
    }

    pub fn builder(class: impl Into<String>) -> LibraryBridgeBuilder {
        LibraryBridgeBuilder {
            class: class.into(),
            runtime_state: None,
            class_path: Vec::new(),
            args: Vec::new(),
            kwargs: IndexMap::new(),
            resolver: None,
        }
    }

    pub fn state(&self) -> FacadeState {
        self.state
    }

    pub fn runtime_state(&self) -> &Arc<RuntimeState> {
        &self.runtime_state
    }

    pub fn runtime(&self) -> &Arc<ManagedRuntime> {
        &self.runtime
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        self.instance.class()
    }

    /// Handle to the library object.
    pub fn instance(&self) -> &ObjectRef {
        &self.instance
    }

    pub fn list_operation_names(&self) -> Result<Vec<String>, BridgeError> {
        self.introspector.list_operation_names()
    }

    pub fn list_argument_specs(&self, name: &str) -> Result<Vec<String>, BridgeError> {
        self.introspector.list_argument_specs(name)
    }

    pub fn list_argument_types(&self, name: &str) -> Result<Vec<String>, BridgeError> {
        self.introspector.list_argument_types(name)
    }

    pub fn get_documentation(&self, name: &str) -> Result<Option<String>, BridgeError> {
        self.introspector.get_documentation(name)
    }

    pub fn list_tags(&self, name: &str) -> Result<Vec<String>, BridgeError> {
        self.introspector.list_tags(name)
    }

    pub fn library_name(&self) -> Result<String, BridgeError> {
        self.introspector.library_name()
    }

    pub fn library_scope(&self) -> Result<String, BridgeError> {
        self.introspector.library_scope()
    }

    pub fn library_version(&self) -> Result<Option<String>, BridgeError> {
        self.introspector.library_version()
    }

    pub fn doc_format(&self) -> Result<String, BridgeError> {
        self.introspector.doc_format()
    }

    pub fn catalog(&self) -> Result<Vec<CapabilityDescriptor>, BridgeError> {
        self.introspector.catalog()
    }

    /// Run keyword `name` and convert its result back to a host value.
    ///
    /// Domain failures come back as [`BridgeError::Translated`], other
    /// failures inside the keyword as [`BridgeError::Invocation`]. Anything
    /// else thrown (unknown keyword, bad arguments) is passed through as
    /// [`BridgeError::Thrown`].
    pub fn dispatch(
        &self,
        name: &str,
        args: &[HostValue],
        kwargs: &IndexMap<String, HostValue>,
    ) -> Result<HostValue, BridgeError> {
        tracing::debug!(keyword = name, args = args.len(), kwargs = kwargs.len(), "Dispatching keyword");
        let result = self.introspector.run_keyword(
            name,
            marshal::args_to_managed(args),
            marshal::kwargs_to_managed(kwargs),
        );
        match result {
            Ok(value) => Ok(marshal::to_host(&value)),
            Err(err) => Err(surface(err)),
        }
    }
}

/// Map a runtime failure to what the host sees.
fn surface(err: RuntimeError) -> BridgeError {
    match err {
        RuntimeError::Thrown(thrown) => match classify(*thrown) {
            Classification::Translated(e) => e.into(),
            Classification::Invocation(e) => e.into(),
            Classification::Unclassified(t) => t.into(),
        },
        other => other.into(),
    }
}

pub struct LibraryBridgeBuilder {
    class: String,
    runtime_state: Option<Arc<RuntimeState>>,
    class_path: Vec<ClassPathEntry>,
    args: Vec<HostValue>,
    kwargs: IndexMap<String, HostValue>,
    resolver: Option<Arc<dyn ClassResolver>>,
}

impl LibraryBridgeBuilder {
    /// Use `state` instead of [`RuntimeState::global`].
    pub fn state(mut self, state: Arc<RuntimeState>) -> Self {
        self.runtime_state = Some(state);
        self
    }

    /// Add a search path entry before the class is resolved.
    pub fn class_path(mut self, entry: impl Into<ClassPathEntry>) -> Self {
        self.class_path.push(entry.into());
        self
    }

    /// Positional constructor argument.
    pub fn arg(mut self, value: impl Into<HostValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Keyword constructor argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ClassResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<LibraryBridge, BridgeError> {
        let runtime_state = self.runtime_state.unwrap_or_else(RuntimeState::global);
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(RuntimeClassResolver) as Arc<dyn ClassResolver>);
        let mut state = FacadeState::Uninitialized;

        let runtime = runtime_state.ensure_started()?;
        state = advance(state, FacadeState::RuntimeReady);

        for entry in self.class_path {
            runtime.add_class_path(entry);
        }
        let class = resolver.resolve(&runtime, &self.class)?;
        let instance = runtime
            .new_instance(
                &class,
                marshal::args_to_managed(&self.args),
                marshal::kwargs_to_managed(&self.kwargs),
            )
            .map_err(surface)?;
        state = advance(state, FacadeState::ObjectConstructed);

        let introspector = CapabilityIntrospector::new(runtime.clone(), instance.clone());
        state = advance(state, FacadeState::Ready);
        tracing::info!(class = class.name(), object = ?instance, "Library bridge ready");

        Ok(LibraryBridge {
            runtime_state,
            runtime,
            introspector,
            instance,
            state,
        })
    }
}

fn advance(from: FacadeState, to: FacadeState) -> FacadeState {
    tracing::debug!(from = ?from, to = ?to, "Library bridge state");
    to
}
