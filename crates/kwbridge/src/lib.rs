//! Keyword library bridge.
//!
//! Exposes an object living inside the embedded managed runtime
//! ([`kwbridge_runtime`]) to a host that discovers and invokes its keywords
//! dynamically. [`LibraryBridge`] is the entry point: building one starts the
//! runtime once per process ([`RuntimeState`]), redirects the runtime's
//! console into host streams, loads the library class and instantiates it.
//! Keywords are then listed through the support helper and dispatched with
//! host values, which [`marshal`] converts in both directions. Domain
//! failures thrown by a keyword come back as [`TranslatedError`]s carrying one
//! of five [`FailureKind`]s.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kwbridge::{BridgeConfig, HostValue, IsolatedLauncher, LibraryBridge, RuntimeState};
//! use kwbridge_runtime::{ClassDef, ClassLibrary, ManagedValue, MethodDef, TypeSig};
//!
//! # fn run() -> Result<(), kwbridge::BridgeError> {
//! let calculator = ClassDef::builder("org.example.Calculator")
//!     .doc("Adds numbers")
//!     .default_constructor::<()>()
//!     .method(
//!         MethodDef::new("add", |call| Ok(ManagedValue::Integer(call.arg_i32(0)? + call.arg_i32(1)?)))
//!             .param("a", TypeSig::Int)
//!             .param("b", TypeSig::Int)
//!             .returns(TypeSig::Int),
//!     )
//!     .build();
//!
//! let state = Arc::new(RuntimeState::new(
//!     BridgeConfig::with_install_dir("/opt/kwbridge"),
//!     Arc::new(IsolatedLauncher::new()),
//! ));
//! let bridge = LibraryBridge::builder("org.example.Calculator")
//!     .state(state)
//!     .class_path(kwbridge_runtime::ClassPathEntry::library(
//!         "lib/calculator.kar",
//!         Arc::new(ClassLibrary::new("calculator").with_class(calculator)),
//!     ))
//!     .build()?;
//!
//! assert_eq!(bridge.list_operation_names()?, vec!["add"]);
//! let sum = bridge.dispatch("add", &[HostValue::Int(2), HostValue::Int(3)], &Default::default())?;
//! assert_eq!(sum, HostValue::Int(5));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod introspect;
pub mod lifecycle;
pub mod marshal;
pub mod resolver;
pub mod streams;
pub mod support;
pub mod translate;
pub mod value;

pub use config::BridgeConfig;
pub use error::{BridgeError, ConfigError, InvocationError, StartupError};
pub use facade::{FacadeState, LibraryBridge, LibraryBridgeBuilder};
pub use introspect::{ArgumentDescriptor, CapabilityDescriptor, CapabilityIntrospector, INTRO};
pub use lifecycle::{IsolatedLauncher, ProcessLauncher, RuntimeLauncher, RuntimeState, SupportLocator};
pub use marshal::{to_host, to_managed};
pub use resolver::{ClassResolver, RuntimeClassResolver};
pub use streams::{BufferStream, CaptureWarning, HostStream, HostStreams, StreamBridge};
pub use support::SupportLibrary;
pub use translate::{Classification, FailureKind, TranslatedError, classify};
pub use value::HostValue;
