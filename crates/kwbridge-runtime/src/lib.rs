//! Embedded managed object runtime for kwbridge.
//!
//! Provides [`ManagedRuntime`], an in-process object runtime with classes,
//! reflective methods, a throwable hierarchy with cause chains, a class search
//! path and a two-channel console. The `kwbridge` crate drives it; library
//! authors use [`ClassDef`] and [`MethodDef`] to define the classes it hosts.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kwbridge_runtime::{ClassDef, ClassLibrary, ManagedValue, MethodDef, RuntimeOptions, TypeSig};
//!
//! # fn run() -> Result<(), kwbridge_runtime::RuntimeError> {
//! let runtime = kwbridge_runtime::launch(RuntimeOptions::parse(["-ea"])?)?;
//!
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
//! runtime.mount("lib/calculator.kar", Arc::new(ClassLibrary::new("calculator").with_class(calculator)));
//!
//! let class = runtime.find_class("org.example.Calculator")?;
//! let obj = runtime.new_instance(&class, vec![], Default::default())?;
//! let add = class.find_method("add", 2).expect("declared above");
//! let sum = add.invoke(&runtime, Some(&obj), vec![ManagedValue::Integer(2), ManagedValue::Integer(3)])?;
//! assert_eq!(sum, ManagedValue::Integer(5));
//! # Ok(())
//! # }
//! ```

pub mod class;
pub mod classpath;
pub mod console;
pub mod error;
pub mod lifecycle;
pub mod runtime_context;
pub mod throwable;
pub mod value;

pub use class::{Annotation, ClassBuilder, ClassDef, Invocation, MethodDef, ObjectRef, Param};
pub use classpath::{ClassLibrary, ClassPath, ClassPathEntry, ClassProvider};
pub use console::{Console, OutputStream, PrintStream};
pub use error::RuntimeError;
pub use lifecycle::{is_launched, launch};
pub use runtime_context::{ManagedRuntime, RuntimeOptions};
pub use throwable::{Throwable, ThrowableClass};
pub use value::{ManagedValue, TypeSig};
