#![allow(dead_code)]

use std::sync::Arc;

use kwbridge::support::{LIBRARY_ANNOTATION, exceptions};
use kwbridge::{
    BridgeConfig, BridgeError, BufferStream, HostStreams, IsolatedLauncher, LibraryBridge,
    RuntimeState,
};
use kwbridge_runtime::throwable::classes;
use kwbridge_runtime::{
    Annotation, ClassDef, ClassLibrary, ClassPathEntry, Invocation, ManagedValue, MethodDef,
    Throwable, TypeSig,
};
use tempfile::TempDir;

pub const EXAMPLE_LIBRARY: &str = "org.example.ExampleLibrary";
pub const CALCULATOR_LIBRARY: &str = "org.example.CalculatorLibrary";
pub const GREETING_LIBRARY: &str = "org.example.GreetingLibrary";

/// A runtime state over a temporary install directory, with console output
/// captured into buffers.
pub struct Fixture {
    pub dir: TempDir,
    pub launcher: Arc<IsolatedLauncher>,
    pub state: Arc<RuntimeState>,
    pub out: BufferStream,
    pub err: BufferStream,
}

impl Fixture {
    /// Install directory with the packaged support archive in `lib/`.
    pub fn new() -> Self {
        Self::with_config(true, |_| {})
    }

    /// Install directory without any support library.
    pub fn without_support() -> Self {
        Self::with_config(false, |_| {})
    }

    pub fn with_config(with_support: bool, configure: impl FnOnce(&mut BridgeConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        if with_support {
            let lib = dir.path().join("lib");
            std::fs::create_dir_all(&lib).unwrap();
            let archive = format!("kwbridge-support-{}.kar", env!("CARGO_PKG_VERSION"));
            std::fs::write(lib.join(archive), b"").unwrap();
        }

        let mut config = BridgeConfig::with_install_dir(dir.path());
        configure(&mut config);

        let out = BufferStream::new();
        let err = BufferStream::new();
        let launcher = Arc::new(IsolatedLauncher::new());
        let state = Arc::new(
            RuntimeState::new(config, launcher.clone())
                .with_streams(HostStreams::new(Arc::new(out.clone()), Arc::new(err.clone()))),
        );

        Self {
            dir,
            launcher,
            state,
            out,
            err,
        }
    }

    pub fn bridge(&self, class: &str) -> Result<LibraryBridge, BridgeError> {
        LibraryBridge::builder(class)
            .state(self.state.clone())
            .class_path(example_classes())
            .build()
    }
}

/// The example libraries, mounted like a packaged archive.
pub fn example_classes() -> ClassPathEntry {
    ClassPathEntry::library(
        "lib/examples.kar",
        Arc::new(
            ClassLibrary::new("examples")
                .with_class(example_library())
                .with_class(calculator_library())
                .with_class(greeting_library()),
        ),
    )
}

fn void<F>(name: &str, body: F) -> MethodDef
where
    F: Fn(&Invocation<'_>) -> Result<ManagedValue, Throwable> + Send + Sync + 'static,
{
    MethodDef::new(name, body).returns(TypeSig::Void)
}

fn throwing(name: &str, make: fn() -> Throwable) -> MethodDef {
    void(name, move |_| Err(make()))
}

pub fn example_library() -> Arc<ClassDef> {
    ClassDef::builder(EXAMPLE_LIBRARY)
        .doc("Example library for keyword tests")
        .annotate(Annotation::new(LIBRARY_ANNOTATION).with("scope", "SUITE"))
        .default_constructor::<()>()
        .method(
            void("doSomething", |call| {
                call.out().println("Hello from the managed side");
                Ok(ManagedValue::Null)
            })
            .doc("Prints a greeting.")
            .tag("smoke"),
        )
        .method(throwing("doSkipExecution", || exceptions::skip_execution("Skip execution")))
        .method(throwing("doSkipExecutionWithHtml", || {
            exceptions::skip_execution("Skip execution <b>bold</b>").with_html(true)
        }))
        .method(throwing("doFailure", || exceptions::failure("bad input")))
        .method(throwing("doFatalError", || {
            exceptions::fatal_error("Fatal <i>error</i>").with_html(true)
        }))
        .method(throwing("doError", || {
            exceptions::error("Fatal <b>error</b>").with_html(true)
        }))
        .method(throwing("doContinuableFailure", || {
            exceptions::continuable_failure("Continuable <b>Failure</b>").with_html(true)
        }))
        .method(throwing("doNestedFatalError", || {
            exceptions::keyword_exception("wrapper")
                .with_cause(exceptions::fatal_error("disk <b>gone</b>").with_html(true))
        }))
        .method(throwing("doRuntimeError", || {
            Throwable::new(classes::index_out_of_bounds(), "nö geht nicht")
        }))
        .method(
            void("doSomethingWithParameters", |call| {
                let text = call.arg_str(0)?;
                let flag = call.arg_bool(1)?;
                let count = call.arg_i32(2)?;
                let ratio = call.arg_f64(3)?;
                call.out()
                    .println(&format!("öäüß°@ÈÊ😂❤️ {text} {flag} {count} {ratio}"));
                Ok(ManagedValue::Null)
            })
            .param("str", TypeSig::Str)
            .param("bool", TypeSig::Boolean)
            .param("i", TypeSig::Int)
            .param("d", TypeSig::Double),
        )
        .method(
            MethodDef::new("collect", |call| {
                let mut result = indexmap::IndexMap::new();
                result.insert("first".to_string(), call.arg(0)?.clone());
                result.insert("args".to_string(), call.arg(1)?.clone());
                result.insert("kwargs".to_string(), call.arg(2)?.clone());
                Ok(ManagedValue::Map(result))
            })
            .param("first", TypeSig::Object)
            .param("args", TypeSig::List)
            .param("kwargs", TypeSig::Map)
            .returns(TypeSig::Map),
        )
        .method(
            MethodDef::new("half", |call| Ok(ManagedValue::Float(call.arg_f64(0)? as f32 / 2.0)))
                .param("x", TypeSig::Float)
                .returns(TypeSig::Float),
        )
        .method(MethodDef::new("internalHook", |_| Ok(ManagedValue::Null)).non_public())
        .build()
}

pub fn calculator_library() -> Arc<ClassDef> {
    ClassDef::builder(CALCULATOR_LIBRARY)
        .annotate(
            Annotation::new(LIBRARY_ANNOTATION)
                .with("version", "1.4.0")
                .with("docFormat", "HTML")
                .with("documentation", "Arithmetic from the annotation"),
        )
        .default_constructor::<()>()
        .method(
            MethodDef::new("add", |call| {
                Ok(ManagedValue::Integer(call.arg_i32(0)? + call.arg_i32(1)?))
            })
            .param("a", TypeSig::Int)
            .param("b", TypeSig::Int)
            .returns(TypeSig::Int),
        )
        .method(
            MethodDef::new("addDouble", |call| {
                Ok(ManagedValue::Double(call.arg_f64(0)? + call.arg_f64(1)?))
            })
            .param("a", TypeSig::Double)
            .param("b", TypeSig::Double)
            .returns(TypeSig::Double),
        )
        .method(
            MethodDef::new("concat", |call| {
                Ok(format!("{}{}", call.arg_str(0)?, call.arg_str(1)?).into())
            })
            .param("a", TypeSig::Str)
            .param("b", TypeSig::Str)
            .returns(TypeSig::Str),
        )
        .method(
            MethodDef::new("negate", |call| Ok(ManagedValue::Boolean(!call.arg_bool(0)?)))
                .param("b", TypeSig::Boolean)
                .returns(TypeSig::Boolean),
        )
        .method(
            MethodDef::new("echo", |call| Ok(call.arg(0)?.clone()))
                .param("value", TypeSig::Object),
        )
        .build()
}

/// Takes its greeting as a constructor argument, positional or by keyword.
pub fn greeting_library() -> Arc<ClassDef> {
    ClassDef::builder(GREETING_LIBRARY)
        .constructor(|call| {
            let greeting = match call.args().first() {
                Some(value) => value.as_str().map(str::to_string),
                None => call
                    .kwargs()
                    .get("greeting")
                    .and_then(ManagedValue::as_str)
                    .map(str::to_string),
            };
            let greeting = greeting.ok_or_else(|| exceptions::failure("greeting required"))?;
            Ok(Box::new(greeting))
        })
        .method(
            MethodDef::new("greet", |call| {
                let greeting = call.this_as::<String>()?;
                Ok(format!("{greeting}, {}!", call.arg_str(0)?).into())
            })
            .param("name", TypeSig::Str)
            .returns(TypeSig::Str),
        )
        .build()
}
