use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::console::PrintStream;
use crate::runtime_context::ManagedRuntime;
use crate::throwable::Throwable;
use crate::value::{ManagedValue, TypeSig};

/// Native body of a managed method.
pub type NativeMethod =
    Arc<dyn Fn(&Invocation<'_>) -> Result<ManagedValue, Throwable> + Send + Sync>;

/// Native constructor producing the instance state of a managed object.
pub type NativeConstructor =
    Arc<dyn Fn(&Invocation<'_>) -> Result<Box<dyn Any + Send + Sync>, Throwable> + Send + Sync>;

/// Arguments and context of a single native call.
pub struct Invocation<'a> {
    runtime: &'a ManagedRuntime,
    this: Option<&'a ObjectRef>,
    args: &'a [ManagedValue],
    kwargs: &'a IndexMap<String, ManagedValue>,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        runtime: &'a ManagedRuntime,
        this: Option<&'a ObjectRef>,
        args: &'a [ManagedValue],
        kwargs: &'a IndexMap<String, ManagedValue>,
    ) -> Self {
        Self {
            runtime,
            this,
            args,
            kwargs,
        }
    }

    pub fn runtime(&self) -> &ManagedRuntime {
        self.runtime
    }

    /// The runtime's current standard output channel.
    pub fn out(&self) -> Arc<PrintStream> {
        self.runtime.console().out()
    }

    /// The runtime's current standard error channel.
    pub fn err(&self) -> Arc<PrintStream> {
        self.runtime.console().err()
    }

    pub fn this(&self) -> Option<&ObjectRef> {
        self.this
    }

    /// Instance state of the receiver, downcast to `T`.
    pub fn this_as<T: Any>(&self) -> Result<&T, Throwable> {
        let this = self
            .this
            .ok_or_else(|| Throwable::null_pointer("no receiver for instance call"))?;
        this.state::<T>().ok_or_else(|| {
            Throwable::illegal_argument(format!(
                "receiver {this:?} does not hold {}",
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn args(&self) -> &[ManagedValue] {
        self.args
    }

    pub fn kwargs(&self) -> &IndexMap<String, ManagedValue> {
        self.kwargs
    }

    pub fn arg(&self, index: usize) -> Result<&ManagedValue, Throwable> {
        self.args.get(index).ok_or_else(|| {
            Throwable::new(
                crate::throwable::classes::index_out_of_bounds(),
                format!("argument {index} out of bounds for length {}", self.args.len()),
            )
        })
    }

    pub fn arg_str(&self, index: usize) -> Result<&str, Throwable> {
        let value = self.arg(index)?;
        value.as_str().ok_or_else(|| mismatch(index, "String", value))
    }

    pub fn arg_bool(&self, index: usize) -> Result<bool, Throwable> {
        let value = self.arg(index)?;
        value.as_bool().ok_or_else(|| mismatch(index, "boolean", value))
    }

    pub fn arg_i32(&self, index: usize) -> Result<i32, Throwable> {
        let value = self.arg(index)?;
        value.as_i32().ok_or_else(|| mismatch(index, "int", value))
    }

    pub fn arg_i64(&self, index: usize) -> Result<i64, Throwable> {
        let value = self.arg(index)?;
        value.as_i64().ok_or_else(|| mismatch(index, "long", value))
    }

    pub fn arg_f64(&self, index: usize) -> Result<f64, Throwable> {
        let value = self.arg(index)?;
        value.as_f64().ok_or_else(|| mismatch(index, "double", value))
    }

    pub fn arg_list(&self, index: usize) -> Result<&[ManagedValue], Throwable> {
        let value = self.arg(index)?;
        value.as_list().ok_or_else(|| mismatch(index, "List", value))
    }

    pub fn arg_map(&self, index: usize) -> Result<&IndexMap<String, ManagedValue>, Throwable> {
        let value = self.arg(index)?;
        value.as_map().ok_or_else(|| mismatch(index, "Map", value))
    }

    pub fn arg_object(&self, index: usize) -> Result<&ObjectRef, Throwable> {
        let value = self.arg(index)?;
        value.as_object().ok_or_else(|| mismatch(index, "Object", value))
    }
}

fn mismatch(index: usize, expected: &str, found: &ManagedValue) -> Throwable {
    Throwable::illegal_argument(format!(
        "argument {index}: expected {expected}, got {}",
        found.type_name()
    ))
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeSig,
}

/// A runtime-retained annotation on a class.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    name: String,
    values: IndexMap<String, ManagedValue>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ManagedValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&ManagedValue> {
        self.values.get(key)
    }
}

/// A method declared on a managed class.
pub struct MethodDef {
    name: String,
    params: Vec<Param>,
    returns: TypeSig,
    public: bool,
    is_static: bool,
    doc: Option<String>,
    tags: Vec<String>,
    body: NativeMethod,
}

impl MethodDef {
    /// A public instance method returning `Object`.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<ManagedValue, Throwable> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: TypeSig::Object,
            public: true,
            is_static: false,
            doc: None,
            tags: Vec::new(),
            body: Arc::new(body),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeSig) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn returns(mut self, ty: TypeSig) -> Self {
        self.returns = ty;
        self
    }

    pub fn non_public(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn return_type(&self) -> &TypeSig {
        &self.returns
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn documentation(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Reflective invocation.
    ///
    /// Argument problems are thrown directly as `IllegalArgumentException`
    /// (or `NullPointerException` for a missing receiver). Anything the body
    /// throws comes back wrapped in `InvocationTargetException`.
    pub fn invoke(
        &self,
        runtime: &ManagedRuntime,
        this: Option<&ObjectRef>,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue, Throwable> {
        let args = self.bind(this, args)?;
        self.run(runtime, this, &args)
            .map_err(Throwable::invocation_target)
    }

    /// Call without the reflective wrapper: body throwables pass through.
    pub(crate) fn call(
        &self,
        runtime: &ManagedRuntime,
        this: Option<&ObjectRef>,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue, Throwable> {
        let args = self.bind(this, args)?;
        self.run(runtime, this, &args)
    }

    fn bind(
        &self,
        this: Option<&ObjectRef>,
        args: Vec<ManagedValue>,
    ) -> Result<Vec<ManagedValue>, Throwable> {
        if !self.is_static && this.is_none() {
            return Err(Throwable::null_pointer(format!(
                "{} is an instance method and needs a receiver",
                self.name
            )));
        }
        if args.len() != self.params.len() {
            return Err(Throwable::illegal_argument(format!(
                "wrong number of arguments for {}: expected {}, got {}",
                self.name,
                self.params.len(),
                args.len()
            )));
        }
        self.params
            .iter()
            .zip(args)
            .map(|(param, value)| {
                let found = value.type_name().to_string();
                param.ty.accept(value).ok_or_else(|| {
                    Throwable::illegal_argument(format!(
                        "argument type mismatch for {}: parameter {} expects {}, got {found}",
                        self.name, param.name, param.ty
                    ))
                })
            })
            .collect()
    }

    fn run(
        &self,
        runtime: &ManagedRuntime,
        this: Option<&ObjectRef>,
        args: &[ManagedValue],
    ) -> Result<ManagedValue, Throwable> {
        let kwargs = IndexMap::new();
        let call = Invocation::new(runtime, this, args, &kwargs);
        let result = (self.body)(&call)?;
        if self.returns == TypeSig::Void {
            Ok(ManagedValue::Null)
        } else {
            Ok(result)
        }
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("public", &self.public)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

/// A managed class: documentation, annotations, constructor and methods.
pub struct ClassDef {
    name: String,
    doc: Option<String>,
    annotations: Vec<Annotation>,
    constructor: Option<NativeConstructor>,
    methods: Vec<Arc<MethodDef>>,
}

impl ClassDef {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            class: ClassDef {
                name: name.into(),
                doc: None,
                annotations: Vec::new(),
                constructor: None,
                methods: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn documentation(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    /// Declared methods in declaration order, public or not.
    pub fn declared_methods(&self) -> &[Arc<MethodDef>] {
        &self.methods
    }

    /// First declared method called `name` taking `arity` arguments.
    pub fn find_method(&self, name: &str, arity: usize) -> Option<&Arc<MethodDef>> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.params.len() == arity)
    }

    pub fn is_instantiable(&self) -> bool {
        self.constructor.is_some()
    }

    pub(crate) fn construct(
        self: &Arc<Self>,
        runtime: &ManagedRuntime,
        args: &[ManagedValue],
        kwargs: &IndexMap<String, ManagedValue>,
    ) -> Option<Result<ObjectRef, Throwable>> {
        let constructor = self.constructor.as_ref()?;
        let call = Invocation::new(runtime, None, args, kwargs);
        Some(constructor(&call).map(|state| ObjectRef::new(self.clone(), state)))
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

pub struct ClassBuilder {
    class: ClassDef,
}

impl ClassBuilder {
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.class.doc = Some(doc.into());
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.class.annotations.push(annotation);
        self
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Box<dyn Any + Send + Sync>, Throwable>
            + Send
            + Sync
            + 'static,
    {
        self.class.constructor = Some(Arc::new(constructor));
        self
    }

    /// Constructor ignoring its arguments and producing `T::default()`.
    pub fn default_constructor<T>(self) -> Self
    where
        T: Default + Any + Send + Sync,
    {
        self.constructor(|_| Ok(Box::new(T::default())))
    }

    pub fn method(mut self, method: MethodDef) -> Self {
        self.class.methods.push(Arc::new(method));
        self
    }

    pub fn build(self) -> Arc<ClassDef> {
        Arc::new(self.class)
    }
}

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

struct Instance {
    id: u64,
    class: Arc<ClassDef>,
    state: Box<dyn Any + Send + Sync>,
}

/// Handle to a managed object. Clones share the object; equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<Instance>);

impl ObjectRef {
    pub(crate) fn new(class: Arc<ClassDef>, state: Box<dyn Any + Send + Sync>) -> Self {
        Self(Arc::new(Instance {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            class,
            state,
        }))
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        &self.0.class
    }

    /// Identity of the object within this process.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn state<T: Any>(&self) -> Option<&T> {
        self.0.state.downcast_ref::<T>()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.class.name, self.0.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_context::RuntimeOptions;
    use crate::throwable::classes;

    #[derive(Default)]
    struct Counter {
        start: i32,
    }

    fn counter_class() -> Arc<ClassDef> {
        ClassDef::builder("test.Counter")
            .doc("Counts things")
            .constructor(|call| {
                let start = match call.args().first() {
                    Some(v) => v.as_i32().unwrap_or(0),
                    None => 0,
                };
                Ok(Box::new(Counter { start }))
            })
            .method(
                MethodDef::new("plus", |call| {
                    let counter = call.this_as::<Counter>()?;
                    Ok(ManagedValue::Integer(counter.start + call.arg_i32(0)?))
                })
                .param("n", TypeSig::Int)
                .returns(TypeSig::Int),
            )
            .method(
                MethodDef::new("explode", |_| {
                    Err(Throwable::new(classes::index_out_of_bounds(), "boom"))
                })
                .returns(TypeSig::Void),
            )
            .method(MethodDef::new("hidden", |_| Ok(ManagedValue::Null)).non_public())
            .build()
    }

    fn runtime() -> ManagedRuntime {
        ManagedRuntime::new(RuntimeOptions::default()).unwrap()
    }

    #[test]
    fn invoke_binds_and_returns() {
        let rt = runtime();
        let class = counter_class();
        let obj = class
            .construct(&rt, &[ManagedValue::Integer(10)], &IndexMap::new())
            .unwrap()
            .unwrap();

        let plus = class.find_method("plus", 1).unwrap();
        let result = plus
            .invoke(&rt, Some(&obj), vec![ManagedValue::Integer(5)])
            .unwrap();
        assert_eq!(result, ManagedValue::Integer(15));
    }

    #[test]
    fn invoke_wraps_thrown_errors() {
        let rt = runtime();
        let class = counter_class();
        let obj = class
            .construct(&rt, &[], &IndexMap::new())
            .unwrap()
            .unwrap();

        let explode = class.find_method("explode", 0).unwrap();
        let err = explode.invoke(&rt, Some(&obj), vec![]).unwrap_err();
        assert_eq!(err.class_name(), classes::INVOCATION_TARGET);
        let cause = err.cause().unwrap();
        assert_eq!(cause.class_name(), classes::INDEX_OUT_OF_BOUNDS);
        assert_eq!(cause.message(), Some("boom"));
    }

    #[test]
    fn invoke_rejects_bad_arguments_without_wrapping() {
        let rt = runtime();
        let class = counter_class();
        let obj = class
            .construct(&rt, &[], &IndexMap::new())
            .unwrap()
            .unwrap();
        let plus = class.find_method("plus", 1).unwrap();

        let err = plus.invoke(&rt, Some(&obj), vec![]).unwrap_err();
        assert_eq!(err.class_name(), classes::ILLEGAL_ARGUMENT);

        let err = plus
            .invoke(&rt, Some(&obj), vec![ManagedValue::Str("1".into())])
            .unwrap_err();
        assert_eq!(err.class_name(), classes::ILLEGAL_ARGUMENT);

        let err = plus
            .invoke(&rt, None, vec![ManagedValue::Integer(1)])
            .unwrap_err();
        assert_eq!(err.class_name(), classes::NULL_POINTER);
    }

    #[test]
    fn void_methods_return_null() {
        let rt = runtime();
        let class = ClassDef::builder("test.Void")
            .default_constructor::<Counter>()
            .method(MethodDef::new("noop", |_| Ok(ManagedValue::Integer(1))).returns(TypeSig::Void))
            .build();
        let obj = class
            .construct(&rt, &[], &IndexMap::new())
            .unwrap()
            .unwrap();
        let noop = class.find_method("noop", 0).unwrap();
        assert_eq!(
            noop.invoke(&rt, Some(&obj), vec![]).unwrap(),
            ManagedValue::Null
        );
    }

    #[test]
    fn object_identity() {
        let rt = runtime();
        let class = counter_class();
        let a = class.construct(&rt, &[], &IndexMap::new()).unwrap().unwrap();
        let b = class.construct(&rt, &[], &IndexMap::new()).unwrap().unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(format!("{a:?}").starts_with("test.Counter@"));
    }

    #[test]
    fn declared_methods_keep_order_and_visibility() {
        let class = counter_class();
        let names: Vec<_> = class.declared_methods().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["plus", "explode", "hidden"]);
        assert!(!class.declared_methods()[2].is_public());
        assert_eq!(class.documentation(), Some("Counts things"));
        assert_eq!(class.simple_name(), "Counter");
    }
}
