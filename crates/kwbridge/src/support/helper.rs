use std::sync::Arc;

use indexmap::IndexMap;
use kwbridge_runtime::throwable::classes;
use kwbridge_runtime::{ClassDef, Invocation, ManagedValue, MethodDef, Throwable, TypeSig};
use parking_lot::Mutex;

use super::{HELPER_CLASS, LIBRARY_ANNOTATION};

pub const GET_KEYWORD_NAMES: &str = "getKeywordNames";
pub const GET_KEYWORD_ARGUMENTS: &str = "getKeywordArguments";
pub const GET_KEYWORD_TYPES: &str = "getKeywordTypes";
pub const GET_KEYWORD_DOCUMENTATION: &str = "getKeywordDocumentation";
pub const GET_KEYWORD_TAGS: &str = "getKeywordTags";
pub const GET_NAME: &str = "getName";
pub const GET_LIBRARY_SCOPE: &str = "getLibraryScope";
pub const GET_LIBRARY_VERSION: &str = "getLibraryVersion";
pub const GET_DOC_FORMAT: &str = "getDocFormat";
pub const RUN_KEYWORD: &str = "runKeyword";

pub const DEFAULT_SCOPE: &str = "GLOBAL";
pub const DEFAULT_DOC_FORMAT: &str = "ROBOT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Fixed,
    /// Collects leftover positional arguments (a parameter named `args`).
    Varargs,
    /// Collects leftover keyword arguments (a parameter named `kwargs`).
    Kwargs,
}

/// One keyword argument as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentInfo {
    /// Display name: `*args` and `**kwargs` carry their stars.
    pub name: String,
    pub param: String,
    pub type_name: String,
    pub kind: ArgumentKind,
}

impl ArgumentInfo {
    fn new(param: &str, ty: &TypeSig) -> Self {
        let (name, kind, ty) = match param {
            "args" => ("*args".to_string(), ArgumentKind::Varargs, &TypeSig::Object),
            "kwargs" => ("**kwargs".to_string(), ArgumentKind::Kwargs, &TypeSig::Object),
            _ => (param.to_string(), ArgumentKind::Fixed, ty),
        };
        Self {
            name,
            param: param.to_string(),
            type_name: type_hint(ty).to_string(),
            kind,
        }
    }
}

/// Host type hint for a declared parameter type.
pub fn type_hint(ty: &TypeSig) -> &str {
    match ty {
        TypeSig::Object => "Any",
        TypeSig::Str => "str",
        TypeSig::Boolean => "bool",
        other => other.simple_name(),
    }
}

#[derive(Debug)]
pub struct KeywordInfo {
    pub name: String,
    pub method: Arc<MethodDef>,
    pub arguments: Vec<ArgumentInfo>,
}

impl KeywordInfo {
    fn new(method: &Arc<MethodDef>) -> Self {
        Self {
            name: method.name().to_string(),
            method: method.clone(),
            arguments: method
                .params()
                .iter()
                .map(|p| ArgumentInfo::new(&p.name, &p.ty))
                .collect(),
        }
    }

    /// Map host-style call arguments onto the method's parameter list.
    ///
    /// Positionals fill fixed parameters in order and overflow into `*args`.
    /// Fixed parameters left over are taken from `kwargs` by name; what
    /// remains of `kwargs` goes to `**kwargs`.
    pub fn bind(
        &self,
        args: Vec<ManagedValue>,
        mut kwargs: IndexMap<String, ManagedValue>,
    ) -> Result<Vec<ManagedValue>, Throwable> {
        let mut positional = args.into_iter();
        let mut bound = Vec::with_capacity(self.arguments.len());
        let mut varargs_slot = None;
        let mut kwargs_slot = None;

        for (slot, arg) in self.arguments.iter().enumerate() {
            match arg.kind {
                ArgumentKind::Varargs => {
                    varargs_slot = Some(slot);
                    bound.push(ManagedValue::Null);
                }
                ArgumentKind::Kwargs => {
                    kwargs_slot = Some(slot);
                    bound.push(ManagedValue::Null);
                }
                ArgumentKind::Fixed => {
                    if let Some(value) = positional.next() {
                        if kwargs.contains_key(&arg.param) {
                            return Err(Throwable::illegal_argument(format!(
                                "{} got multiple values for argument '{}'",
                                self.name, arg.param
                            )));
                        }
                        bound.push(value);
                    } else {
                        let value = kwargs.shift_remove(&arg.param).ok_or_else(|| {
                            Throwable::illegal_argument(format!(
                                "{} missing value for argument '{}'",
                                self.name, arg.param
                            ))
                        })?;
                        bound.push(value);
                    }
                }
            }
        }

        let rest: Vec<ManagedValue> = positional.collect();
        match varargs_slot {
            Some(slot) => bound[slot] = ManagedValue::List(rest),
            None if !rest.is_empty() => {
                return Err(Throwable::illegal_argument(format!(
                    "{} got {} unexpected positional argument(s)",
                    self.name,
                    rest.len()
                )));
            }
            None => {}
        }

        match kwargs_slot {
            Some(slot) => bound[slot] = ManagedValue::Map(kwargs),
            None => {
                if let Some(name) = kwargs.keys().next() {
                    return Err(Throwable::illegal_argument(format!(
                        "{} got an unexpected keyword argument '{name}'",
                        self.name
                    )));
                }
            }
        }

        Ok(bound)
    }
}

pub type Keywords = IndexMap<String, Arc<KeywordInfo>>;

/// Every public declared method of `class`, in declaration order. A later
/// overload replaces an earlier one of the same name.
pub fn collect_keywords(class: &ClassDef) -> Keywords {
    let mut keywords = Keywords::new();
    for method in class.declared_methods().iter().filter(|m| m.is_public()) {
        keywords.insert(method.name().to_string(), Arc::new(KeywordInfo::new(method)));
    }
    keywords
}

/// Keyword tables, collected once per class.
#[derive(Default)]
pub struct KeywordCache {
    entries: Mutex<Vec<(Arc<ClassDef>, Arc<Keywords>)>>,
}

impl KeywordCache {
    pub fn keywords(&self, class: &Arc<ClassDef>) -> Arc<Keywords> {
        let mut entries = self.entries.lock();
        if let Some((_, keywords)) = entries.iter().find(|(c, _)| Arc::ptr_eq(c, class)) {
            return keywords.clone();
        }
        let keywords = Arc::new(collect_keywords(class));
        tracing::debug!(
            class = class.name(),
            keywords = keywords.len(),
            "Keyword table collected"
        );
        entries.push((class.clone(), keywords.clone()));
        keywords
    }
}

fn keyword(cache: &KeywordCache, call: &Invocation<'_>) -> Result<Arc<KeywordInfo>, Throwable> {
    let obj = call.arg_object(0)?;
    let name = call.arg_str(1)?;
    cache.keywords(obj.class()).get(name).cloned().ok_or_else(|| {
        Throwable::new(
            classes::no_such_method(),
            format!("{}.{name}", obj.class().name()),
        )
    })
}

fn library_attribute(call: &Invocation<'_>, key: &str) -> Result<Option<ManagedValue>, Throwable> {
    let obj = call.arg_object(0)?;
    Ok(obj
        .class()
        .annotation(LIBRARY_ANNOTATION)
        .and_then(|a| a.get(key))
        .filter(|v| !matches!(v, ManagedValue::Str(s) if s.is_empty()))
        .cloned())
}

fn strings<'a>(items: impl IntoIterator<Item = &'a String>) -> ManagedValue {
    ManagedValue::List(items.into_iter().cloned().map(ManagedValue::Str).collect())
}

/// Static method taking `(obj)` or `(obj, name)`.
fn helper_method<F>(name: &str, takes_keyword: bool, returns: TypeSig, body: F) -> MethodDef
where
    F: Fn(&Invocation<'_>) -> Result<ManagedValue, Throwable> + Send + Sync + 'static,
{
    let method = MethodDef::new(name, body)
        .as_static()
        .param("obj", TypeSig::Object);
    let method = if takes_keyword {
        method.param("name", TypeSig::Str)
    } else {
        method
    };
    method.returns(returns)
}

pub(crate) fn helper_class() -> Arc<ClassDef> {
    let cache = Arc::new(KeywordCache::default());

    let names = {
        let cache = cache.clone();
        helper_method(GET_KEYWORD_NAMES, false, TypeSig::List, move |call| {
            let obj = call.arg_object(0)?;
            Ok(strings(cache.keywords(obj.class()).keys()))
        })
    };
    let arguments = {
        let cache = cache.clone();
        helper_method(GET_KEYWORD_ARGUMENTS, true, TypeSig::List, move |call| {
            let info = keyword(&cache, call)?;
            Ok(strings(info.arguments.iter().map(|a| &a.name)))
        })
    };
    let types = {
        let cache = cache.clone();
        helper_method(GET_KEYWORD_TYPES, true, TypeSig::List, move |call| {
            let info = keyword(&cache, call)?;
            Ok(strings(info.arguments.iter().map(|a| &a.type_name)))
        })
    };
    let documentation = {
        let cache = cache.clone();
        helper_method(GET_KEYWORD_DOCUMENTATION, true, TypeSig::Str, move |call| {
            let info = keyword(&cache, call)?;
            Ok(info
                .method
                .documentation()
                .map_or(ManagedValue::Null, ManagedValue::from))
        })
    };
    let tags = {
        let cache = cache.clone();
        helper_method(GET_KEYWORD_TAGS, true, TypeSig::List, move |call| {
            let info = keyword(&cache, call)?;
            Ok(strings(info.method.tags()))
        })
    };
    let run = MethodDef::new(RUN_KEYWORD, move |call| {
        let info = keyword(&cache, call)?;
        let obj = call.arg_object(0)?;
        let bound = info.bind(call.arg_list(2)?.to_vec(), call.arg_map(3)?.clone())?;
        tracing::debug!(keyword = %info.name, args = bound.len(), "Running keyword");
        info.method.invoke(call.runtime(), Some(obj), bound)
    })
    .as_static()
    .param("obj", TypeSig::Object)
    .param("name", TypeSig::Str)
    .param("args", TypeSig::List)
    .param("kwargs", TypeSig::Map);

    ClassDef::builder(HELPER_CLASS)
        .doc("Reflective keyword discovery and invocation for library objects.")
        .method(names)
        .method(arguments)
        .method(types)
        .method(documentation)
        .method(tags)
        .method(helper_method(GET_NAME, false, TypeSig::Str, |call| {
            Ok(call.arg_object(0)?.class().simple_name().into())
        }))
        .method(helper_method(GET_LIBRARY_SCOPE, false, TypeSig::Str, |call| {
            Ok(library_attribute(call, "scope")?.unwrap_or_else(|| DEFAULT_SCOPE.into()))
        }))
        .method(helper_method(GET_LIBRARY_VERSION, false, TypeSig::Str, |call| {
            Ok(library_attribute(call, "version")?.unwrap_or(ManagedValue::Null))
        }))
        .method(helper_method(GET_DOC_FORMAT, false, TypeSig::Str, |call| {
            Ok(library_attribute(call, "docFormat")?.unwrap_or_else(|| DEFAULT_DOC_FORMAT.into()))
        }))
        .method(run)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> MethodDef {
        MethodDef::new(name, |_| Ok(ManagedValue::Null))
    }

    fn keyword_info(method: MethodDef) -> KeywordInfo {
        KeywordInfo::new(&Arc::new(method))
    }

    fn kwargs(pairs: &[(&str, i32)]) -> IndexMap<String, ManagedValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ManagedValue::Integer(*v)))
            .collect()
    }

    #[test]
    fn collects_public_methods_in_declaration_order() {
        let class = ClassDef::builder("lib.Sample")
            .method(noop("zeta"))
            .method(noop("secret").non_public())
            .method(noop("alpha").param("x", TypeSig::Int))
            .build();
        let keywords = collect_keywords(&class);
        let names: Vec<_> = keywords.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn reports_star_arguments_and_type_hints() {
        let info = keyword_info(
            noop("mixed")
                .param("text", TypeSig::Str)
                .param("flag", TypeSig::Boolean)
                .param("count", TypeSig::Int)
                .param("ratio", TypeSig::Double)
                .param("any", TypeSig::Object)
                .param("args", TypeSig::List)
                .param("kwargs", TypeSig::Map),
        );
        let names: Vec<_> = info.arguments.iter().map(|a| a.name.as_str()).collect();
        let types: Vec<_> = info.arguments.iter().map(|a| a.type_name.as_str()).collect();
        assert_eq!(names, vec!["text", "flag", "count", "ratio", "any", "*args", "**kwargs"]);
        assert_eq!(types, vec!["str", "bool", "int", "double", "Any", "Any", "Any"]);
    }

    #[test]
    fn binds_positionals_then_keywords() {
        let info = keyword_info(noop("add").param("a", TypeSig::Int).param("b", TypeSig::Int));
        let bound = info
            .bind(vec![ManagedValue::Integer(1)], kwargs(&[("b", 2)]))
            .unwrap();
        assert_eq!(bound, vec![ManagedValue::Integer(1), ManagedValue::Integer(2)]);

        let err = info.bind(vec![ManagedValue::Integer(1)], kwargs(&[])).unwrap_err();
        assert_eq!(err.class_name(), classes::ILLEGAL_ARGUMENT);

        let err = info
            .bind(
                vec![ManagedValue::Integer(1), ManagedValue::Integer(2)],
                kwargs(&[("c", 3)]),
            )
            .unwrap_err();
        assert!(err.message().unwrap().contains("'c'"));

        let err = info
            .bind(vec![ManagedValue::Integer(1), ManagedValue::Integer(2)], kwargs(&[("a", 3)]))
            .unwrap_err();
        assert!(err.message().unwrap().contains("multiple values"));
    }

    #[test]
    fn leftovers_go_to_star_parameters() {
        let info = keyword_info(
            noop("collect")
                .param("first", TypeSig::Int)
                .param("args", TypeSig::List)
                .param("kwargs", TypeSig::Map),
        );
        let bound = info
            .bind(
                vec![
                    ManagedValue::Integer(1),
                    ManagedValue::Integer(2),
                    ManagedValue::Integer(3),
                ],
                kwargs(&[("x", 9)]),
            )
            .unwrap();
        assert_eq!(bound[0], ManagedValue::Integer(1));
        assert_eq!(
            bound[1],
            ManagedValue::List(vec![ManagedValue::Integer(2), ManagedValue::Integer(3)])
        );
        assert_eq!(bound[2], ManagedValue::Map(kwargs(&[("x", 9)])));
    }

    #[test]
    fn too_many_positionals_without_varargs() {
        let info = keyword_info(noop("one").param("a", TypeSig::Int));
        let err = info
            .bind(
                vec![ManagedValue::Integer(1), ManagedValue::Integer(2)],
                kwargs(&[]),
            )
            .unwrap_err();
        assert_eq!(err.class_name(), classes::ILLEGAL_ARGUMENT);
    }

    #[test]
    fn cache_collects_once_per_class() {
        let cache = KeywordCache::default();
        let class = ClassDef::builder("lib.Cached").method(noop("go")).build();
        let first = cache.keywords(&class);
        let second = cache.keywords(&class);
        assert!(Arc::ptr_eq(&first, &second));

        let other = ClassDef::builder("lib.Cached").method(noop("stop")).build();
        assert!(cache.keywords(&other).contains_key("stop"));
    }
}
