mod description;
mod function;
mod loader;

pub use description::ClassDescription;
pub use function::{FromBean, Function, Inject, Method, Value};
pub use loader::{ClassLoader, ClassLoaderProvider, DefaultClassLoaderProvider, CONTEXT_CLASS_LOADER, SYSTEM_CLASS_LOADER};

use alloc::{
    borrow::ToOwned as _,
    boxed::Box,
    collections::BTreeMap,
    string::String,
    sync::Arc,
    vec::Vec,
};
use core::{
    any::TypeId,
    fmt::{self, Debug, Display, Formatter},
    marker::PhantomData,
};

use crate::{
    any::TypeInfo,
    service::{service_fn, BoxCloneService, Service as _},
    Bean,
};

pub(crate) const CONSTRUCTOR_NAME: &str = "new";

type BoxedMemberCall = BoxCloneService<(Option<Bean>, Vec<Bean>), Option<Bean>, anyhow::Error>;

/// A callable member of a class: constructor, instance method or static method.
#[derive(Clone)]
pub struct Member {
    name: String,
    parameter_types: Vec<TypeInfo>,
    is_static: bool,
    call: BoxedMemberCall,
}

impl Member {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parameter_types(&self) -> &[TypeInfo] {
        &self.parameter_types
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    /// Calls the member with arguments already converted to its parameter types.
    pub(crate) fn call(&self, target: Option<Bean>, arguments: Vec<Bean>) -> anyhow::Result<Option<Bean>> {
        self.call.clone().call((target, arguments))
    }
}

impl Debug for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("parameter_types", &self.parameter_types)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

/// A writable property of a class.
#[derive(Clone)]
pub struct Property {
    name: String,
    type_info: TypeInfo,
    setter: BoxedMemberCall,
}

impl Property {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub(crate) fn set(&self, target: Bean, value: Bean) -> anyhow::Result<()> {
        self.setter.clone().call((Some(target), Vec::from([value]))).map(|_| ())
    }
}

impl Debug for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("type_info", &self.type_info)
            .finish_non_exhaustive()
    }
}

struct ClassData {
    name: String,
    type_info: TypeInfo,
    constructors: Vec<Member>,
    methods: Vec<Member>,
    properties: BTreeMap<String, Property>,
}

/// Runtime description of a Rust type.
///
/// Classes are registered explicitly with a [`ClassLoader`] and replace reflection: constructors, methods and
/// property setters are typed closures that are called with type-erased beans.
///
/// ```
/// use beanwire::{Class, Value};
///
/// struct Label {
///     text: String,
/// }
///
/// let class = Class::builder::<Label>("Label")
///     .constructor(|Value(text): Value<String>| Ok(Label { text }))
///     .method("text", |label: &Label| Ok(label.text.clone()))
///     .build();
///
/// assert_eq!(class.name(), "Label");
/// assert_eq!(class.constructors().len(), 1);
/// ```
#[derive(Clone)]
pub struct Class(Arc<ClassData>);

impl Class {
    #[inline]
    #[must_use]
    pub fn builder<T: Send + Sync + 'static>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name)
    }

    /// Creates a class without members, used for value types like numbers and strings.
    #[inline]
    #[must_use]
    pub fn opaque<T: Send + Sync + 'static>(name: impl Into<String>) -> Self {
        ClassBuilder::<T>::new(name).build()
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.0.type_info
    }

    #[inline]
    #[must_use]
    pub fn constructors(&self) -> &[Member] {
        &self.0.constructors
    }

    #[inline]
    #[must_use]
    pub fn methods(&self) -> &[Member] {
        &self.0.methods
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Member> + 'a {
        self.0.methods.iter().filter(move |method| method.name == name)
    }

    #[inline]
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.0.properties.get(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.0.properties.keys().map(String::as_str)
    }

    /// Returns `true` if the bean is an instance of this class.
    #[inline]
    #[must_use]
    pub fn is_instance(&self, bean: &Bean) -> bool {
        bean.type_info() == self.0.type_info
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.0.type_info == other.0.type_info && self.0.name == other.0.name
    }
}

impl Eq for Class {}

impl Display for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .field("type_info", &self.0.type_info)
            .field("constructors", &self.0.constructors.len())
            .field("methods", &self.0.methods.len())
            .field("properties", &self.0.properties.len())
            .finish()
    }
}

pub struct ClassBuilder<T> {
    name: String,
    constructors: Vec<Member>,
    methods: Vec<Member>,
    properties: BTreeMap<String, Property>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: Vec::new(),
            methods: Vec::new(),
            properties: BTreeMap::new(),
            _marker: PhantomData,
        }
    }

    /// Adds a constructor. A class can have several constructors that differ in their parameter types.
    #[must_use]
    pub fn constructor<Args, F>(mut self, constructor: F) -> Self
    where
        F: Function<Args, Output = T>,
    {
        let call = BoxCloneService(Box::new(service_fn(move |(_, arguments): (Option<Bean>, Vec<Bean>)| {
            constructor.clone().call(&arguments).map(|value| Some(Bean::new(value)))
        })));
        self.constructors.push(Member {
            name: CONSTRUCTOR_NAME.to_owned(),
            parameter_types: F::parameter_types(),
            is_static: false,
            call,
        });
        self
    }

    /// Adds an instance method receiving the target instance as its first argument.
    /// A method returning `()` produces no value.
    #[must_use]
    pub fn method<Args, F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Method<T, Args>,
    {
        let name = name.into();
        let call = BoxCloneService(Box::new(service_fn({
            let name = name.clone();
            move |(target, arguments): (Option<Bean>, Vec<Bean>)| {
                let target = target.ok_or_else(|| anyhow::anyhow!("method `{name}` called without target instance"))?;
                let instance = target
                    .downcast_ref::<T>()
                    .ok_or_else(|| anyhow::anyhow!("target of type `{}` is not compatible", target.type_info()))?;
                method.clone().call(instance, &arguments).map(into_result)
            }
        })));
        self.methods.push(Member {
            name,
            parameter_types: F::parameter_types(),
            is_static: false,
            call,
        });
        self
    }

    #[must_use]
    pub fn static_method<Args, F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Function<Args>,
    {
        let call = BoxCloneService(Box::new(service_fn(move |(_, arguments): (Option<Bean>, Vec<Bean>)| {
            method.clone().call(&arguments).map(into_result)
        })));
        self.methods.push(Member {
            name: name.into(),
            parameter_types: F::parameter_types(),
            is_static: true,
            call,
        });
        self
    }

    /// Adds a property setter. Setting a property replaces a previously registered setter with the same name.
    #[must_use]
    pub fn property<V, F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        V: FromBean,
        F: Fn(&T, V) -> anyhow::Result<()> + Clone + Send + Sync + 'static,
    {
        let name = name.into();
        let call = BoxCloneService(Box::new(service_fn({
            let name = name.clone();
            move |(target, arguments): (Option<Bean>, Vec<Bean>)| {
                let target = target.ok_or_else(|| anyhow::anyhow!("property `{name}` set without target instance"))?;
                let instance = target
                    .downcast_ref::<T>()
                    .ok_or_else(|| anyhow::anyhow!("target of type `{}` is not compatible", target.type_info()))?;
                let value = arguments
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("missing value for property `{name}`"))?;
                setter(instance, V::from_bean(value)?).map(|()| None)
            }
        })));
        self.properties.insert(
            name.clone(),
            Property {
                name,
                type_info: V::type_info(),
                setter: call,
            },
        );
        self
    }

    #[must_use]
    pub fn build(self) -> Class {
        Class(Arc::new(ClassData {
            name: self.name,
            type_info: TypeInfo::of::<T>(),
            constructors: self.constructors,
            methods: self.methods,
            properties: self.properties,
        }))
    }
}

fn into_result<R: Send + Sync + 'static>(value: R) -> Option<Bean> {
    if TypeId::of::<R>() == TypeId::of::<()>() {
        None
    } else {
        Some(Bean::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{Class, Inject, Value};
    use crate::Bean;

    use alloc::{string::String, sync::Arc, vec::Vec};
    use core::sync::atomic::{AtomicU32, Ordering};

    struct Counter {
        step: u32,
        value: AtomicU32,
    }

    fn counter_class() -> Class {
        Class::builder::<Counter>("Counter")
            .constructor(|| {
                Ok(Counter {
                    step: 1,
                    value: AtomicU32::new(0),
                })
            })
            .constructor(|Value(step): Value<u32>| {
                Ok(Counter {
                    step,
                    value: AtomicU32::new(0),
                })
            })
            .method("increment", |counter: &Counter| {
                counter.value.fetch_add(counter.step, Ordering::SeqCst);
                Ok(())
            })
            .method("get", |counter: &Counter| Ok(counter.value.load(Ordering::SeqCst)))
            .static_method("zero", || Ok(0u32))
            .property("value", |counter: &Counter, Value(value): Value<u32>| {
                counter.value.store(value, Ordering::SeqCst);
                Ok(())
            })
            .build()
    }

    #[test]
    fn test_members() {
        let class = counter_class();

        assert_eq!(class.name(), "Counter");
        assert_eq!(class.constructors().len(), 2);
        assert_eq!(class.constructors()[1].parameter_types()[0], crate::any::TypeInfo::of::<u32>());
        assert_eq!(class.methods_named("get").count(), 1);
        assert!(class.methods_named("zero").all(|method| method.is_static()));
        assert_eq!(class.property_names().collect::<Vec<_>>(), ["value"]);
    }

    #[test]
    fn test_calls() {
        let class = counter_class();

        let counter = class.constructors()[1].call(None, Vec::from([Bean::new(5u32)])).unwrap().unwrap();
        assert!(class.is_instance(&counter));

        let increment = class.methods_named("increment").next().unwrap();
        assert!(increment.call(Some(counter.clone()), Vec::new()).unwrap().is_none());

        let get = class.methods_named("get").next().unwrap();
        let value = get.call(Some(counter.clone()), Vec::new()).unwrap().unwrap();
        assert_eq!(*value.downcast_ref::<u32>().unwrap(), 5);

        class.property("value").unwrap().set(counter.clone(), Bean::new(42u32)).unwrap();
        assert_eq!(counter.downcast_ref::<Counter>().unwrap().value.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_incompatible_target() {
        let class = counter_class();
        let get = class.methods_named("get").next().unwrap();

        assert!(get.call(Some(Bean::new(String::from("counter"))), Vec::new()).is_err());
        assert!(get.call(None, Vec::new()).is_err());
    }

    #[test]
    fn test_inject_argument() {
        struct Owner {
            counter: Arc<Counter>,
        }

        let class = Class::builder::<Owner>("Owner")
            .constructor(|Inject(counter): Inject<Counter>| Ok(Owner { counter }))
            .build();
        let counter = Bean::new(Counter {
            step: 2,
            value: AtomicU32::new(0),
        });

        let owner = class.constructors()[0].call(None, Vec::from([counter])).unwrap().unwrap();
        assert_eq!(owner.downcast_ref::<Owner>().unwrap().counter.step, 2);
    }
}
