use alloc::{
    string::{String, ToString as _},
    vec::Vec,
};
use core::fmt::{self, Display, Formatter};
use tracing::{debug_span, error, warn};

use super::{Invocation, Invokable};
use crate::{
    class::{Class, ClassDescription},
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    transaction::DependencyProvider,
    Bean,
};

/// Calls a method on a target instance or a static method on the target class.
///
/// The target is chosen in this order:
/// 1. the bean of the target dependency, if one is set;
/// 2. the target class, if the method is static;
/// 3. the target passed to [`Invokable::invoke`].
#[derive(Debug)]
pub struct MethodInvocation {
    method_name: String,
    is_static: bool,
    target_dependency: Option<Dependency>,
    invocation: Invocation,
}

impl MethodInvocation {
    /// # Errors
    /// Returns [`InjectionErrorKind::InvalidArgument`] for a static method without target class, or if parameter
    /// types are given for a different number of parameters.
    pub fn new(
        target_class: Option<ClassDescription>,
        method_name: impl Into<String>,
        is_static: bool,
        parameter_types: Option<Vec<Option<ClassDescription>>>,
        parameters: Vec<Dependency>,
    ) -> InjectionResult<Self> {
        if is_static && target_class.is_none() {
            let err = InjectionErrorKind::InvalidArgument {
                message: "Static method invocation requires a target class",
            };
            warn!("{}", err);
            return Err(err);
        }

        Ok(Self {
            method_name: method_name.into(),
            is_static,
            target_dependency: None,
            invocation: Invocation::new(target_class, parameter_types, parameters)?,
        })
    }

    /// Creates an invocation of an instance method on the target passed to [`Invokable::invoke`].
    #[inline]
    #[must_use]
    pub fn instance(method_name: impl Into<String>, parameters: Vec<Dependency>) -> Self {
        let parameter_types = parameters.iter().map(|_| None).collect();
        Self {
            method_name: method_name.into(),
            is_static: false,
            target_dependency: None,
            invocation: Invocation {
                target_class: None,
                parameter_types,
                parameters,
            },
        }
    }

    /// Calls the method on the bean of `target_dependency` instead of the passed target.
    #[inline]
    #[must_use]
    pub fn with_target_dependency(mut self, target_dependency: Dependency) -> Self {
        self.target_dependency = Some(target_dependency);
        self
    }

    #[inline]
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    #[must_use]
    pub const fn target_dependency(&self) -> Option<&Dependency> {
        self.target_dependency.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    fn call(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Option<Bean>> {
        if let Some(target_dependency) = &self.target_dependency {
            let target = dependency_provider.get_dependent_bean(target_dependency)?;
            return self.call_instance(dependency_provider, &target);
        }

        if self.is_static {
            let class_loader_provider = dependency_provider.class_loader_provider();
            let class = self.target_class(dependency_provider, None)?;
            let parameter_types = self.invocation.resolved_parameter_types(class_loader_provider)?;
            let arguments = self.invocation.resolved_parameters(dependency_provider)?;
            return dependency_provider
                .invocation_helper()
                .invoke_static_method(&class, &self.method_name, &parameter_types, arguments);
        }

        match target {
            Some(target) => self.call_instance(dependency_provider, target),
            None => Err(InjectionErrorKind::NoTarget {
                invocation: self.to_string(),
            }),
        }
    }

    fn call_instance(&self, dependency_provider: &dyn DependencyProvider, target: &Bean) -> InjectionResult<Option<Bean>> {
        let class = self.target_class(dependency_provider, Some(target))?;
        let parameter_types = self.invocation.resolved_parameter_types(dependency_provider.class_loader_provider())?;
        let arguments = self.invocation.resolved_parameters(dependency_provider)?;

        dependency_provider
            .invocation_helper()
            .invoke_instance_method(&class, &self.method_name, target, &parameter_types, arguments)
    }

    fn target_class(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Class> {
        let class_loader_provider = dependency_provider.class_loader_provider();
        if let Some(description) = self.invocation.target_class() {
            return description.target_class(class_loader_provider);
        }

        match target {
            Some(target) => class_loader_provider.class_of(target).ok_or_else(|| InjectionErrorKind::ClassNotFound {
                name: target.type_info().name.to_string(),
            }),
            None => Err(InjectionErrorKind::NoTarget {
                invocation: self.to_string(),
            }),
        }
    }
}

impl Invokable for MethodInvocation {
    /// The parameter dependencies followed by the target dependency, if set.
    fn parameter_dependencies(&self) -> Vec<Dependency> {
        let mut dependencies = self.invocation.parameters().to_vec();
        dependencies.extend(self.target_dependency.clone());
        dependencies
    }

    fn invoke(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Option<Bean>> {
        let span = debug_span!("invoke", invocation = %self);
        let _guard = span.enter();

        self.call(dependency_provider, target).inspect_err(|err| error!("{}", err))
    }
}

impl Display for MethodInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(target_dependency) = &self.target_dependency {
            write!(f, "{target_dependency}.")?;
        } else if let Some(target_class) = self.invocation.target_class() {
            let separator = if self.is_static { "::" } else { "." };
            write!(f, "{target_class}{separator}")?;
        }
        f.write_str(&self.method_name)?;
        self.invocation.fmt_parameters(f)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::MethodInvocation;
    use crate::{
        class::{Class, ClassDescription, Value},
        context::{BeanContext as _, DefaultBeanContext},
        dependency::Dependency,
        invocation::Invokable as _,
        provider::{ConstantBeanProvider, MethodInvocationBeanProvider},
        store::DefaultBeanStore,
        transaction::DefaultDependencyProvider,
        Bean, InjectionErrorKind,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec::Vec,
    };
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    struct Greeter {
        greeting: Mutex<String>,
    }

    fn greeter_class() -> Class {
        Class::builder::<Greeter>("Greeter")
            .method("greet", |greeter: &Greeter, Value(name): Value<String>| {
                Ok(format!("{} {name}", greeter.greeting.lock()))
            })
            .static_method("create", |Value(greeting): Value<String>| {
                Ok(Greeter {
                    greeting: Mutex::new(greeting),
                })
            })
            .build()
    }

    fn greeter(greeting: &str) -> Bean {
        Bean::new(Greeter {
            greeting: Mutex::new(String::from(greeting)),
        })
    }

    #[test]
    #[traced_test]
    fn test_static_requires_class() {
        assert!(matches!(
            MethodInvocation::new(None, "create", true, None, Vec::new()),
            Err(InjectionErrorKind::InvalidArgument { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_no_target() {
        let context = DefaultBeanContext::new(None);
        let dependency_provider = DefaultDependencyProvider::new(&context);
        let invocation = MethodInvocation::instance("greet", Vec::new());

        assert!(matches!(
            invocation.invoke(&dependency_provider, None),
            Err(InjectionErrorKind::NoTarget { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_target_precedence() {
        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("name", Arc::new(ConstantBeanProvider::new(Bean::new(String::from("Ada")))));
        store.add_bean_provider("greeting", Arc::new(ConstantBeanProvider::new(Bean::new(String::from("Hi")))));
        store.add_bean_provider("greeter", Arc::new(ConstantBeanProvider::new(greeter("Hello"))));

        let by_dependency = MethodInvocation::instance("greet", Vec::from([Dependency::name("name")]))
            .with_target_dependency(Dependency::name("greeter"));
        assert_eq!(
            by_dependency.parameter_dependencies(),
            [Dependency::name("name"), Dependency::name("greeter")]
        );
        assert_eq!(format!("{by_dependency}"), "Name(greeter).greet(Name(name))");
        store.add_bean_provider(
            "by_dependency",
            Arc::new(MethodInvocationBeanProvider::new(None, by_dependency)),
        );

        let created = MethodInvocation::new(
            Some(ClassDescription::named("Greeter", None)),
            "create",
            true,
            None,
            Vec::from([Dependency::name("greeting")]),
        )
        .unwrap();
        store.add_bean_provider("created", Arc::new(MethodInvocationBeanProvider::new(None, created)));

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context.register_class(greeter_class()).unwrap();

        let greeting = context.get_bean("by_dependency").unwrap();
        assert_eq!(greeting.downcast_ref::<String>().unwrap(), "Hello Ada");

        let created = context.get_bean("created").unwrap();
        assert_eq!(*created.downcast_ref::<Greeter>().unwrap().greeting.lock(), "Hi");
    }
}
