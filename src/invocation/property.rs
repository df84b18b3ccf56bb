use alloc::{
    string::{String, ToString as _},
    vec::Vec,
};
use core::fmt::{self, Display, Formatter};
use tracing::{debug_span, error};

use super::{Invocation, Invokable};
use crate::{
    class::ClassDescription,
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    transaction::DependencyProvider,
    Bean,
};

/// Sets a property of the target instance to the bean of a dependency.
#[derive(Debug)]
pub struct SetPropertyInvocation {
    property_name: String,
    invocation: Invocation,
}

impl SetPropertyInvocation {
    /// Creates an invocation setting `property_name`. If `value_class` is given, the value is converted to it before
    /// it is passed to the setter.
    #[must_use]
    pub fn new(property_name: impl Into<String>, value: Dependency, value_class: Option<ClassDescription>) -> Self {
        Self {
            property_name: property_name.into(),
            invocation: Invocation {
                target_class: None,
                parameter_types: Vec::from([value_class]),
                parameters: Vec::from([value]),
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    #[inline]
    #[must_use]
    pub fn value_dependency(&self) -> &Dependency {
        &self.invocation.parameters()[0]
    }

    fn set(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<()> {
        let Some(target) = target else {
            return Err(InjectionErrorKind::MissingTarget {
                property: self.property_name.clone(),
            });
        };

        let class_loader_provider = dependency_provider.class_loader_provider();
        let class = class_loader_provider
            .class_of(target)
            .ok_or_else(|| InjectionErrorKind::ClassNotFound {
                name: target.type_info().name.to_string(),
            })?;

        let invocation_helper = dependency_provider.invocation_helper();
        let mut value = dependency_provider.get_dependent_bean(self.value_dependency())?;
        if let Some(Some(value_type)) = self.invocation.resolved_parameter_types(class_loader_provider)?.first() {
            value = invocation_helper.conversion_helper().convert(*value_type, value)?;
        }

        invocation_helper.set_property(&class, target, &self.property_name, value)
    }
}

impl Invokable for SetPropertyInvocation {
    fn parameter_dependencies(&self) -> Vec<Dependency> {
        self.invocation.parameters().to_vec()
    }

    /// Sets the property and returns no value.
    fn invoke(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Option<Bean>> {
        let span = debug_span!("set_property", invocation = %self);
        let _guard = span.enter();

        self.set(dependency_provider, target)
            .map(|()| None)
            .inspect_err(|err| error!("{}", err))
    }
}

impl Display for SetPropertyInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.property_name)?;
        self.invocation.fmt_parameters(f)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::SetPropertyInvocation;
    use crate::{
        class::{Class, ClassDescription, Value},
        context::{BeanContext as _, DefaultBeanContext},
        dependency::Dependency,
        invocation::{ChainedInvocation, Invokable as _},
        provider::{ConstantBeanProvider, ConstructorBeanProvider, SingletonBeanProvider},
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

    struct Window {
        width: Mutex<u16>,
    }

    #[test]
    #[traced_test]
    fn test_missing_target() {
        let context = DefaultBeanContext::new(None);
        let dependency_provider = DefaultDependencyProvider::new(&context);
        let invocation = SetPropertyInvocation::new("width", Dependency::name("width"), None);

        let err = invocation.invoke(&dependency_provider, None).unwrap_err();
        assert!(matches!(&err, InjectionErrorKind::MissingTarget { property } if property == "width"));
        assert!(err.to_string().contains("width"));
    }

    #[test]
    #[traced_test]
    fn test_set_property() {
        let window_class = Class::builder::<Window>("Window")
            .constructor(|| Ok(Window { width: Mutex::new(0) }))
            .property("width", |window: &Window, Value(width): Value<u16>| {
                *window.width.lock() = width;
                Ok(())
            })
            .build();

        let mut initializer = ChainedInvocation::new();
        initializer.add_invokable(SetPropertyInvocation::new(
            "width",
            Dependency::name("width"),
            Some(ClassDescription::named("u16", None)),
        ));

        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("width", Arc::new(ConstantBeanProvider::new(Bean::new(String::from("640")))));
        store.add_bean_provider(
            "window",
            SingletonBeanProvider::new(
                Arc::new(ConstructorBeanProvider::new(
                    crate::invocation::ConstructorInvocation::new(ClassDescription::named("Window", None), None, Vec::new())
                        .unwrap(),
                )),
                Some(Arc::new(initializer)),
                None,
            ),
        );

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context.register_class(window_class).unwrap();

        let window = context.get_bean("window").unwrap();
        assert_eq!(*window.downcast_ref::<Window>().unwrap().width.lock(), 640);
        assert_eq!(
            format!("{}", SetPropertyInvocation::new("width", Dependency::name("w"), None)),
            "width = (Name(w))"
        );
    }
}
