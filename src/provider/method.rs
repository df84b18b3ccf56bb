use alloc::collections::BTreeSet;
use tracing::warn;

use super::{BeanProvider, LockId, LockState};
use crate::{
    any::TypeInfo,
    class::ClassDescription,
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    invocation::{Invokable as _, MethodInvocation},
    transaction::DependencyProvider,
    Bean,
};

/// Calls a method to obtain a bean.
///
/// With a target dependency the method is called on the bean of that dependency and the provider returns this
/// target, for instance to run an initializer method. Without target the method result is the bean, as for static
/// factory methods.
///
/// The bean class is the declared one, or the target class of the invocation.
pub struct MethodInvocationBeanProvider {
    target: Option<Dependency>,
    invocation: MethodInvocation,
    bean_class: Option<ClassDescription>,
    lock: LockState,
}

impl MethodInvocationBeanProvider {
    #[inline]
    #[must_use]
    pub fn new(target: Option<Dependency>, invocation: MethodInvocation) -> Self {
        Self {
            target,
            invocation,
            bean_class: None,
            lock: LockState::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_bean_class(mut self, bean_class: ClassDescription) -> Self {
        self.bean_class = Some(bean_class);
        self
    }

    #[inline]
    #[must_use]
    pub fn bean_class_description(&self) -> Option<&ClassDescription> {
        self.bean_class.as_ref().or_else(|| self.invocation.invocation().target_class())
    }

    #[inline]
    #[must_use]
    pub const fn target(&self) -> Option<&Dependency> {
        self.target.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn invocation(&self) -> &MethodInvocation {
        &self.invocation
    }
}

impl BeanProvider for MethodInvocationBeanProvider {
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let target = self
            .target
            .as_ref()
            .map(|target| dependency_provider.get_dependent_bean(target))
            .transpose()?;
        let result = self.invocation.invoke(dependency_provider, target.as_ref())?;

        if let Some(target) = target {
            return Ok(target);
        }
        result.ok_or_else(|| {
            let err = InjectionErrorKind::NoBean {
                provider: alloc::format!("{}", self.invocation),
            };
            warn!("{}", err);
            err
        })
    }

    fn bean_class(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        let Some(description) = self.bean_class_description() else {
            return Err(InjectionErrorKind::UnknownBeanClass {
                provider: alloc::format!("{}", self.invocation),
            });
        };
        Ok(description.target_class(dependency_provider.class_loader_provider())?.type_info())
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        self.invocation
            .parameter_dependencies()
            .into_iter()
            .chain(self.target.clone())
            .collect()
    }

    fn lock_id(&self) -> Option<LockId> {
        self.lock.get()
    }

    fn set_lock_id(&self, lock_id: Option<LockId>) {
        self.lock.set(lock_id);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::MethodInvocationBeanProvider;
    use crate::{
        class::{Class, ClassDescription},
        context::{BeanContext as _, DefaultBeanContext},
        dependency::Dependency,
        invocation::MethodInvocation,
        provider::{BeanProvider as _, ConstantBeanProvider},
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
    use core::sync::atomic::{AtomicBool, Ordering};
    use tracing_test::traced_test;

    struct Service {
        started: AtomicBool,
    }

    #[test]
    #[traced_test]
    fn test_returns_target_or_result() {
        let class = Class::builder::<Service>("Service")
            .method("start", |service: &Service| {
                service.started.store(true, Ordering::SeqCst);
                Ok(())
            })
            .build();

        let service = Bean::new(Service {
            started: AtomicBool::new(false),
        });
        let started = MethodInvocationBeanProvider::new(
            Some(Dependency::name("service")),
            MethodInvocation::instance("start", Vec::new()),
        );
        assert_eq!(started.dependencies().len(), 1);

        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("service", Arc::new(ConstantBeanProvider::new(service.clone())));
        store.add_bean_provider("started", Arc::new(started));
        store.add_bean_provider(
            "nothing",
            Arc::new(MethodInvocationBeanProvider::new(
                None,
                MethodInvocation::instance("start", Vec::new()).with_target_dependency(Dependency::name("service")),
            )),
        );

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context.register_class(class).unwrap();

        assert!(context.get_bean("started").unwrap().ptr_eq(&service));
        assert!(service.downcast_ref::<Service>().unwrap().started.load(Ordering::SeqCst));
        assert!(matches!(context.get_bean("nothing"), Err(InjectionErrorKind::NoBean { .. })));
    }

    #[test]
    fn test_bean_class() {
        let context = DefaultBeanContext::new(None);
        context.register_class(Class::builder::<Service>("Service").build()).unwrap();
        let dependency_provider = DefaultDependencyProvider::new(&context);

        let factory = MethodInvocationBeanProvider::new(
            None,
            MethodInvocation::new(Some(ClassDescription::named("Service", None)), "create", true, None, Vec::new())
                .unwrap(),
        );
        assert!(factory.bean_class(&dependency_provider).unwrap().is::<Service>());

        let untyped = MethodInvocationBeanProvider::new(
            Some(Dependency::name("service")),
            MethodInvocation::instance("start", Vec::new()),
        );
        assert!(matches!(
            untyped.bean_class(&dependency_provider),
            Err(InjectionErrorKind::UnknownBeanClass { .. })
        ));
        let declared = untyped.with_bean_class(ClassDescription::named("Service", None));
        assert!(declared.bean_class(&dependency_provider).unwrap().is::<Service>());
    }
}
