use alloc::collections::BTreeSet;

use super::{BeanProvider, LockId, LockState};
use crate::{
    any::TypeInfo,
    dependency::Dependency,
    errors::InjectionResult,
    invocation::{ConstructorInvocation, Invokable as _},
    transaction::DependencyProvider,
    Bean,
};

/// Creates a new bean with a constructor invocation on every request.
///
/// Wrap it into a [`super::SingletonBeanProvider`] to create the bean only once.
pub struct ConstructorBeanProvider {
    invocation: ConstructorInvocation,
    lock: LockState,
}

impl ConstructorBeanProvider {
    #[inline]
    #[must_use]
    pub fn new(invocation: ConstructorInvocation) -> Self {
        Self {
            invocation,
            lock: LockState::default(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn invocation(&self) -> &ConstructorInvocation {
        &self.invocation
    }
}

impl BeanProvider for ConstructorBeanProvider {
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        self.invocation.create(dependency_provider)
    }

    fn bean_class(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        let class = self
            .invocation
            .target_class()
            .target_class(dependency_provider.class_loader_provider())?;
        Ok(class.type_info())
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        self.invocation.parameter_dependencies().into_iter().collect()
    }

    fn lock_id(&self) -> Option<LockId> {
        self.lock.get()
    }

    fn set_lock_id(&self, lock_id: Option<LockId>) {
        self.lock.set(lock_id);
    }
}
