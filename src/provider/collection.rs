use alloc::{collections::BTreeSet, vec::Vec};
use tracing::debug;

use super::{BeanProvider, LockId, LockState};
use crate::{any::TypeInfo, dependency::Dependency, errors::InjectionResult, transaction::DependencyProvider, Bean};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionKind {
    /// Every element bean, in order.
    #[default]
    List,
    /// Every element bean instance once, in the order of first occurrence.
    Set,
}

/// Provides a `Vec<Bean>` with the beans of its element dependencies.
pub struct CollectionBeanProvider {
    elements: Vec<Dependency>,
    kind: CollectionKind,
    lock: LockState,
}

impl CollectionBeanProvider {
    /// Creates a list provider.
    #[inline]
    #[must_use]
    pub fn new(elements: Vec<Dependency>) -> Self {
        Self::with_kind(elements, CollectionKind::List)
    }

    #[inline]
    #[must_use]
    pub fn with_kind(elements: Vec<Dependency>, kind: CollectionKind) -> Self {
        Self {
            elements,
            kind,
            lock: LockState::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[Dependency] {
        &self.elements
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> CollectionKind {
        self.kind
    }
}

impl BeanProvider for CollectionBeanProvider {
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let mut beans = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            let bean = dependency_provider.get_dependent_bean(element)?;
            if self.kind == CollectionKind::Set && beans.iter().any(|known: &Bean| known.ptr_eq(&bean)) {
                continue;
            }
            beans.push(bean);
        }
        debug!(len = beans.len(), kind = ?self.kind, "Collection created");

        Ok(Bean::new(beans))
    }

    fn bean_class(&self, _dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        Ok(TypeInfo::of::<Vec<Bean>>())
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        self.elements.iter().cloned().collect()
    }

    fn lock_id(&self) -> Option<LockId> {
        self.lock.get()
    }

    fn set_lock_id(&self, lock_id: Option<LockId>) {
        self.lock.set(lock_id);
    }
}
