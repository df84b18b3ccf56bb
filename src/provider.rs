mod collection;
mod constant;
mod constructor;
mod map;
mod method;
mod singleton;

pub use collection::{CollectionBeanProvider, CollectionKind};
pub use constant::ConstantBeanProvider;
pub use constructor::ConstructorBeanProvider;
pub use map::MapBeanProvider;
pub use method::MethodInvocationBeanProvider;
pub use singleton::SingletonBeanProvider;

use alloc::collections::BTreeSet;
use core::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};
use parking_lot::Mutex;

use crate::{any::TypeInfo, dependency::Dependency, errors::InjectionResult, transaction::DependencyProvider, Bean};

static LOCK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of the transaction holding the lock on a bean provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(u64);

impl LockId {
    /// Returns a new process-wide unique id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(LOCK_ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for LockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Produces a bean on demand.
///
/// A provider declares the dependencies it needs itself, without the dependencies of those dependencies.
/// While a transaction uses a provider, the provider carries the lock id of that transaction.
pub trait BeanProvider: Send + Sync {
    /// # Errors
    /// Returns an error if the bean cannot be created.
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean>;

    /// Returns the type of the beans created by this provider, without creating one.
    ///
    /// # Errors
    /// Returns an error if the class cannot be loaded or is not known before the bean is created.
    fn bean_class(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo>;

    fn dependencies(&self) -> BTreeSet<Dependency>;

    fn lock_id(&self) -> Option<LockId>;

    fn set_lock_id(&self, lock_id: Option<LockId>);

    /// Returns `false` while the bean is being created and cannot be handed out yet.
    fn is_bean_available(&self) -> bool {
        true
    }

    /// Releases the bean when its context is closed.
    ///
    /// # Errors
    /// Returns an error if a shutdown handler fails.
    fn shutdown(&self, _dependency_provider: &dyn DependencyProvider) -> InjectionResult<()> {
        Ok(())
    }
}

/// Lock id storage shared by the bean provider implementations.
#[derive(Debug, Default)]
pub(crate) struct LockState(Mutex<Option<LockId>>);

impl LockState {
    #[inline]
    pub(crate) fn get(&self) -> Option<LockId> {
        *self.0.lock()
    }

    #[inline]
    pub(crate) fn set(&self, lock_id: Option<LockId>) {
        *self.0.lock() = lock_id;
    }
}
