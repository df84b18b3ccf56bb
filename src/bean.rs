use alloc::sync::Arc;
use core::{
    any::Any,
    fmt::{self, Debug, Formatter},
};

use crate::any::TypeInfo;

/// A type-erased, shared bean instance.
///
/// Cloning a bean is cheap and yields the same instance, see [`Bean::ptr_eq`].
/// Beans that are wired after creation (property setters, initializer methods) need interior mutability,
/// because a bean is never handed out mutably.
#[derive(Clone)]
pub struct Bean {
    value: Arc<dyn Any + Send + Sync>,
    type_info: TypeInfo,
}

impl Bean {
    #[inline]
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    #[inline]
    #[must_use]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            type_info: TypeInfo::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_info.is::<T>()
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    #[inline]
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast().ok()
    }

    /// Returns `true` if both beans are the same instance.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.value).cast::<()>() == Arc::as_ptr(&other.value).cast::<()>()
    }
}

impl Debug for Bean {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Bean({})", self.type_info.short_name())
    }
}
