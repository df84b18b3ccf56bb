use alloc::{
    string::{String, ToString as _},
    sync::Arc,
};
use core::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};
use tracing::{debug, warn};

use crate::{
    any::TypeInfo,
    errors::{InjectionErrorKind, InjectionResult},
    invocation::ChainVariable,
    provider::{BeanProvider, ConstantBeanProvider},
    store::BeanStore,
    transaction::DependencyProvider,
};

/// Reference to a bean provider by name, looked up along the parent chain of a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NameDependency {
    name: String,
}

impl NameDependency {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, store: Option<&dyn BeanStore>) -> InjectionResult<Arc<dyn BeanProvider>> {
        let Some(store) = store else {
            let err = InjectionErrorKind::UnresolvableName { name: self.name.clone() };
            warn!("{}", err);
            return Err(err);
        };

        match store.get_bean_provider(&self.name) {
            Some(provider) => {
                debug!(name = %self.name, store = store.name(), "Dependency resolved");
                Ok(provider)
            }
            None => self.resolve(store.parent().as_deref()),
        }
    }
}

/// Reference to the first bean provider creating beans of a class, looked up along the parent chain of a store.
///
/// Providers whose bean class cannot be determined are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassDependency {
    class: TypeInfo,
}

impl ClassDependency {
    #[inline]
    #[must_use]
    pub const fn new(class: TypeInfo) -> Self {
        Self { class }
    }

    #[inline]
    #[must_use]
    pub const fn class(&self) -> TypeInfo {
        self.class
    }

    fn resolve(
        &self,
        store: Option<&dyn BeanStore>,
        dependency_provider: &dyn DependencyProvider,
    ) -> InjectionResult<Arc<dyn BeanProvider>> {
        let Some(store) = store else {
            let err = InjectionErrorKind::UnresolvableClass { class: self.class.name };
            warn!("{}", err);
            return Err(err);
        };

        for name in store.provider_names() {
            let Some(provider) = store.get_bean_provider(&name) else {
                continue;
            };
            if provider
                .bean_class(dependency_provider)
                .is_ok_and(|class| class == self.class)
            {
                debug!(class = self.class.short_name(), name = %name, store = store.name(), "Dependency resolved");
                return Ok(provider);
            }
        }
        self.resolve(store.parent().as_deref(), dependency_provider)
    }
}

/// Describes what a bean provider, an invocation or a transaction needs.
///
/// Dependencies are totally ordered so they can be used as map keys.
/// Constant and variable dependencies compare by identity.
#[derive(Clone)]
pub enum Dependency {
    Name(NameDependency),
    Class(ClassDependency),
    Constant(Arc<ConstantBeanProvider>),
    Variable(Arc<ChainVariable>),
}

impl Dependency {
    #[inline]
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(NameDependency::new(name))
    }

    #[inline]
    #[must_use]
    pub const fn class(class: TypeInfo) -> Self {
        Self::Class(ClassDependency::new(class))
    }

    #[inline]
    #[must_use]
    pub fn constant(provider: ConstantBeanProvider) -> Self {
        Self::Constant(Arc::new(provider))
    }

    /// Resolves the bean provider satisfying this dependency.
    ///
    /// Name and class dependencies are looked up in `store` and its parents. Constant and variable dependencies are
    /// their own providers and need no store.
    ///
    /// # Errors
    /// Returns [`InjectionErrorKind::UnresolvableName`] or [`InjectionErrorKind::UnresolvableClass`] if no store on
    /// the parent chain has a matching provider.
    pub fn resolve(
        &self,
        store: Option<&dyn BeanStore>,
        dependency_provider: &dyn DependencyProvider,
    ) -> InjectionResult<Arc<dyn BeanProvider>> {
        match self {
            Self::Name(dependency) => dependency.resolve(store),
            Self::Class(dependency) => dependency.resolve(store, dependency_provider),
            Self::Constant(provider) => Ok(provider.clone()),
            Self::Variable(variable) => Ok(variable.clone()),
        }
    }

    /// Returns `true` for dependencies that can be resolved without a bean store.
    #[inline]
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Constant(_) | Self::Variable(_))
    }

    const fn variant_index(&self) -> u8 {
        match self {
            Self::Name(_) => 0,
            Self::Class(_) => 1,
            Self::Constant(_) => 2,
            Self::Variable(_) => 3,
        }
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Dependency {}

impl PartialOrd for Dependency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dependency {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Name(left), Self::Name(right)) => left.cmp(right),
            (Self::Class(left), Self::Class(right)) => left.cmp(right),
            (Self::Constant(left), Self::Constant(right)) => Arc::as_ptr(left).cmp(&Arc::as_ptr(right)),
            (Self::Variable(left), Self::Variable(right)) => Arc::as_ptr(left).cmp(&Arc::as_ptr(right)),
            _ => self.variant_index().cmp(&other.variant_index()),
        }
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(dependency) => write!(f, "Name({})", dependency.name),
            Self::Class(dependency) => write!(f, "Class({})", dependency.class.short_name()),
            Self::Constant(provider) => write!(f, "Constant({provider})"),
            Self::Variable(variable) => write!(f, "Variable({})", variable.name()),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<NameDependency> for Dependency {
    fn from(dependency: NameDependency) -> Self {
        Self::Name(dependency)
    }
}

impl From<ClassDependency> for Dependency {
    fn from(dependency: ClassDependency) -> Self {
        Self::Class(dependency)
    }
}

impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        Self::name(name.to_string())
    }
}
