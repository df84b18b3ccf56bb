use alloc::collections::BTreeSet;
use core::fmt::{self, Display, Formatter};
use parking_lot::Mutex;
use tracing::debug;

use super::{BeanProvider, LockId};
use crate::{
    any::TypeInfo,
    class::ClassDescription,
    dependency::Dependency,
    errors::InjectionResult,
    transaction::DependencyProvider,
    Bean,
};

/// Provides a fixed value, optionally converted to a declared class on first access.
///
/// A constant provider is never locked, so it can be shared by any number of transactions.
pub struct ConstantBeanProvider {
    value: Bean,
    value_class: Option<ClassDescription>,
    converted: Mutex<Option<Bean>>,
}

impl ConstantBeanProvider {
    #[inline]
    #[must_use]
    pub fn new(value: Bean) -> Self {
        Self {
            value,
            value_class: None,
            converted: Mutex::new(None),
        }
    }

    /// Creates a provider converting `value` to `value_class` with the conversion helper of the first transaction.
    #[inline]
    #[must_use]
    pub fn with_class(value: Bean, value_class: ClassDescription) -> Self {
        Self {
            value,
            value_class: Some(value_class),
            converted: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub const fn value(&self) -> &Bean {
        &self.value
    }

    #[inline]
    #[must_use]
    pub const fn value_class(&self) -> Option<&ClassDescription> {
        self.value_class.as_ref()
    }
}

impl BeanProvider for ConstantBeanProvider {
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let Some(value_class) = &self.value_class else {
            return Ok(self.value.clone());
        };

        if let Some(converted) = self.converted.lock().as_ref() {
            return Ok(converted.clone());
        }

        let class = value_class.target_class(dependency_provider.class_loader_provider())?;
        let converted = dependency_provider
            .invocation_helper()
            .conversion_helper()
            .convert(class.type_info(), self.value.clone())?;
        debug!(class = class.name(), "Constant converted");

        Ok(self.converted.lock().get_or_insert(converted).clone())
    }

    fn bean_class(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        match &self.value_class {
            Some(value_class) => Ok(value_class
                .target_class(dependency_provider.class_loader_provider())?
                .type_info()),
            None => Ok(self.value.type_info()),
        }
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        BTreeSet::new()
    }

    fn lock_id(&self) -> Option<LockId> {
        None
    }

    fn set_lock_id(&self, _lock_id: Option<LockId>) {}
}

impl Display for ConstantBeanProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.value_class {
            Some(value_class) => write!(f, "{} as {value_class}", self.value.type_info().short_name()),
            None => f.write_str(self.value.type_info().short_name()),
        }
    }
}
