use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    vec::Vec,
};
use tracing::{debug, warn};

use super::{BeanProvider, LockId, LockState};
use crate::{
    any::TypeInfo,
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    transaction::DependencyProvider,
    Bean,
};

/// Provides a map from the beans of key dependencies to the beans of value dependencies.
///
/// Keys are converted to `String` with the conversion helper of the transaction. An ordered map is a
/// `Vec<(String, Bean)>` in the order of the key dependencies, any other map a `BTreeMap<String, Bean>`. A repeated
/// key replaces the value of the earlier entry.
pub struct MapBeanProvider {
    keys: Vec<Dependency>,
    values: Vec<Dependency>,
    ordered: bool,
    lock: LockState,
}

impl MapBeanProvider {
    /// # Errors
    /// Returns [`InjectionErrorKind::InvalidArgument`] if the number of keys and values differ.
    pub fn new(keys: Vec<Dependency>, values: Vec<Dependency>, ordered: bool) -> InjectionResult<Self> {
        if keys.len() != values.len() {
            let err = InjectionErrorKind::InvalidArgument {
                message: "Different number of key and value dependencies",
            };
            warn!("{}", err);
            return Err(err);
        }

        Ok(Self {
            keys,
            values,
            ordered,
            lock: LockState::default(),
        })
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Dependency] {
        &self.keys
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Dependency] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    fn entries(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Vec<(String, Bean)>> {
        let invocation_helper = dependency_provider.invocation_helper();
        let conversion_helper = invocation_helper.conversion_helper();
        let mut entries: Vec<(String, Bean)> = Vec::with_capacity(self.keys.len());

        for (key, value) in self.keys.iter().zip(&self.values) {
            let key = conversion_helper.convert_to::<String>(dependency_provider.get_dependent_bean(key)?)?;
            let value = dependency_provider.get_dependent_bean(value)?;

            match entries.iter_mut().find(|(known, _)| *known == *key) {
                Some(entry) => entry.1 = value,
                None => entries.push(((*key).clone(), value)),
            }
        }
        Ok(entries)
    }
}

impl BeanProvider for MapBeanProvider {
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let entries = self.entries(dependency_provider)?;
        debug!(len = entries.len(), ordered = self.ordered, "Map created");

        if self.ordered {
            return Ok(Bean::new(entries));
        }
        Ok(Bean::new(entries.into_iter().collect::<BTreeMap<_, _>>()))
    }

    fn bean_class(&self, _dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        if self.ordered {
            return Ok(TypeInfo::of::<Vec<(String, Bean)>>());
        }
        Ok(TypeInfo::of::<BTreeMap<String, Bean>>())
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        self.keys.iter().chain(&self.values).cloned().collect()
    }

    fn lock_id(&self) -> Option<LockId> {
        self.lock.get()
    }

    fn set_lock_id(&self, lock_id: Option<LockId>) {
        self.lock.set(lock_id);
    }
}
