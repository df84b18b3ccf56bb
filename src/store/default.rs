use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
    sync::Arc,
};
use core::fmt::{self, Debug, Formatter};
use tracing::debug;

use super::BeanStore;
use crate::{conversion::ConversionHelper, provider::BeanProvider};

/// Name prefix of providers registered with [`DefaultBeanStore::add_anonymous_bean_provider`].
pub const ANONYMOUS_BEAN_PREFIX: &str = "beanwire.anonymousBean_";

/// Bean store filled during a build phase.
///
/// The store can only be changed through `&mut self`; once it is shared it is read-only.
#[derive(Default)]
pub struct DefaultBeanStore {
    name: String,
    parent: Option<Arc<dyn BeanStore>>,
    providers: BTreeMap<String, Arc<dyn BeanProvider>>,
    anonymous_count: usize,
    conversion_helper: Option<Arc<ConversionHelper>>,
}

impl DefaultBeanStore {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_parent(name: impl Into<String>, parent: Arc<dyn BeanStore>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Registers `provider` under `name` and returns the provider it replaces.
    pub fn add_bean_provider(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn BeanProvider>,
    ) -> Option<Arc<dyn BeanProvider>> {
        let name = name.into();
        debug!(store = %self.name, name = %name, "Bean provider added");
        self.providers.insert(name, provider)
    }

    /// Registers a provider under a generated name.
    ///
    /// Anonymous providers can be looked up by the returned name but are not part of
    /// [`BeanStore::provider_names`].
    pub fn add_anonymous_bean_provider(&mut self, provider: Arc<dyn BeanProvider>) -> String {
        let name = format!("{ANONYMOUS_BEAN_PREFIX}{}", self.anonymous_count);
        self.anonymous_count += 1;
        self.providers.insert(name.clone(), provider);
        name
    }

    pub fn remove_bean_provider(&mut self, name: &str) -> Option<Arc<dyn BeanProvider>> {
        self.providers.remove(name)
    }

    /// Removes all providers, named and anonymous.
    pub fn clear(&mut self) {
        self.providers.clear();
        self.anonymous_count = 0;
    }

    #[inline]
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn set_parent(&mut self, parent: Option<Arc<dyn BeanStore>>) {
        self.parent = parent;
    }

    #[inline]
    pub fn set_conversion_helper(&mut self, conversion_helper: Option<Arc<ConversionHelper>>) {
        self.conversion_helper = conversion_helper;
    }
}

impl BeanStore for DefaultBeanStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_bean_provider(&self, name: &str) -> Option<Arc<dyn BeanProvider>> {
        self.providers.get(name).cloned()
    }

    fn provider_names(&self) -> BTreeSet<String> {
        self.providers
            .keys()
            .filter(|name| !name.starts_with(ANONYMOUS_BEAN_PREFIX))
            .cloned()
            .collect()
    }

    fn parent(&self) -> Option<Arc<dyn BeanStore>> {
        self.parent.clone()
    }

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        self.conversion_helper.clone()
    }
}

impl Debug for DefaultBeanStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultBeanStore")
            .field("name", &self.name)
            .field("providers", &self.providers.keys())
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{DefaultBeanStore, ANONYMOUS_BEAN_PREFIX};
    use crate::{
        provider::{BeanProvider, ConstantBeanProvider},
        store::BeanStore as _,
        Bean,
    };

    use alloc::{string::String, sync::Arc, vec::Vec};

    fn constant(value: u8) -> Arc<dyn BeanProvider> {
        Arc::new(ConstantBeanProvider::new(Bean::new(value)))
    }

    #[test]
    fn test_add_and_replace() {
        let mut store = DefaultBeanStore::new("root");
        let first = constant(1);

        assert!(store.add_bean_provider("a", first.clone()).is_none());
        assert!(Arc::ptr_eq(&store.add_bean_provider("a", constant(2)).unwrap(), &first));
        assert!(store.get_bean_provider("a").is_some());
        assert!(store.get_bean_provider("b").is_none());
    }

    #[test]
    fn test_anonymous_providers_are_hidden() {
        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("named", constant(1));
        let first = store.add_anonymous_bean_provider(constant(2));
        let second = store.add_anonymous_bean_provider(constant(3));

        assert_eq!(first, String::from(ANONYMOUS_BEAN_PREFIX) + "0");
        assert_eq!(second, String::from(ANONYMOUS_BEAN_PREFIX) + "1");
        assert!(store.get_bean_provider(&second).is_some());
        assert_eq!(store.provider_names().into_iter().collect::<Vec<_>>(), ["named"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("a", constant(1));
        store.add_bean_provider("b", constant(2));
        store.add_anonymous_bean_provider(constant(3));

        assert!(store.remove_bean_provider("a").is_some());
        assert!(store.remove_bean_provider("a").is_none());

        store.clear();
        assert!(store.provider_names().is_empty());
        assert_eq!(
            store.add_anonymous_bean_provider(constant(4)),
            String::from(ANONYMOUS_BEAN_PREFIX) + "0"
        );
    }

    #[test]
    fn test_parent_is_not_searched() {
        let mut parent = DefaultBeanStore::new("parent");
        parent.add_bean_provider("a", constant(1));
        let child = DefaultBeanStore::with_parent("child", Arc::new(parent));

        assert!(child.get_bean_provider("a").is_none());
        assert_eq!(child.parent().unwrap().name(), "parent");
    }
}
