mod combined;
mod default;
mod simple;

pub use combined::CombinedBeanStore;
pub use default::{DefaultBeanStore, ANONYMOUS_BEAN_PREFIX};
pub use simple::{BeanContributor, SimpleBeanStore};

use alloc::{collections::BTreeSet, string::String, sync::Arc};
use tracing::debug;

use crate::{conversion::ConversionHelper, provider::BeanProvider};

/// Named registry of bean providers.
///
/// Stores form a hierarchy: a name that is not found in a store is looked up in its parent.
pub trait BeanStore: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the provider registered under `name` in this store only.
    fn get_bean_provider(&self, name: &str) -> Option<Arc<dyn BeanProvider>>;

    fn provider_names(&self) -> BTreeSet<String>;

    fn parent(&self) -> Option<Arc<dyn BeanStore>>;

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        None
    }
}

/// Returns the first conversion helper found in `store` or its parents.
///
/// If no store in the hierarchy defines one and `create_if_necessary` is set, a new helper with the default
/// converters is returned.
#[must_use]
pub fn fetch_conversion_helper(store: &dyn BeanStore, create_if_necessary: bool) -> Option<Arc<ConversionHelper>> {
    if let Some(helper) = store.conversion_helper() {
        return Some(helper);
    }

    let mut current = store.parent();
    while let Some(store) = current {
        if let Some(helper) = store.conversion_helper() {
            return Some(helper);
        }
        current = store.parent();
    }

    if create_if_necessary {
        debug!("No conversion helper in store hierarchy, using default one");
        return Some(Arc::new(ConversionHelper::new()));
    }
    None
}

/// Returns `true` if both stores are the same object.
#[inline]
pub(crate) fn same_store(left: &Arc<dyn BeanStore>, right: &Arc<dyn BeanStore>) -> bool {
    core::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

#[cfg(test)]
mod tests {
    use super::{fetch_conversion_helper, BeanStore as _, DefaultBeanStore};
    use crate::conversion::ConversionHelper;

    use alloc::sync::Arc;

    #[test]
    fn test_fetch_conversion_helper() {
        let helper = Arc::new(ConversionHelper::new());
        let mut root = DefaultBeanStore::new("root");
        root.set_conversion_helper(Some(helper.clone()));
        let mut child = DefaultBeanStore::new("child");
        child.set_parent(Some(Arc::new(root)));

        assert!(child.conversion_helper().is_none());
        assert!(Arc::ptr_eq(&fetch_conversion_helper(&child, false).unwrap(), &helper));
    }

    #[test]
    fn test_fetch_conversion_helper_create() {
        let store = DefaultBeanStore::new("root");

        assert!(fetch_conversion_helper(&store, false).is_none());
        assert!(fetch_conversion_helper(&store, true).is_some());
    }
}
