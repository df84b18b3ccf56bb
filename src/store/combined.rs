use alloc::{
    collections::BTreeSet,
    format,
    string::String,
    sync::Arc,
    vec::Vec,
};
use core::{
    fmt::{self, Debug, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};

use super::{same_store, BeanStore};
use crate::{conversion::ConversionHelper, provider::BeanProvider};

static COMBINED_STORE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Presents several bean stores as one.
///
/// Providers are looked up in the child stores in order. The parent of the combined store is derived from the
/// parents of its children: no parent if none has one, the common parent if they all share the same one, and a
/// combined store over all distinct parents otherwise.
pub struct CombinedBeanStore {
    name: String,
    children: Vec<Arc<dyn BeanStore>>,
}

impl CombinedBeanStore {
    /// Creates a combined store with a generated name.
    #[must_use]
    pub fn new(children: Vec<Arc<dyn BeanStore>>) -> Self {
        let index = COMBINED_STORE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::with_name(format!("beanwire.CombinedBeanStore_{index}"), children)
    }

    #[inline]
    #[must_use]
    pub fn with_name(name: impl Into<String>, children: Vec<Arc<dyn BeanStore>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn BeanStore>] {
        &self.children
    }
}

impl BeanStore for CombinedBeanStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_bean_provider(&self, name: &str) -> Option<Arc<dyn BeanProvider>> {
        self.children.iter().find_map(|child| child.get_bean_provider(name))
    }

    fn provider_names(&self) -> BTreeSet<String> {
        self.children.iter().flat_map(|child| child.provider_names()).collect()
    }

    fn parent(&self) -> Option<Arc<dyn BeanStore>> {
        let mut parents: Vec<Arc<dyn BeanStore>> = Vec::new();
        for parent in self.children.iter().filter_map(|child| child.parent()) {
            if !parents.iter().any(|known| same_store(known, &parent)) {
                parents.push(parent);
            }
        }

        match parents.len() {
            0 => None,
            1 => parents.pop(),
            _ => Some(Arc::new(CombinedBeanStore::new(parents))),
        }
    }

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        self.children.iter().find_map(|child| child.conversion_helper())
    }
}

impl Debug for CombinedBeanStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedBeanStore")
            .field("name", &self.name)
            .field("children", &self.children.iter().map(|child| child.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::CombinedBeanStore;
    use crate::{
        conversion::ConversionHelper,
        provider::{BeanProvider, ConstantBeanProvider},
        store::{same_store, BeanStore, DefaultBeanStore},
        Bean,
    };

    use alloc::{sync::Arc, vec::Vec};

    fn constant(value: u8) -> Arc<dyn BeanProvider> {
        Arc::new(ConstantBeanProvider::new(Bean::new(value)))
    }

    fn store(name: &str, parent: Option<Arc<dyn BeanStore>>, beans: &[&str]) -> Arc<dyn BeanStore> {
        let mut store = DefaultBeanStore::new(name);
        store.set_parent(parent);
        for (index, bean) in beans.iter().enumerate() {
            store.add_bean_provider(*bean, constant(index as u8));
        }
        Arc::new(store)
    }

    #[test]
    fn test_lookup_in_order() {
        let first = store("first", None, &["a", "b"]);
        let second = store("second", None, &["b", "c"]);
        let combined = CombinedBeanStore::new(Vec::from([first.clone(), second.clone()]));

        assert!(Arc::ptr_eq(
            &combined.get_bean_provider("b").unwrap(),
            &first.get_bean_provider("b").unwrap()
        ));
        assert!(combined.get_bean_provider("c").is_some());
        assert!(combined.get_bean_provider("d").is_none());
        assert_eq!(combined.provider_names().into_iter().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn test_generated_names_are_unique() {
        let first = CombinedBeanStore::new(Vec::new());
        let second = CombinedBeanStore::new(Vec::new());

        assert!(first.name().starts_with("beanwire.CombinedBeanStore_"));
        assert_ne!(first.name(), second.name());
        assert_eq!(CombinedBeanStore::with_name("named", Vec::new()).name(), "named");
    }

    #[test]
    fn test_parent_flattening() {
        let parent_1 = store("parent_1", None, &["x"]);
        let parent_2 = store("parent_2", None, &["y"]);

        let without_parents = CombinedBeanStore::new(Vec::from([store("a", None, &[]), store("b", None, &[])]));
        assert!(without_parents.parent().is_none());

        let shared = CombinedBeanStore::new(Vec::from([
            store("a", Some(parent_1.clone()), &[]),
            store("b", None, &[]),
            store("c", Some(parent_1.clone()), &[]),
        ]));
        assert!(same_store(&shared.parent().unwrap(), &parent_1));

        let distinct = CombinedBeanStore::new(Vec::from([
            store("a", Some(parent_1.clone()), &[]),
            store("b", Some(parent_2.clone()), &[]),
            store("c", Some(parent_1), &[]),
        ]));
        let parent = distinct.parent().unwrap();
        assert!(parent.get_bean_provider("x").is_some());
        assert!(parent.get_bean_provider("y").is_some());
        assert_eq!(parent.provider_names().len(), 2);
        assert!(parent.parent().is_none());
    }

    #[test]
    fn test_first_conversion_helper() {
        let helper = Arc::new(ConversionHelper::new());
        let mut with_helper = DefaultBeanStore::new("helper");
        with_helper.set_conversion_helper(Some(helper.clone()));

        let combined = CombinedBeanStore::new(Vec::from([store("a", None, &[]), Arc::new(with_helper) as Arc<dyn BeanStore>]));
        assert!(Arc::ptr_eq(&combined.conversion_helper().unwrap(), &helper));
    }
}
