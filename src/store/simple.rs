use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    sync::Arc,
    vec::Vec,
};

use super::BeanStore;
use crate::{
    conversion::ConversionHelper,
    provider::{BeanProvider, ConstantBeanProvider},
    Bean,
};

/// Supplies beans to a [`SimpleBeanStore`] on demand.
pub trait BeanContributor: Send + Sync {
    /// Adds the names of the contributed beans to `names`.
    fn bean_names(&self, names: &mut BTreeSet<String>);

    fn bean(&self, name: &str) -> Option<Bean>;
}

/// Bean store holding plain bean values.
///
/// Beans added directly take precedence over the beans of contributors, which are asked in registration order.
/// Every bean is handed out through a [`ConstantBeanProvider`].
#[derive(Default)]
pub struct SimpleBeanStore {
    name: String,
    parent: Option<Arc<dyn BeanStore>>,
    beans: BTreeMap<String, Bean>,
    contributors: Vec<Arc<dyn BeanContributor>>,
    conversion_helper: Option<Arc<ConversionHelper>>,
}

impl SimpleBeanStore {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<Arc<dyn BeanStore>>) -> Self {
        Self {
            name: name.into(),
            parent,
            ..Self::default()
        }
    }

    pub fn add_bean(&mut self, name: impl Into<String>, bean: Bean) {
        self.beans.insert(name.into(), bean);
    }

    pub fn remove_bean(&mut self, name: &str) -> Option<Bean> {
        self.beans.remove(name)
    }

    /// Adds a contributor unless the same contributor is already registered.
    pub fn add_bean_contributor(&mut self, contributor: Arc<dyn BeanContributor>) {
        if !self.contributors.iter().any(|known| Arc::ptr_eq(known, &contributor)) {
            self.contributors.push(contributor);
        }
    }

    pub fn remove_bean_contributor(&mut self, contributor: &Arc<dyn BeanContributor>) {
        self.contributors.retain(|known| !Arc::ptr_eq(known, contributor));
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

impl BeanStore for SimpleBeanStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_bean_provider(&self, name: &str) -> Option<Arc<dyn BeanProvider>> {
        let bean = self
            .beans
            .get(name)
            .cloned()
            .or_else(|| self.contributors.iter().find_map(|contributor| contributor.bean(name)))?;

        Some(Arc::new(ConstantBeanProvider::new(bean)))
    }

    fn provider_names(&self) -> BTreeSet<String> {
        let mut names = self.beans.keys().cloned().collect();
        for contributor in &self.contributors {
            contributor.bean_names(&mut names);
        }
        names
    }

    fn parent(&self) -> Option<Arc<dyn BeanStore>> {
        self.parent.clone()
    }

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        self.conversion_helper.clone()
    }
}
