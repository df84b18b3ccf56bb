use alloc::{
    collections::BTreeSet,
    string::String,
    sync::{Arc, Weak},
};
use parking_lot::RwLock;
use tracing::debug;

use super::BeanContext;
use crate::{
    any::TypeInfo,
    class::ClassLoaderProvider,
    errors::InjectionResult,
    listener::{BeanCreationListener, BeanCreationListenerSupport},
    provider::BeanProvider,
    store::BeanStore,
    Bean,
};

/// Bean context with its own default store on top of another context.
///
/// All requests are delegated to the wrapped context. Bean creation events of the wrapped context are relayed to the
/// listeners of the wrapper with the wrapper as source, and beans created through it see the wrapper as their
/// creation context.
pub struct BeanContextWrapper {
    wrapped: Arc<dyn BeanContext>,
    default_store: RwLock<Option<Arc<dyn BeanStore>>>,
    listeners: Arc<BeanCreationListenerSupport>,
}

impl BeanContextWrapper {
    #[must_use]
    pub fn new(wrapped: Arc<dyn BeanContext>, default_store: Option<Arc<dyn BeanStore>>) -> Arc<Self> {
        let wrapper = Arc::new_cyclic(|this: &Weak<Self>| {
            let context: Weak<dyn BeanContext> = this.clone();
            Self {
                wrapped,
                default_store: RwLock::new(default_store),
                listeners: Arc::new(BeanCreationListenerSupport::new(context)),
            }
        });
        wrapper.wrapped.add_bean_creation_listener(wrapper.listeners.clone());
        wrapper
    }

    #[inline]
    #[must_use]
    pub fn wrapped_context(&self) -> &Arc<dyn BeanContext> {
        &self.wrapped
    }

    fn detach(&self) {
        let listener: Arc<dyn BeanCreationListener> = self.listeners.clone();
        self.wrapped.remove_bean_creation_listener(&listener);
    }
}

impl Drop for BeanContextWrapper {
    fn drop(&mut self) {
        self.detach();
    }
}

impl BeanContext for BeanContextWrapper {
    fn get_bean_from(&self, name: &str, store: &dyn BeanStore) -> InjectionResult<Bean> {
        self.wrapped.get_bean_from(name, store)
    }

    fn contains_bean_in(&self, name: &str, store: Option<&dyn BeanStore>) -> bool {
        self.wrapped.contains_bean_in(name, store)
    }

    fn bean_names_in(&self, store: Option<&dyn BeanStore>) -> BTreeSet<String> {
        self.wrapped.bean_names_in(store)
    }

    fn get_bean_by_class_from(&self, class: TypeInfo, store: &dyn BeanStore) -> InjectionResult<Bean> {
        self.wrapped.get_bean_by_class_from(class, store)
    }

    fn contains_bean_class_in(&self, class: TypeInfo, store: Option<&dyn BeanStore>) -> bool {
        self.wrapped.contains_bean_class_in(class, store)
    }

    fn bean_classes_in(&self, store: Option<&dyn BeanStore>) -> BTreeSet<TypeInfo> {
        self.wrapped.bean_classes_in(store)
    }

    fn bean_name_for_in(&self, provider: &Arc<dyn BeanProvider>, store: Option<&dyn BeanStore>) -> Option<String> {
        self.wrapped.bean_name_for_in(provider, store)
    }

    fn default_bean_store(&self) -> Option<Arc<dyn BeanStore>> {
        self.default_store.read().clone()
    }

    fn set_default_bean_store(&self, store: Option<Arc<dyn BeanStore>>) {
        *self.default_store.write() = store;
    }

    fn add_bean_creation_listener(&self, listener: Arc<dyn BeanCreationListener>) {
        self.listeners.add_bean_creation_listener(listener);
    }

    fn remove_bean_creation_listener(&self, listener: &Arc<dyn BeanCreationListener>) {
        self.listeners.remove_bean_creation_listener(listener);
    }

    fn class_loader_provider(&self) -> Arc<dyn ClassLoaderProvider> {
        self.wrapped.class_loader_provider()
    }

    fn set_class_loader_provider(&self, class_loader_provider: Arc<dyn ClassLoaderProvider>) {
        self.wrapped.set_class_loader_provider(class_loader_provider);
    }

    /// Detaches the wrapper from the wrapped context, which stays open.
    fn close(&self) -> InjectionResult<()> {
        self.detach();
        debug!("Context wrapper closed");
        Ok(())
    }
}
