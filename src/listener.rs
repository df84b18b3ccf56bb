use alloc::{
    sync::{Arc, Weak},
    vec::Vec,
};
use core::fmt::{self, Debug, Formatter};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{context::BeanContext, provider::BeanProvider, transaction::DependencyProvider, Bean};

/// Notification about a bean created by a bean context.
pub struct BeanCreationEvent<'a> {
    source: Arc<dyn BeanContext>,
    provider: Option<&'a dyn BeanProvider>,
    dependency_provider: &'a dyn DependencyProvider,
    bean: &'a Bean,
}

impl<'a> BeanCreationEvent<'a> {
    #[inline]
    #[must_use]
    pub fn new(
        source: Arc<dyn BeanContext>,
        provider: Option<&'a dyn BeanProvider>,
        dependency_provider: &'a dyn DependencyProvider,
        bean: &'a Bean,
    ) -> Self {
        Self {
            source,
            provider,
            dependency_provider,
            bean,
        }
    }

    /// The context the bean was requested from.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Arc<dyn BeanContext> {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn provider(&self) -> Option<&'a dyn BeanProvider> {
        self.provider
    }

    #[inline]
    #[must_use]
    pub fn dependency_provider(&self) -> &'a dyn DependencyProvider {
        self.dependency_provider
    }

    #[inline]
    #[must_use]
    pub fn bean(&self) -> &'a Bean {
        self.bean
    }
}

impl Debug for BeanCreationEvent<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanCreationEvent").field("bean", self.bean).finish_non_exhaustive()
    }
}

pub trait BeanCreationListener: Send + Sync {
    fn bean_created(&self, event: &BeanCreationEvent<'_>);
}

/// Manages the creation listeners of a bean context.
///
/// The listener list is copied on every change, so firing an event iterates over a snapshot and listeners may
/// register or unregister listeners while being notified.
///
/// The support is a listener itself. Registered at a wrapped context, it relays the events of that context to its own
/// listeners with its own context as source and creation context.
pub struct BeanCreationListenerSupport {
    context: Weak<dyn BeanContext>,
    listeners: Mutex<Arc<Vec<Arc<dyn BeanCreationListener>>>>,
}

impl BeanCreationListenerSupport {
    #[must_use]
    pub fn new(context: Weak<dyn BeanContext>) -> Self {
        Self {
            context,
            listeners: Mutex::new(Arc::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn context(&self) -> Option<Arc<dyn BeanContext>> {
        self.context.upgrade()
    }

    pub fn add_bean_creation_listener(&self, listener: Arc<dyn BeanCreationListener>) {
        let mut listeners = self.listeners.lock();
        let mut updated = Vec::clone(&listeners);
        updated.push(listener);
        *listeners = Arc::new(updated);
    }

    pub fn remove_bean_creation_listener(&self, listener: &Arc<dyn BeanCreationListener>) {
        let mut listeners = self.listeners.lock();
        let updated = listeners
            .iter()
            .filter(|known| !core::ptr::addr_eq(Arc::as_ptr(*known), Arc::as_ptr(listener)))
            .cloned()
            .collect();
        *listeners = Arc::new(updated);
    }

    /// Returns a snapshot of the registered listeners.
    #[must_use]
    pub fn bean_creation_listeners(&self) -> Arc<Vec<Arc<dyn BeanCreationListener>>> {
        self.listeners.lock().clone()
    }

    /// Notifies all listeners about a created bean.
    ///
    /// No event is created if there are no listeners or the context is gone.
    pub fn fire_bean_creation_event(
        &self,
        bean: &Bean,
        provider: Option<&dyn BeanProvider>,
        dependency_provider: &dyn DependencyProvider,
    ) {
        let listeners = self.bean_creation_listeners();
        if listeners.is_empty() {
            return;
        }
        let Some(source) = self.context() else {
            return;
        };

        let event = BeanCreationEvent::new(source, provider, dependency_provider, bean);
        debug!(listeners = listeners.len(), bean = ?bean, "Firing bean creation event");
        for listener in listeners.iter() {
            listener.bean_created(&event);
        }
    }
}

impl BeanCreationListener for BeanCreationListenerSupport {
    fn bean_created(&self, event: &BeanCreationEvent<'_>) {
        let Some(context) = self.context() else {
            return;
        };

        if let Err(err) = event.dependency_provider().set_creation_bean_context(context) {
            warn!("{}", err);
        }
        self.fire_bean_creation_event(event.bean(), event.provider(), event.dependency_provider());
    }
}

impl Debug for BeanCreationListenerSupport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanCreationListenerSupport")
            .field("listeners", &self.listeners.lock().len())
            .finish_non_exhaustive()
    }
}
