mod wrapper;

pub use wrapper::BeanContextWrapper;

use alloc::{
    collections::BTreeSet,
    string::{String, ToString as _},
    sync::{Arc, Weak},
};
use core::fmt::{self, Debug, Formatter};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, info_span, warn};

use crate::{
    any::TypeInfo,
    class::{Class, ClassLoaderProvider, DefaultClassLoaderProvider},
    config::Config,
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    invocation_helper::InvocationHelper,
    listener::{BeanCreationListener, BeanCreationListenerSupport},
    provider::{BeanProvider, LockId},
    store::{fetch_conversion_helper, BeanStore},
    transaction::{DefaultDependencyProvider, DependencyProvider, RestrictedDependencyProvider},
    Bean,
};

/// Entry point to obtain beans from a hierarchy of bean stores.
///
/// Methods without a store parameter use the default bean store of the context.
pub trait BeanContext: Send + Sync {
    /// # Errors
    /// Returns an error if the bean cannot be resolved or created.
    fn get_bean_from(&self, name: &str, store: &dyn BeanStore) -> InjectionResult<Bean>;

    /// # Errors
    /// Returns an error if there is no default store or the bean cannot be resolved or created.
    fn get_bean(&self, name: &str) -> InjectionResult<Bean> {
        let Some(store) = self.default_bean_store() else {
            let err = InjectionErrorKind::UnresolvableName { name: name.to_string() };
            warn!("{}", err);
            return Err(err);
        };
        self.get_bean_from(name, &*store)
    }

    /// Returns the bean of the first provider creating beans of `class` in `store` or its parents.
    ///
    /// # Errors
    /// Returns an error if no provider creates beans of this class or the bean cannot be created.
    fn get_bean_by_class_from(&self, class: TypeInfo, store: &dyn BeanStore) -> InjectionResult<Bean>;

    /// # Errors
    /// Returns an error if there is no default store, no provider creates beans of this class or the bean cannot be
    /// created.
    fn get_bean_by_class(&self, class: TypeInfo) -> InjectionResult<Bean> {
        let Some(store) = self.default_bean_store() else {
            let err = InjectionErrorKind::UnresolvableClass { class: class.name };
            warn!("{}", err);
            return Err(err);
        };
        self.get_bean_by_class_from(class, &*store)
    }

    fn contains_bean_in(&self, name: &str, store: Option<&dyn BeanStore>) -> bool;

    fn contains_bean(&self, name: &str) -> bool {
        self.contains_bean_in(name, self.default_bean_store().as_deref())
    }

    /// Returns the names of all beans in `store` and its parents.
    fn bean_names_in(&self, store: Option<&dyn BeanStore>) -> BTreeSet<String>;

    fn bean_names(&self) -> BTreeSet<String> {
        self.bean_names_in(self.default_bean_store().as_deref())
    }

    fn contains_bean_class_in(&self, class: TypeInfo, store: Option<&dyn BeanStore>) -> bool;

    fn contains_bean_class(&self, class: TypeInfo) -> bool {
        self.contains_bean_class_in(class, self.default_bean_store().as_deref())
    }

    /// Returns the classes of the beans created by the providers of `store` and its parents.
    ///
    /// Providers whose bean class cannot be determined are skipped.
    fn bean_classes_in(&self, store: Option<&dyn BeanStore>) -> BTreeSet<TypeInfo>;

    fn bean_classes(&self) -> BTreeSet<TypeInfo> {
        self.bean_classes_in(self.default_bean_store().as_deref())
    }

    /// Returns the name `provider` is registered under in `store` or its parents.
    fn bean_name_for_in(&self, provider: &Arc<dyn BeanProvider>, store: Option<&dyn BeanStore>) -> Option<String>;

    fn bean_name_for(&self, provider: &Arc<dyn BeanProvider>) -> Option<String> {
        self.bean_name_for_in(provider, self.default_bean_store().as_deref())
    }

    fn default_bean_store(&self) -> Option<Arc<dyn BeanStore>>;

    fn set_default_bean_store(&self, store: Option<Arc<dyn BeanStore>>);

    fn add_bean_creation_listener(&self, listener: Arc<dyn BeanCreationListener>);

    fn remove_bean_creation_listener(&self, listener: &Arc<dyn BeanCreationListener>);

    fn class_loader_provider(&self) -> Arc<dyn ClassLoaderProvider>;

    fn set_class_loader_provider(&self, class_loader_provider: Arc<dyn ClassLoaderProvider>);

    /// Registers `class` at the default class loader of the context.
    ///
    /// # Errors
    /// Returns an error if the default class loader is not registered.
    fn register_class(&self, class: Class) -> InjectionResult<()> {
        self.class_loader_provider().class_loader(None)?.register(class);
        Ok(())
    }

    /// # Errors
    /// Returns the first error of a failed shutdown.
    fn close(&self) -> InjectionResult<()>;
}

/// Serializes the initialize and unlock phases of all transactions.
///
/// Stores and providers can be shared between contexts, so a transaction may wait for providers locked by a
/// transaction of another context. Both use this monitor.
struct TransactionMonitor {
    lock: Mutex<()>,
    released: Condvar,
}

static TRANSACTION_MONITOR: TransactionMonitor = TransactionMonitor {
    lock: Mutex::new(()),
    released: Condvar::new(),
};

/// Bean context running one transaction per bean request.
///
/// A request resolves the whole dependency graph of the bean and locks its bean providers. Requests whose graphs
/// overlap with a running request, of this or any other context, wait until that request has unlocked its providers,
/// unless [`Config::wait_for_locked_providers`] is disabled.
pub struct DefaultBeanContext {
    this: Weak<DefaultBeanContext>,
    config: Config,
    default_store: RwLock<Option<Arc<dyn BeanStore>>>,
    class_loader_provider: RwLock<Arc<dyn ClassLoaderProvider>>,
    listeners: BeanCreationListenerSupport,
}

impl DefaultBeanContext {
    #[inline]
    #[must_use]
    pub fn new(default_store: Option<Arc<dyn BeanStore>>) -> Arc<Self> {
        Self::new_with_config(default_store, Config::default())
    }

    #[must_use]
    pub fn new_with_config(default_store: Option<Arc<dyn BeanStore>>, config: Config) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let context: Weak<dyn BeanContext> = this.clone();
            Self {
                this: this.clone(),
                config,
                default_store: RwLock::new(default_store),
                class_loader_provider: RwLock::new(Arc::new(DefaultClassLoaderProvider::new())),
                listeners: BeanCreationListenerSupport::new(context),
            }
        })
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    #[inline]
    #[must_use]
    pub fn bean_creation_listeners(&self) -> &BeanCreationListenerSupport {
        &self.listeners
    }

    /// Resolves and locks the dependency graph of `dependency`, waiting for conflicting requests if configured.
    fn begin<'a>(
        &'a self,
        dependency: &Dependency,
        store: &dyn BeanStore,
    ) -> InjectionResult<DefaultDependencyProvider<'a>> {
        let mut dependency_provider = DefaultDependencyProvider::new(self);

        let mut guard = TRANSACTION_MONITOR.lock.lock();
        while !dependency_provider.initialize(dependency, store)? {
            if !self.config.wait_for_locked_providers {
                let err = InjectionErrorKind::LockConflict {
                    dependency: dependency.to_string(),
                };
                warn!("{}", err);
                return Err(err);
            }

            debug!("Waiting for locked bean providers");
            TRANSACTION_MONITOR.released.wait(&mut guard);
        }

        let lock_id = LockId::next();
        dependency_provider.lock(Some(lock_id));
        debug!(%lock_id, "Dependency graph locked");
        Ok(dependency_provider)
    }

    fn end(&self, dependency_provider: &DefaultDependencyProvider<'_>) {
        let _guard = TRANSACTION_MONITOR.lock.lock();
        dependency_provider.lock(None);
        TRANSACTION_MONITOR.released.notify_all();
        debug!("Dependency graph unlocked");
    }

    fn fetch(&self, dependency: &Dependency, store: &dyn BeanStore) -> InjectionResult<Bean> {
        let dependency_provider = self.begin(dependency, store)?;
        let transaction = TransactionGuard {
            context: self,
            dependency_provider: &dependency_provider,
        };

        let bean = dependency_provider.get_dependent_bean(dependency);
        let initialized = dependency_provider.invoke_initializers();
        drop(transaction);

        match (bean, initialized) {
            (Ok(bean), Ok(())) => {
                debug!("Bean fetched");
                Ok(bean)
            }
            (Err(err), _) | (Ok(_), Err(err)) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    pub(crate) fn bean_created(
        &self,
        bean: &Bean,
        provider: Option<&dyn BeanProvider>,
        dependency_provider: &dyn DependencyProvider,
    ) -> InjectionResult<()> {
        if let Some(this) = self.this.upgrade() {
            dependency_provider.set_creation_bean_context(this)?;
        }
        self.listeners.fire_bean_creation_event(bean, provider, dependency_provider);
        Ok(())
    }
}

/// Unlocks the dependency graph of a transaction when dropped.
struct TransactionGuard<'a, 'b> {
    context: &'a DefaultBeanContext,
    dependency_provider: &'a DefaultDependencyProvider<'b>,
}

impl Drop for TransactionGuard<'_, '_> {
    fn drop(&mut self) {
        self.context.end(self.dependency_provider);
    }
}

impl BeanContext for DefaultBeanContext {
    fn get_bean_from(&self, name: &str, store: &dyn BeanStore) -> InjectionResult<Bean> {
        let span = info_span!("get_bean", name, store = store.name());
        let _guard = span.enter();

        self.fetch(&Dependency::name(name), store)
    }

    fn get_bean_by_class_from(&self, class: TypeInfo, store: &dyn BeanStore) -> InjectionResult<Bean> {
        let span = info_span!("get_bean_by_class", class = class.short_name(), store = store.name());
        let _guard = span.enter();

        self.fetch(&Dependency::class(class), store)
    }

    fn contains_bean_in(&self, name: &str, store: Option<&dyn BeanStore>) -> bool {
        if store.is_none() {
            return false;
        }

        let dependency_provider = DefaultDependencyProvider::new(self);
        Dependency::name(name).resolve(store, &dependency_provider).is_ok()
    }

    fn bean_names_in(&self, store: Option<&dyn BeanStore>) -> BTreeSet<String> {
        fn collect(store: Option<&dyn BeanStore>, names: &mut BTreeSet<String>) {
            if let Some(store) = store {
                names.extend(store.provider_names());
                collect(store.parent().as_deref(), names);
            }
        }

        let mut names = BTreeSet::new();
        collect(store, &mut names);
        names
    }

    fn contains_bean_class_in(&self, class: TypeInfo, store: Option<&dyn BeanStore>) -> bool {
        if store.is_none() {
            return false;
        }

        let dependency_provider = DefaultDependencyProvider::new(self);
        Dependency::class(class).resolve(store, &dependency_provider).is_ok()
    }

    fn bean_classes_in(&self, store: Option<&dyn BeanStore>) -> BTreeSet<TypeInfo> {
        fn collect(
            store: Option<&dyn BeanStore>,
            dependency_provider: &dyn DependencyProvider,
            classes: &mut BTreeSet<TypeInfo>,
        ) {
            if let Some(store) = store {
                classes.extend(
                    store
                        .provider_names()
                        .iter()
                        .filter_map(|name| store.get_bean_provider(name))
                        .filter_map(|provider| provider.bean_class(dependency_provider).ok()),
                );
                collect(store.parent().as_deref(), dependency_provider, classes);
            }
        }

        let dependency_provider = DefaultDependencyProvider::new(self);
        let mut classes = BTreeSet::new();
        collect(store, &dependency_provider, &mut classes);
        classes
    }

    fn bean_name_for_in(&self, provider: &Arc<dyn BeanProvider>, store: Option<&dyn BeanStore>) -> Option<String> {
        let store = store?;
        let found = store.provider_names().into_iter().find(|name| {
            store
                .get_bean_provider(name)
                .is_some_and(|candidate| core::ptr::addr_eq(Arc::as_ptr(&candidate), Arc::as_ptr(provider)))
        });

        found.or_else(|| self.bean_name_for_in(provider, store.parent().as_deref()))
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
        self.class_loader_provider.read().clone()
    }

    fn set_class_loader_provider(&self, class_loader_provider: Arc<dyn ClassLoaderProvider>) {
        *self.class_loader_provider.write() = class_loader_provider;
    }

    /// Shuts down the bean providers of the default store and its parents.
    ///
    /// Shutdown handlers run with a [`RestrictedDependencyProvider`], so they can only use constant and chain
    /// variable dependencies.
    fn close(&self) -> InjectionResult<()> {
        let Some(store) = self.default_bean_store() else {
            return Ok(());
        };

        let conversion_helper = fetch_conversion_helper(&*store, true).unwrap_or_default();
        let dependency_provider = RestrictedDependencyProvider::new(
            self.class_loader_provider(),
            Arc::new(InvocationHelper::with_conversion_helper(conversion_helper)),
        );

        let mut first_err = None;
        let mut current = Some(store);
        while let Some(store) = current {
            for name in store.provider_names() {
                let Some(provider) = store.get_bean_provider(&name) else {
                    continue;
                };
                if let Err(err) = provider.shutdown(&dependency_provider) {
                    error!(name = %name, "{}", err);
                    first_err.get_or_insert(err);
                }
            }
            current = store.parent();
        }

        debug!("Context closed");
        first_err.map_or(Ok(()), Err)
    }
}

impl Debug for DefaultBeanContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultBeanContext")
            .field("config", &self.config)
            .field("default_store", &self.default_store.read().as_ref().map(|store| store.name().to_string()))
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
