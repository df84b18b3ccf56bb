use alloc::{
    collections::{BTreeMap, VecDeque},
    string::ToString as _,
    sync::Arc,
    vec::Vec,
};
use core::cell::RefCell;
use tracing::{debug, debug_span, warn};

use crate::{
    class::ClassLoaderProvider,
    context::{BeanContext, DefaultBeanContext},
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    invocation_helper::InvocationHelper,
    provider::{BeanProvider, LockId},
    store::{fetch_conversion_helper, BeanStore},
    Bean,
};

/// Gives bean providers access to the beans they depend on during a transaction.
///
/// A dependency provider is used by one thread for the duration of one bean request.
pub trait DependencyProvider {
    /// Returns the bean of a dependency that belongs to the current transaction.
    ///
    /// # Errors
    /// Returns an error if the dependency is unknown or its bean cannot be created.
    fn get_dependent_bean(&self, dependency: &Dependency) -> InjectionResult<Bean>;

    /// Returns `false` if the bean of `dependency` is being created and cannot be handed out yet.
    ///
    /// # Errors
    /// Returns an error if the dependency is unknown.
    fn is_bean_available(&self, dependency: &Dependency) -> InjectionResult<bool>;

    /// Registers an initializer to run after the root bean of the transaction was fetched.
    ///
    /// # Errors
    /// Returns an error if postponed initialization is not supported.
    fn add_initializer(&self, initializer: Arc<dyn BeanInitializer>) -> InjectionResult<()>;

    /// Notifies the owning context that a bean was created.
    ///
    /// # Errors
    /// Returns an error if creation notifications are not supported.
    fn bean_created(&self, bean: &Bean, provider: Option<&dyn BeanProvider>) -> InjectionResult<()>;

    /// Sets the context the current bean is created for.
    ///
    /// # Errors
    /// Returns an error if the creation context is not supported.
    fn set_creation_bean_context(&self, context: Arc<dyn BeanContext>) -> InjectionResult<()>;

    fn invocation_helper(&self) -> Arc<InvocationHelper>;

    fn class_loader_provider(&self) -> &dyn ClassLoaderProvider;
}

/// Initialization postponed to the end of a transaction.
pub trait BeanInitializer {
    /// # Errors
    /// Returns an error if the initialization fails.
    fn initialize(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<()>;
}

/// Dependency provider of one bean request of a [`DefaultBeanContext`].
///
/// [`DefaultDependencyProvider::initialize`] collects the providers of the whole dependency graph of the requested
/// bean. The graph can then be locked so that concurrent requests never share a provider that is still in use.
pub struct DefaultDependencyProvider<'a> {
    context: &'a DefaultBeanContext,
    class_loader_provider: Arc<dyn ClassLoaderProvider>,
    invocation_helper: Arc<InvocationHelper>,
    dependency_map: BTreeMap<Dependency, Arc<dyn BeanProvider>>,
    initializers: RefCell<Vec<Arc<dyn BeanInitializer>>>,
    creation_context: RefCell<Option<Arc<dyn BeanContext>>>,
}

impl<'a> DefaultDependencyProvider<'a> {
    #[must_use]
    pub fn new(context: &'a DefaultBeanContext) -> Self {
        Self {
            context,
            class_loader_provider: context.class_loader_provider(),
            invocation_helper: Arc::new(InvocationHelper::new()),
            dependency_map: BTreeMap::new(),
            initializers: RefCell::new(Vec::new()),
            creation_context: RefCell::new(None),
        }
    }

    /// Resolves `root` and everything it depends on using `store`.
    ///
    /// Returns `Ok(false)` without changing the provider if one of the bean providers is locked by another
    /// transaction; the caller is expected to retry once that transaction has finished.
    ///
    /// # Errors
    /// Returns an error if a dependency cannot be resolved.
    pub fn initialize(&mut self, root: &Dependency, store: &dyn BeanStore) -> InjectionResult<bool> {
        let span = debug_span!("initialize", dependency = %root, store = store.name());
        let _guard = span.enter();

        let mut dependency_map = BTreeMap::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(dependency) = queue.pop_front() {
            if dependency_map.contains_key(&dependency) {
                continue;
            }

            let provider = dependency.resolve(Some(store), &*self)?;
            if let Some(lock_id) = provider.lock_id() {
                debug!(%dependency, %lock_id, "Bean provider is locked");
                return Ok(false);
            }

            queue.extend(provider.dependencies());
            dependency_map.insert(dependency, provider);
        }

        debug!(providers = dependency_map.len(), "Dependency graph resolved");
        self.dependency_map = dependency_map;
        self.invocation_helper = Arc::new(InvocationHelper::with_conversion_helper(
            fetch_conversion_helper(store, true).unwrap_or_default(),
        ));
        Ok(true)
    }

    /// Sets the lock id of all bean providers of the transaction, or clears it with `None`.
    pub fn lock(&self, lock_id: Option<LockId>) {
        for provider in self.dependency_map.values() {
            provider.set_lock_id(lock_id);
        }
    }

    /// # Errors
    /// Returns [`InjectionErrorKind::NotInTransaction`] if `dependency` was not resolved by
    /// [`DefaultDependencyProvider::initialize`].
    pub fn get_dependent_provider(&self, dependency: &Dependency) -> InjectionResult<&Arc<dyn BeanProvider>> {
        self.dependency_map.get(dependency).ok_or_else(|| {
            let err = InjectionErrorKind::NotInTransaction {
                dependency: dependency.to_string(),
            };
            warn!("{}", err);
            err
        })
    }

    /// Runs all postponed initializers.
    ///
    /// Every initializer runs even if an earlier one fails.
    ///
    /// # Errors
    /// Returns the first error of a failed initializer.
    pub fn invoke_initializers(&self) -> InjectionResult<()> {
        let mut first_err = None;
        loop {
            let initializers = core::mem::take(&mut *self.initializers.borrow_mut());
            if initializers.is_empty() {
                break;
            }

            debug!(count = initializers.len(), "Running postponed initializers");
            for initializer in initializers {
                if let Err(err) = initializer.initialize(self) {
                    warn!("{}", err);
                    first_err.get_or_insert(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    #[must_use]
    pub fn creation_bean_context(&self) -> Option<Arc<dyn BeanContext>> {
        self.creation_context.borrow().clone()
    }
}

impl DependencyProvider for DefaultDependencyProvider<'_> {
    fn get_dependent_bean(&self, dependency: &Dependency) -> InjectionResult<Bean> {
        self.get_dependent_provider(dependency)?.get_bean(self)
    }

    fn is_bean_available(&self, dependency: &Dependency) -> InjectionResult<bool> {
        Ok(self.get_dependent_provider(dependency)?.is_bean_available())
    }

    fn add_initializer(&self, initializer: Arc<dyn BeanInitializer>) -> InjectionResult<()> {
        self.initializers.borrow_mut().push(initializer);
        Ok(())
    }

    fn bean_created(&self, bean: &Bean, provider: Option<&dyn BeanProvider>) -> InjectionResult<()> {
        self.context.bean_created(bean, provider, self)
    }

    fn set_creation_bean_context(&self, context: Arc<dyn BeanContext>) -> InjectionResult<()> {
        *self.creation_context.borrow_mut() = Some(context);
        Ok(())
    }

    fn invocation_helper(&self) -> Arc<InvocationHelper> {
        self.invocation_helper.clone()
    }

    fn class_loader_provider(&self) -> &dyn ClassLoaderProvider {
        &*self.class_loader_provider
    }
}

/// Dependency provider without a transaction.
///
/// Only constant and chain variable dependencies can be served. It is used to run shutdown handlers when a context
/// is closed.
pub struct RestrictedDependencyProvider {
    class_loader_provider: Arc<dyn ClassLoaderProvider>,
    invocation_helper: Arc<InvocationHelper>,
}

impl RestrictedDependencyProvider {
    #[inline]
    #[must_use]
    pub fn new(class_loader_provider: Arc<dyn ClassLoaderProvider>, invocation_helper: Arc<InvocationHelper>) -> Self {
        Self {
            class_loader_provider,
            invocation_helper,
        }
    }
}

fn unsupported<T>(operation: &'static str) -> InjectionResult<T> {
    let err = InjectionErrorKind::Unsupported { operation };
    warn!("{}", err);
    Err(err)
}

impl DependencyProvider for RestrictedDependencyProvider {
    fn get_dependent_bean(&self, dependency: &Dependency) -> InjectionResult<Bean> {
        if !dependency.is_local() {
            return unsupported("get_dependent_bean");
        }
        dependency.resolve(None, self)?.get_bean(self)
    }

    fn is_bean_available(&self, _dependency: &Dependency) -> InjectionResult<bool> {
        unsupported("is_bean_available")
    }

    fn add_initializer(&self, _initializer: Arc<dyn BeanInitializer>) -> InjectionResult<()> {
        unsupported("add_initializer")
    }

    fn bean_created(&self, _bean: &Bean, _provider: Option<&dyn BeanProvider>) -> InjectionResult<()> {
        unsupported("bean_created")
    }

    fn set_creation_bean_context(&self, _context: Arc<dyn BeanContext>) -> InjectionResult<()> {
        unsupported("set_creation_bean_context")
    }

    fn invocation_helper(&self) -> Arc<InvocationHelper> {
        self.invocation_helper.clone()
    }

    fn class_loader_provider(&self) -> &dyn ClassLoaderProvider {
        &*self.class_loader_provider
    }
}
