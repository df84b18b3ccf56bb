use alloc::{
    collections::BTreeSet,
    string::{String, ToString as _},
    sync::{Arc, Weak},
};
use core::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicBool, Ordering},
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{BeanProvider, LockId, LockState};
use crate::{
    any::TypeInfo,
    class::ClassLoaderProvider,
    context::BeanContext,
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    invocation::{HelperInvocation, Invokable},
    invocation_helper::InvocationHelper,
    transaction::{BeanInitializer, DependencyProvider},
    Bean,
};

#[derive(Default)]
struct LifeCycleState {
    bean: Option<Bean>,
    creating: bool,
    initializing: bool,
    current_dependency: Option<Dependency>,
}

/// Creates its bean once, initializes it and runs a shutdown handler when the context is closed.
///
/// The bean is created by a creator provider and then passed to the initializer invokable, which defaults to
/// [`HelperInvocation::Identity`]. If the initializer needs beans that are still being created, for instance because
/// of a cycle between property setters, the initialization is postponed until the transaction has fetched its root
/// bean. A cycle between creators cannot be resolved and fails with [`InjectionErrorKind::CyclicDependency`].
///
/// After the bean is initialized the provider has no dependencies and is never locked.
pub struct SingletonBeanProvider {
    this: Weak<SingletonBeanProvider>,
    creator: Arc<dyn BeanProvider>,
    initializer: Arc<dyn Invokable>,
    shutdown_handler: Arc<dyn Invokable>,
    state: Mutex<LifeCycleState>,
    instance_created: AtomicBool,
    lock: LockState,
}

impl SingletonBeanProvider {
    #[must_use]
    pub fn new(
        creator: Arc<dyn BeanProvider>,
        initializer: Option<Arc<dyn Invokable>>,
        shutdown_handler: Option<Arc<dyn Invokable>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            creator,
            initializer: initializer.unwrap_or_else(|| Arc::new(HelperInvocation::Identity)),
            shutdown_handler: shutdown_handler.unwrap_or_else(|| Arc::new(HelperInvocation::Null)),
            state: Mutex::new(LifeCycleState::default()),
            instance_created: AtomicBool::new(false),
            lock: LockState::default(),
        })
    }

    #[inline]
    #[must_use]
    pub fn creator(&self) -> &Arc<dyn BeanProvider> {
        &self.creator
    }

    #[inline]
    #[must_use]
    pub fn initializer(&self) -> &Arc<dyn Invokable> {
        &self.initializer
    }

    #[inline]
    #[must_use]
    pub fn shutdown_handler(&self) -> &Arc<dyn Invokable> {
        &self.shutdown_handler
    }

    /// Returns `true` once the bean is created and initialized.
    #[inline]
    #[must_use]
    pub fn has_bean(&self) -> bool {
        self.instance_created.load(Ordering::Acquire)
    }

    fn create_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        {
            let mut state = self.state.lock();
            if state.creating {
                let err = InjectionErrorKind::CyclicDependency {
                    dependency: state
                        .current_dependency
                        .as_ref()
                        .map_or_else(|| String::from("<none>"), |dependency| dependency.to_string()),
                    provider: self.to_string(),
                };
                warn!("{}", err);
                return Err(err);
            }
            if state.initializing {
                if let Some(bean) = &state.bean {
                    return Ok(bean.clone());
                }
            }
            state.creating = true;
            state.initializing = true;
        }

        let diagnostic = DiagnosticDependencyProvider {
            inner: dependency_provider,
            owner: self,
        };
        let bean = match self.creator.get_bean(&diagnostic) {
            Ok(bean) => bean,
            Err(err) => {
                let mut state = self.state.lock();
                state.creating = false;
                state.initializing = false;
                return Err(err);
            }
        };
        debug!(provider = %self, "Bean created");

        {
            let mut state = self.state.lock();
            state.bean = Some(bean.clone());
            state.creating = false;
        }

        let can_initialize = match self.can_initialize(dependency_provider) {
            Ok(can_initialize) => can_initialize,
            Err(err) => {
                self.reset();
                return Err(err);
            }
        };
        if can_initialize {
            return self.complete_initialization(bean, dependency_provider);
        }

        match self.this.upgrade() {
            Some(this) => {
                debug!(provider = %self, "Initialization postponed");
                if let Err(err) = dependency_provider.add_initializer(this) {
                    self.reset();
                    return Err(err);
                }
                Ok(bean)
            }
            None => self.complete_initialization(bean, dependency_provider),
        }
    }

    fn can_initialize(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<bool> {
        for dependency in self.initializer.parameter_dependencies() {
            if !dependency_provider.is_bean_available(&dependency)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn complete_initialization(&self, bean: Bean, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let result = self.initialized_bean(bean, dependency_provider);

        let mut state = self.state.lock();
        state.initializing = false;
        match result {
            Ok(bean) => {
                state.bean = Some(bean.clone());
                self.instance_created.store(true, Ordering::Release);
                Ok(bean)
            }
            Err(err) => {
                state.bean = None;
                Err(err)
            }
        }
    }

    fn initialized_bean(&self, bean: Bean, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let bean = self.initializer.invoke(dependency_provider, Some(&bean))?.unwrap_or(bean);
        dependency_provider.bean_created(&bean, Some(self))?;
        Ok(bean)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.bean = None;
        state.creating = false;
        state.initializing = false;
    }
}

impl BeanProvider for SingletonBeanProvider {
    fn get_bean(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        if let Some(bean) = self.state.lock().bean.clone() {
            return Ok(bean);
        }
        self.create_bean(dependency_provider)
    }

    fn bean_class(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        if let Some(bean) = &self.state.lock().bean {
            return Ok(bean.type_info());
        }
        self.creator.bean_class(dependency_provider)
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        if self.has_bean() {
            return BTreeSet::new();
        }

        let mut dependencies = self.creator.dependencies();
        dependencies.extend(self.initializer.parameter_dependencies());
        dependencies
    }

    fn lock_id(&self) -> Option<LockId> {
        if self.has_bean() {
            return None;
        }
        self.lock.get()
    }

    fn set_lock_id(&self, lock_id: Option<LockId>) {
        self.lock.set(lock_id);
    }

    fn is_bean_available(&self) -> bool {
        !self.state.lock().creating
    }

    fn shutdown(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<()> {
        if !self.has_bean() {
            return Ok(());
        }

        let Some(bean) = self.state.lock().bean.clone() else {
            return Ok(());
        };
        self.shutdown_handler.invoke(dependency_provider, Some(&bean))?;
        debug!(provider = %self, "Bean shut down");
        Ok(())
    }
}

impl BeanInitializer for SingletonBeanProvider {
    fn initialize(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<()> {
        let bean = self.state.lock().bean.clone();
        let Some(bean) = bean else {
            self.state.lock().initializing = false;
            return Err(InjectionErrorKind::NoBean { provider: self.to_string() });
        };

        self.complete_initialization(bean, dependency_provider).map(|_| ())
    }
}

impl Display for SingletonBeanProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SingletonBeanProvider@{:p}[initializer = {}]", self, self.initializer)
    }
}

/// Records the dependency the creator is fetching, to name it if a cycle is detected.
struct DiagnosticDependencyProvider<'a> {
    inner: &'a dyn DependencyProvider,
    owner: &'a SingletonBeanProvider,
}

impl DependencyProvider for DiagnosticDependencyProvider<'_> {
    fn get_dependent_bean(&self, dependency: &Dependency) -> InjectionResult<Bean> {
        self.owner.state.lock().current_dependency = Some(dependency.clone());
        self.inner.get_dependent_bean(dependency)
    }

    fn is_bean_available(&self, dependency: &Dependency) -> InjectionResult<bool> {
        self.inner.is_bean_available(dependency)
    }

    fn add_initializer(&self, initializer: Arc<dyn BeanInitializer>) -> InjectionResult<()> {
        self.inner.add_initializer(initializer)
    }

    fn bean_created(&self, bean: &Bean, provider: Option<&dyn BeanProvider>) -> InjectionResult<()> {
        self.inner.bean_created(bean, provider)
    }

    fn set_creation_bean_context(&self, context: Arc<dyn BeanContext>) -> InjectionResult<()> {
        self.inner.set_creation_bean_context(context)
    }

    fn invocation_helper(&self) -> Arc<InvocationHelper> {
        self.inner.invocation_helper()
    }

    fn class_loader_provider(&self) -> &dyn ClassLoaderProvider {
        self.inner.class_loader_provider()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::SingletonBeanProvider;
    use crate::{
        class::{Class, ClassDescription, Inject},
        context::{BeanContext as _, DefaultBeanContext},
        dependency::Dependency,
        invocation::{ConstructorInvocation, MethodInvocation, SetPropertyInvocation},
        provider::{BeanProvider as _, ConstructorBeanProvider, LockId},
        store::DefaultBeanStore,
        InjectionErrorKind,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::{Arc, Weak},
        vec::Vec,
    };
    use core::sync::atomic::{AtomicU32, Ordering};
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    static CREATED: AtomicU32 = AtomicU32::new(0);

    struct Engine;

    struct Car {
        engine: Arc<Engine>,
    }

    struct Parent {
        child: Mutex<Weak<Child>>,
    }

    struct Child {
        parent: Arc<Parent>,
    }

    struct Closable {
        closed: AtomicU32,
    }

    fn constructor(class: &str, parameters: Vec<Dependency>) -> Arc<ConstructorBeanProvider> {
        Arc::new(ConstructorBeanProvider::new(
            ConstructorInvocation::new(ClassDescription::named(class, None), None, parameters).unwrap(),
        ))
    }

    #[test]
    #[traced_test]
    fn test_created_once() {
        let engine = SingletonBeanProvider::new(constructor("Engine", Vec::new()), None, None);
        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("engine", engine.clone());
        store.add_bean_provider(
            "car",
            SingletonBeanProvider::new(constructor("Car", Vec::from([Dependency::name("engine")])), None, None),
        );

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context
            .register_class(
                Class::builder::<Engine>("Engine")
                    .constructor(|| {
                        CREATED.fetch_add(1, Ordering::SeqCst);
                        Ok(Engine)
                    })
                    .build(),
            )
            .unwrap();
        context
            .register_class(
                Class::builder::<Car>("Car")
                    .constructor(|Inject(engine): Inject<Engine>| Ok(Car { engine }))
                    .build(),
            )
            .unwrap();

        assert!(!engine.has_bean());
        let car_1 = context.get_bean("car").unwrap();
        let car_2 = context.get_bean("car").unwrap();
        let engine_bean = context.get_bean("engine").unwrap();

        assert!(car_1.ptr_eq(&car_2));
        assert!(Arc::ptr_eq(
            &car_1.downcast_ref::<Car>().unwrap().engine,
            &engine_bean.downcast::<Engine>().unwrap()
        ));
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        assert!(engine.has_bean());
        assert!(engine.dependencies().is_empty());
        engine.set_lock_id(Some(LockId::next()));
        assert_eq!(engine.lock_id(), None);
    }

    #[test]
    #[traced_test]
    fn test_cyclic_creators() {
        struct Left;
        struct Right;

        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider(
            "left",
            SingletonBeanProvider::new(constructor("Left", Vec::from([Dependency::name("right")])), None, None),
        );
        store.add_bean_provider(
            "right",
            SingletonBeanProvider::new(constructor("Right", Vec::from([Dependency::name("left")])), None, None),
        );

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context
            .register_class(Class::builder::<Left>("Left").constructor(|_: Inject<Right>| Ok(Left)).build())
            .unwrap();
        context
            .register_class(Class::builder::<Right>("Right").constructor(|_: Inject<Left>| Ok(Right)).build())
            .unwrap();

        let err = context.get_bean("left").unwrap_err();
        assert!(matches!(&err, InjectionErrorKind::CyclicDependency { dependency, .. } if dependency == "Name(right)"));
    }

    #[test]
    #[traced_test]
    fn test_postponed_initialization() {
        let parent_class = Class::builder::<Parent>("Parent")
            .constructor(|| {
                Ok(Parent {
                    child: Mutex::new(Weak::new()),
                })
            })
            .property("child", |parent: &Parent, Inject(child): Inject<Child>| {
                *parent.child.lock() = Arc::downgrade(&child);
                Ok(())
            })
            .build();
        let child_class = Class::builder::<Child>("Child")
            .constructor(|Inject(parent): Inject<Parent>| Ok(Child { parent }))
            .build();

        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider(
            "parent",
            SingletonBeanProvider::new(
                constructor("Parent", Vec::new()),
                Some(Arc::new(SetPropertyInvocation::new("child", Dependency::name("child"), None))),
                None,
            ),
        );
        store.add_bean_provider(
            "child",
            SingletonBeanProvider::new(constructor("Child", Vec::from([Dependency::name("parent")])), None, None),
        );

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context.register_class(parent_class).unwrap();
        context.register_class(child_class).unwrap();

        let child = context.get_bean("child").unwrap();
        let child = child.downcast::<Child>().unwrap();
        let parent = context.get_bean("parent").unwrap();

        assert!(Arc::ptr_eq(&child.parent, &parent.downcast::<Parent>().unwrap()));
        assert!(Arc::ptr_eq(&child.parent.child.lock().upgrade().unwrap(), &child));
    }

    #[test]
    #[traced_test]
    fn test_shutdown() {
        let class = Class::builder::<Closable>("Closable")
            .constructor(|| Ok(Closable { closed: AtomicU32::new(0) }))
            .method("close", |closable: &Closable| {
                closable.closed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();
        let closable = SingletonBeanProvider::new(
            constructor("Closable", Vec::new()),
            None,
            Some(Arc::new(MethodInvocation::instance("close", Vec::new()))),
        );
        let unused = SingletonBeanProvider::new(
            constructor("Closable", Vec::new()),
            None,
            Some(Arc::new(MethodInvocation::instance("close", Vec::new()))),
        );

        let mut store = DefaultBeanStore::new("root");
        store.add_bean_provider("closable", closable.clone());
        store.add_bean_provider("unused", unused.clone());

        let context = DefaultBeanContext::new(Some(Arc::new(store)));
        context.register_class(class).unwrap();

        let bean = context.get_bean("closable").unwrap();
        context.close().unwrap();

        assert_eq!(bean.downcast_ref::<Closable>().unwrap().closed.load(Ordering::SeqCst), 1);
        assert!(!unused.has_bean());
    }

    #[test]
    fn test_defaults() {
        let provider = SingletonBeanProvider::new(constructor("Engine", Vec::new()), None, None);

        assert_eq!(provider.initializer().to_string(), "IdentityInvocation");
        assert_eq!(provider.shutdown_handler().to_string(), "NullInvocation");
        assert!(provider.is_bean_available());
        assert_eq!(provider.dependencies().len(), 0);
        assert!(provider.to_string().starts_with("SingletonBeanProvider@"));
    }
}
