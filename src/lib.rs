#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod bean;
pub(crate) mod class;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod conversion;
pub(crate) mod dependency;
pub(crate) mod errors;
pub(crate) mod invocation;
pub(crate) mod invocation_helper;
pub(crate) mod listener;
pub(crate) mod provider;
pub(crate) mod service;
pub(crate) mod store;
pub(crate) mod transaction;

pub use any::TypeInfo;
pub use bean::Bean;
pub use class::{
    Class, ClassBuilder, ClassDescription, ClassLoader, ClassLoaderProvider, DefaultClassLoaderProvider, FromBean, Function,
    Inject, Member, Method, Property, Value, CONTEXT_CLASS_LOADER, SYSTEM_CLASS_LOADER,
};
pub use config::Config;
pub use context::{BeanContext, BeanContextWrapper, DefaultBeanContext};
pub use conversion::ConversionHelper;
pub use dependency::{ClassDependency, Dependency, NameDependency};
pub use errors::{InjectionErrorKind, InjectionResult};
pub use invocation::{
    ChainVariable, ChainVariables, ChainedInvocation, ConstructorInvocation, HelperInvocation, Invocation, Invokable,
    MethodInvocation, SetPropertyInvocation,
};
pub use invocation_helper::InvocationHelper;
pub use listener::{BeanCreationEvent, BeanCreationListener, BeanCreationListenerSupport};
pub use provider::{
    BeanProvider, CollectionBeanProvider, CollectionKind, ConstantBeanProvider, ConstructorBeanProvider, LockId,
    MapBeanProvider, MethodInvocationBeanProvider, SingletonBeanProvider,
};
pub use store::{
    fetch_conversion_helper, BeanContributor, BeanStore, CombinedBeanStore, DefaultBeanStore, SimpleBeanStore,
    ANONYMOUS_BEAN_PREFIX,
};
pub use transaction::{BeanInitializer, DefaultDependencyProvider, DependencyProvider, RestrictedDependencyProvider};
