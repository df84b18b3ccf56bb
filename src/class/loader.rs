use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString as _},
    sync::Arc,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::Class;
use crate::{
    errors::{InjectionErrorKind, InjectionResult},
    Bean,
};

/// Symbolic name of the context class loader of a [`DefaultClassLoaderProvider`].
pub const CONTEXT_CLASS_LOADER: &str = "CONTEXT";

/// Name of the loader created by [`ClassLoader::system`].
pub const SYSTEM_CLASS_LOADER: &str = "system";

/// Named registry of classes.
pub struct ClassLoader {
    name: String,
    classes: RwLock<BTreeMap<String, Class>>,
}

impl ClassLoader {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates a loader knowing the primitive types and `String` by their Rust names.
    #[must_use]
    pub fn system() -> Self {
        let loader = Self::new(SYSTEM_CLASS_LOADER);

        macro_rules! register_opaque {
            ([$($ty:ident),*]) => {
                $( loader.register(Class::opaque::<$ty>(stringify!($ty))); )*
            };
        }

        register_opaque!([i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, String]);
        loader
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a class, replacing a class registered under the same name.
    pub fn register(&self, class: Class) {
        debug!(loader = %self.name, class = class.name(), "Class registered");
        self.classes.write().insert(class.name().to_string(), class);
    }

    /// # Errors
    /// Returns [`InjectionErrorKind::ClassNotFound`] if no class with this name is registered.
    pub fn load_class(&self, name: &str) -> InjectionResult<Class> {
        self.classes.read().get(name).cloned().ok_or_else(|| InjectionErrorKind::ClassNotFound {
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn class_of(&self, bean: &Bean) -> Option<Class> {
        self.classes.read().values().find(|class| class.is_instance(bean)).cloned()
    }

    #[must_use]
    pub fn class_names(&self) -> BTreeSet<String> {
        self.classes.read().keys().cloned().collect()
    }
}

impl core::fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassLoader")
            .field("name", &self.name)
            .field("classes", &self.classes.read().len())
            .finish()
    }
}

/// Maps symbolic class loader names to class loaders.
pub trait ClassLoaderProvider: Send + Sync {
    fn class_loader_names(&self) -> BTreeSet<String>;

    /// Returns the loader registered under `name`.
    ///
    /// `None` selects the default loader, [`CONTEXT_CLASS_LOADER`] the context loader.
    ///
    /// # Errors
    /// Returns [`InjectionErrorKind::UnknownClassLoader`] for names that are not registered.
    fn class_loader(&self, name: Option<&str>) -> InjectionResult<Arc<ClassLoader>>;

    fn default_class_loader_name(&self) -> Option<String>;

    fn set_default_class_loader_name(&self, name: Option<String>);

    /// Registers a loader under a symbolic name. `None` removes the registration.
    fn register_class_loader(&self, name: &str, loader: Option<Arc<ClassLoader>>);

    /// # Errors
    /// Returns an error if the loader is unknown or does not know the class.
    fn load_class(&self, name: &str, loader_name: Option<&str>) -> InjectionResult<Class> {
        self.class_loader(loader_name)?.load_class(name)
    }

    /// Finds the class of a bean, asking the default loader first and then all registered loaders.
    fn class_of(&self, bean: &Bean) -> Option<Class> {
        if let Some(class) = self.class_loader(None).ok().and_then(|loader| loader.class_of(bean)) {
            return Some(class);
        }
        self.class_loader_names()
            .iter()
            .filter_map(|name| self.class_loader(Some(name)).ok())
            .find_map(|loader| loader.class_of(bean))
    }
}

pub struct DefaultClassLoaderProvider {
    context_loader: Arc<ClassLoader>,
    loaders: RwLock<BTreeMap<String, Arc<ClassLoader>>>,
    default_name: RwLock<Option<String>>,
}

impl Default for DefaultClassLoaderProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultClassLoaderProvider {
    /// Creates a provider using a [`ClassLoader::system`] loader as context loader.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_context_loader(Arc::new(ClassLoader::system()))
    }

    #[inline]
    #[must_use]
    pub fn with_context_loader(context_loader: Arc<ClassLoader>) -> Self {
        Self {
            context_loader,
            loaders: RwLock::new(BTreeMap::new()),
            default_name: RwLock::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn context_loader(&self) -> &Arc<ClassLoader> {
        &self.context_loader
    }
}

impl ClassLoaderProvider for DefaultClassLoaderProvider {
    fn class_loader_names(&self) -> BTreeSet<String> {
        self.loaders.read().keys().cloned().collect()
    }

    fn class_loader(&self, name: Option<&str>) -> InjectionResult<Arc<ClassLoader>> {
        let default_name = self.default_name.read().clone();
        let Some(name) = name.or(default_name.as_deref()) else {
            return Ok(self.context_loader.clone());
        };
        if name == CONTEXT_CLASS_LOADER {
            return Ok(self.context_loader.clone());
        }

        self.loaders.read().get(name).cloned().ok_or_else(|| {
            let err = InjectionErrorKind::UnknownClassLoader { name: name.to_string() };
            warn!("{}", err);
            err
        })
    }

    fn default_class_loader_name(&self) -> Option<String> {
        self.default_name.read().clone()
    }

    fn set_default_class_loader_name(&self, name: Option<String>) {
        *self.default_name.write() = name;
    }

    fn register_class_loader(&self, name: &str, loader: Option<Arc<ClassLoader>>) {
        let mut loaders = self.loaders.write();
        match loader {
            Some(loader) => {
                debug!(name, "Class loader registered");
                loaders.insert(name.to_string(), loader);
            }
            None => {
                debug!(name, "Class loader removed");
                loaders.remove(name);
            }
        }
    }
}
