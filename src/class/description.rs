use alloc::string::{String, ToString as _};
use core::{
    cmp::Ordering,
    fmt::{self, Debug, Display, Formatter},
};
use parking_lot::Mutex;
use tracing::debug;

use super::{Class, ClassLoaderProvider};
use crate::errors::InjectionResult;

/// Reference to a class, either held directly or loaded by name on first use.
///
/// A description created by name resolves its class once, using the class loader provider of the first caller;
/// later calls return the cached class.
pub struct ClassDescription {
    class_name: String,
    loader_name: Option<String>,
    class: Mutex<Option<Class>>,
}

impl ClassDescription {
    #[inline]
    #[must_use]
    pub fn of(class: Class) -> Self {
        Self {
            class_name: class.name().to_string(),
            loader_name: None,
            class: Mutex::new(Some(class)),
        }
    }

    #[inline]
    #[must_use]
    pub fn named(class_name: impl Into<String>, loader_name: Option<&str>) -> Self {
        Self {
            class_name: class_name.into(),
            loader_name: loader_name.map(String::from),
            class: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[inline]
    #[must_use]
    pub fn loader_name(&self) -> Option<&str> {
        self.loader_name.as_deref()
    }

    /// # Errors
    /// Returns an error if the class loader or the class cannot be found.
    pub fn target_class(&self, class_loader_provider: &dyn ClassLoaderProvider) -> InjectionResult<Class> {
        let mut class = self.class.lock();
        if let Some(class) = class.as_ref() {
            return Ok(class.clone());
        }

        let loaded = class_loader_provider.load_class(&self.class_name, self.loader_name.as_deref())?;
        debug!(class = %self.class_name, loader = ?self.loader_name, "Class resolved");
        *class = Some(loaded.clone());
        Ok(loaded)
    }
}

impl PartialEq for ClassDescription {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name && self.loader_name == other.loader_name
    }
}

impl Eq for ClassDescription {}

impl PartialOrd for ClassDescription {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassDescription {
    fn cmp(&self, other: &Self) -> Ordering {
        self.class_name
            .cmp(&other.class_name)
            .then_with(|| self.loader_name.cmp(&other.loader_name))
    }
}

impl From<Class> for ClassDescription {
    fn from(class: Class) -> Self {
        Self::of(class)
    }
}

impl Display for ClassDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.loader_name {
            Some(loader_name) => write!(f, "{}@{loader_name}", self.class_name),
            None => f.write_str(&self.class_name),
        }
    }
}

impl Debug for ClassDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescription")
            .field("class_name", &self.class_name)
            .field("loader_name", &self.loader_name)
            .field("resolved", &self.class.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ClassDescription;
    use crate::class::{Class, ClassLoader, ClassLoaderProvider as _, DefaultClassLoaderProvider};

    use alloc::{format, sync::Arc};

    struct Panel;

    #[test]
    fn test_resolve_once() {
        let provider = DefaultClassLoaderProvider::new();
        let loader = Arc::new(ClassLoader::new("ui"));
        loader.register(Class::opaque::<Panel>("Panel"));
        provider.register_class_loader("ui", Some(loader));

        let description = ClassDescription::named("Panel", Some("ui"));
        let class_1 = description.target_class(&provider).unwrap();

        provider.register_class_loader("ui", None);
        let class_2 = description.target_class(&provider).unwrap();

        assert!(class_1.ptr_eq(&class_2));
        assert_eq!(format!("{description}"), "Panel@ui");
    }

    #[test]
    fn test_unresolvable() {
        let provider = DefaultClassLoaderProvider::new();

        assert!(ClassDescription::named("Panel", None).target_class(&provider).is_err());
        assert!(ClassDescription::named("Panel", Some("ui")).target_class(&provider).is_err());
    }

    #[test]
    fn test_equality() {
        let class = Class::opaque::<Panel>("Panel");

        assert_eq!(ClassDescription::of(class.clone()), ClassDescription::named("Panel", None));
        assert_ne!(ClassDescription::of(class), ClassDescription::named("Panel", Some("ui")));
    }
}
