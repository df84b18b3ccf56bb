use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString as _},
    sync::Arc,
};
use core::{
    any::TypeId,
    fmt::{self, Debug, Formatter},
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    any::TypeInfo,
    errors::{InjectionErrorKind, InjectionResult},
    service::{service_fn, BoxCloneService, Service as _},
    Bean,
};

pub(crate) type BoxedConverter = BoxCloneService<Bean, Bean, anyhow::Error>;

/// Converts beans to the types expected by constructors, methods and properties.
///
/// A value that already has the target type is passed through unchanged.
/// Otherwise the converter registered for the target type is used, looking it up in this helper first and then in
/// its parents. A helper created with [`ConversionHelper::new`] registers converters for the primitive types,
/// parsing them from `String` and `&'static str` values, and a converter formatting primitives into `String`.
pub struct ConversionHelper {
    parent: Option<Arc<ConversionHelper>>,
    converters: RwLock<BTreeMap<TypeId, BoxedConverter>>,
}

impl Default for ConversionHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionHelper {
    #[must_use]
    pub fn new() -> Self {
        let helper = Self {
            parent: None,
            converters: RwLock::new(BTreeMap::new()),
        };
        helper.register_default_converters();
        helper
    }

    /// Creates a helper without default converters, delegating to `parent` for unknown target types.
    #[inline]
    #[must_use]
    pub fn with_parent(parent: Arc<ConversionHelper>) -> Self {
        Self {
            parent: Some(parent),
            converters: RwLock::new(BTreeMap::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ConversionHelper>> {
        self.parent.as_ref()
    }

    /// Registers a converter producing values of type `T`, replacing an existing one for the same type.
    pub fn register_converter<T, F>(&self, converter: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Bean) -> anyhow::Result<T> + Clone + Send + Sync + 'static,
    {
        let boxed = BoxCloneService(Box::new(service_fn(move |bean: Bean| converter(&bean).map(Bean::new))));
        self.converters.write().insert(TypeId::of::<T>(), boxed);
    }

    #[must_use]
    pub fn has_converter(&self, target: &TypeInfo) -> bool {
        self.lookup(&target.id).is_some()
    }

    /// Converts `value` to the `target` type.
    ///
    /// # Errors
    /// Returns [`InjectionErrorKind::Conversion`] if no converter is known for the target type,
    /// if the converter fails or if it produces a value of another type.
    pub fn convert(&self, target: TypeInfo, value: Bean) -> InjectionResult<Bean> {
        let source = value.type_info();
        if source == target {
            return Ok(value);
        }

        let Some(mut converter) = self.lookup(&target.id) else {
            let err = InjectionErrorKind::Conversion {
                from: source.name,
                to: target.name,
                cause: None,
            };
            warn!("{}", err);
            return Err(err);
        };

        match converter.call(value) {
            Ok(converted) if converted.type_info() == target => {
                debug!(from = source.name, to = target.name, "Converted");
                Ok(converted)
            }
            Ok(converted) => {
                let err = InjectionErrorKind::Conversion {
                    from: source.name,
                    to: target.name,
                    cause: Some(anyhow::anyhow!("converter produced `{}`", converted.type_info())),
                };
                warn!("{}", err);
                Err(err)
            }
            Err(cause) => {
                let err = InjectionErrorKind::Conversion {
                    from: source.name,
                    to: target.name,
                    cause: Some(cause),
                };
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// Converts `value` to `T` and downcasts the result.
    ///
    /// # Errors
    /// See [`Self::convert`].
    pub fn convert_to<T: Send + Sync + 'static>(&self, value: Bean) -> InjectionResult<Arc<T>> {
        let target = TypeInfo::of::<T>();
        let source = value.type_info();
        self.convert(target, value)?.downcast().ok_or(InjectionErrorKind::Conversion {
            from: source.name,
            to: target.name,
            cause: None,
        })
    }

    fn lookup(&self, target: &TypeId) -> Option<BoxedConverter> {
        if let Some(converter) = self.converters.read().get(target) {
            return Some(converter.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(target))
    }

    fn register_default_converters(&self) {
        register_parse_converters!(self, [i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char]);

        self.register_converter::<String, _>(|bean: &Bean| {
            if let Some(text) = text_of(bean) {
                return Ok(String::from(text));
            }
            display_of(bean).ok_or_else(|| anyhow::anyhow!("unsupported source type `{}`", bean.type_info()))
        });
    }
}

impl Debug for ConversionHelper {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionHelper")
            .field("converters", &self.converters.read().len())
            .field("parent", &self.parent)
            .finish()
    }
}

#[must_use]
pub(crate) fn text_of(bean: &Bean) -> Option<&str> {
    bean.downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| bean.downcast_ref::<&'static str>().copied())
}

fn display_of(bean: &Bean) -> Option<String> {
    macro_rules! display_as {
        ([$($ty:ty),*]) => {
            $(
                if let Some(value) = bean.downcast_ref::<$ty>() {
                    return Some(value.to_string());
                }
            )*
        };
    }

    display_as!([i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char]);
    None
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::ConversionHelper;
    use crate::{any::TypeInfo, Bean, InjectionErrorKind};

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
    };
    use tracing_test::traced_test;

    struct Celsius(f64);

    #[test]
    fn test_same_type_passes_through() {
        let helper = ConversionHelper::new();
        let bean = Bean::new(5i32);

        let converted = helper.convert(TypeInfo::of::<i32>(), bean.clone()).unwrap();
        assert!(converted.ptr_eq(&bean));
    }

    #[test]
    #[traced_test]
    fn test_default_converters() {
        let helper = ConversionHelper::new();

        assert_eq!(*helper.convert_to::<i32>(Bean::new(String::from(" 42 "))).unwrap(), 42);
        assert!(*helper.convert_to::<bool>(Bean::new("true")).unwrap());
        assert_eq!(*helper.convert_to::<String>(Bean::new(7u8)).unwrap(), "7");
        assert!(matches!(
            helper.convert_to::<u8>(Bean::new("x")),
            Err(InjectionErrorKind::Conversion { cause: Some(_), .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_unknown_target_type() {
        let helper = ConversionHelper::new();

        assert!(matches!(
            helper.convert(TypeInfo::of::<Celsius>(), Bean::new(1.5f64)),
            Err(InjectionErrorKind::Conversion { cause: None, .. })
        ));
    }

    #[test]
    fn test_parent_lookup() {
        let parent = Arc::new(ConversionHelper::new());
        parent.register_converter::<Celsius, _>(|bean: &Bean| {
            bean.downcast_ref::<f64>()
                .map(|value| Celsius(*value))
                .ok_or_else(|| anyhow::anyhow!("not a number"))
        });
        let child = ConversionHelper::with_parent(parent.clone());

        assert!(child.has_converter(&TypeInfo::of::<Celsius>()));
        assert!(child.has_converter(&TypeInfo::of::<u16>()));
        assert_eq!(child.convert_to::<Celsius>(Bean::new(21.5f64)).unwrap().0, 21.5);
        assert!(!ConversionHelper::with_parent(Arc::new(ConversionHelper::new())).has_converter(&TypeInfo::of::<Celsius>()));
    }
}
