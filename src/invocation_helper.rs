use alloc::{
    string::{String, ToString as _},
    sync::Arc,
    vec::Vec,
};
use tracing::{debug, warn};

use crate::{
    any::TypeInfo,
    class::{Class, Member, CONSTRUCTOR_NAME},
    conversion::ConversionHelper,
    errors::{InjectionErrorKind, InjectionResult},
    Bean,
};

/// Selects and calls constructors, methods and property setters of classes.
///
/// Members are selected by name and number of arguments. If several overloads remain, the declared parameter types
/// are compared first; slots without declared type are matched against the runtime types of the arguments.
/// Arguments are converted to the parameter types of the selected member before the call.
#[derive(Debug, Clone)]
pub struct InvocationHelper {
    conversion_helper: Arc<ConversionHelper>,
}

impl Default for InvocationHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationHelper {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_conversion_helper(Arc::new(ConversionHelper::new()))
    }

    #[inline]
    #[must_use]
    pub const fn with_conversion_helper(conversion_helper: Arc<ConversionHelper>) -> Self {
        Self { conversion_helper }
    }

    #[inline]
    #[must_use]
    pub fn conversion_helper(&self) -> &Arc<ConversionHelper> {
        &self.conversion_helper
    }

    /// Creates an instance of `class`.
    ///
    /// # Errors
    /// Returns an error if no constructor matches, if an argument cannot be converted or if the constructor fails.
    pub fn invoke_constructor(&self, class: &Class, parameter_types: &[Option<TypeInfo>], arguments: Vec<Bean>) -> InjectionResult<Bean> {
        let constructor = select(class, CONSTRUCTOR_NAME, class.constructors().iter(), parameter_types, &arguments)?;
        let arguments = self.convert_arguments(constructor, arguments)?;

        match constructor.call(None, arguments) {
            Ok(Some(bean)) => {
                debug!(class = class.name(), "Instance created");
                Ok(bean)
            }
            Ok(None) => {
                let err = InjectionErrorKind::NoBean {
                    provider: signature(class, CONSTRUCTOR_NAME, parameter_types, constructor.parameter_types().len()),
                };
                warn!("{}", err);
                Err(err)
            }
            Err(cause) => Err(invocation_error(class, CONSTRUCTOR_NAME, parameter_types, cause)),
        }
    }

    /// Calls an instance method of `class` on `target`.
    ///
    /// # Errors
    /// Returns an error if the target is not an instance of the class, if no method matches,
    /// if an argument cannot be converted or if the method fails.
    pub fn invoke_instance_method(
        &self,
        class: &Class,
        method: &str,
        target: &Bean,
        parameter_types: &[Option<TypeInfo>],
        arguments: Vec<Bean>,
    ) -> InjectionResult<Option<Bean>> {
        check_target(class, target)?;

        let candidates = class.methods_named(method).filter(|member| !member.is_static());
        let member = select(class, method, candidates, parameter_types, &arguments)?;
        let arguments = self.convert_arguments(member, arguments)?;

        member
            .call(Some(target.clone()), arguments)
            .map_err(|cause| invocation_error(class, method, parameter_types, cause))
    }

    /// Calls a static method of `class`.
    ///
    /// # Errors
    /// Returns an error if no method matches, if an argument cannot be converted or if the method fails.
    pub fn invoke_static_method(
        &self,
        class: &Class,
        method: &str,
        parameter_types: &[Option<TypeInfo>],
        arguments: Vec<Bean>,
    ) -> InjectionResult<Option<Bean>> {
        let candidates = class.methods_named(method).filter(|member| member.is_static());
        let member = select(class, method, candidates, parameter_types, &arguments)?;
        let arguments = self.convert_arguments(member, arguments)?;

        member
            .call(None, arguments)
            .map_err(|cause| invocation_error(class, method, parameter_types, cause))
    }

    /// Sets a property of `target`, converting the value to the property type.
    ///
    /// # Errors
    /// Returns an error if the class does not define the property, if the value cannot be converted
    /// or if the setter fails.
    pub fn set_property(&self, class: &Class, target: &Bean, property: &str, value: Bean) -> InjectionResult<()> {
        check_target(class, target)?;

        let Some(setter) = class.property(property) else {
            let err = InjectionErrorKind::UnknownProperty {
                class: class.name().to_string(),
                property: property.to_string(),
            };
            warn!("{}", err);
            return Err(err);
        };

        let value = self.conversion_helper.convert(setter.type_info(), value)?;
        setter.set(target.clone(), value).map_err(|cause| {
            let err = InjectionErrorKind::Invocation {
                signature: alloc::format!("{}.{property}", class.name()),
                cause,
            };
            warn!("{}", err);
            err
        })
    }

    fn convert_arguments(&self, member: &Member, arguments: Vec<Bean>) -> InjectionResult<Vec<Bean>> {
        arguments
            .into_iter()
            .zip(member.parameter_types())
            .map(|(argument, parameter_type)| self.conversion_helper.convert(*parameter_type, argument))
            .collect()
    }
}

fn check_target(class: &Class, target: &Bean) -> InjectionResult<()> {
    if class.is_instance(target) {
        return Ok(());
    }

    let err = InjectionErrorKind::IncompatibleTarget {
        expected: class.type_info().name,
        actual: target.type_info().name,
    };
    warn!("{}", err);
    Err(err)
}

fn select<'a>(
    class: &Class,
    name: &str,
    candidates: impl Iterator<Item = &'a Member>,
    parameter_types: &[Option<TypeInfo>],
    arguments: &[Bean],
) -> InjectionResult<&'a Member> {
    let by_arity: Vec<&Member> = candidates
        .filter(|member| member.parameter_types().len() == arguments.len())
        .collect();

    let strict: Vec<&Member> = by_arity
        .iter()
        .copied()
        .filter(|member| matches_declared(member, parameter_types))
        .collect();
    let mut remaining = if strict.is_empty() { by_arity } else { strict };

    if remaining.len() > 1 {
        let effective_types: Vec<TypeInfo> = arguments
            .iter()
            .enumerate()
            .map(|(index, argument)| {
                parameter_types
                    .get(index)
                    .copied()
                    .flatten()
                    .unwrap_or_else(|| argument.type_info())
            })
            .collect();
        let exact: Vec<&Member> = remaining
            .iter()
            .copied()
            .filter(|member| member.parameter_types() == effective_types.as_slice())
            .collect();
        if !exact.is_empty() {
            remaining = exact;
        }
    }

    match remaining.as_slice() {
        [member] => Ok(*member),
        [] => {
            let err = InjectionErrorKind::NoMatchingMember {
                signature: signature(class, name, parameter_types, arguments.len()),
            };
            warn!("{}", err);
            Err(err)
        }
        members => {
            let err = InjectionErrorKind::AmbiguousMember {
                signature: signature(class, name, parameter_types, arguments.len()),
                count: members.len(),
            };
            warn!("{}", err);
            Err(err)
        }
    }
}

fn matches_declared(member: &Member, parameter_types: &[Option<TypeInfo>]) -> bool {
    member
        .parameter_types()
        .iter()
        .zip(parameter_types)
        .all(|(actual, declared)| declared.map_or(true, |declared| declared == *actual))
}

fn signature(class: &Class, name: &str, parameter_types: &[Option<TypeInfo>], arity: usize) -> String {
    let mut signature = alloc::format!("{}::{name}(", class.name());
    for index in 0..arity {
        if index > 0 {
            signature.push_str(", ");
        }
        match parameter_types.get(index).copied().flatten() {
            Some(type_info) => signature.push_str(type_info.short_name()),
            None => signature.push('?'),
        }
    }
    signature.push(')');
    signature
}

fn invocation_error(class: &Class, name: &str, parameter_types: &[Option<TypeInfo>], cause: anyhow::Error) -> InjectionErrorKind {
    let err = InjectionErrorKind::Invocation {
        signature: signature(class, name, parameter_types, parameter_types.len()),
        cause,
    };
    warn!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::InvocationHelper;
    use crate::{
        any::TypeInfo,
        class::{Class, Inject, Value},
        Bean, InjectionErrorKind,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec::Vec,
    };
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    struct Label {
        text: Mutex<String>,
        width: Mutex<u32>,
    }

    fn label_class() -> Class {
        Class::builder::<Label>("Label")
            .constructor(|| {
                Ok(Label {
                    text: Mutex::new(String::new()),
                    width: Mutex::new(0),
                })
            })
            .constructor(|Value(text): Value<String>| {
                Ok(Label {
                    text: Mutex::new(text),
                    width: Mutex::new(0),
                })
            })
            .constructor(|Value(width): Value<u32>| {
                Ok(Label {
                    text: Mutex::new(String::new()),
                    width: Mutex::new(width),
                })
            })
            .method("append", |label: &Label, Value(text): Value<String>| {
                label.text.lock().push_str(&text);
                Ok(())
            })
            .method("text", |label: &Label| Ok(label.text.lock().clone()))
            .method("fail", |_: &Label| Err::<(), _>(anyhow::anyhow!("broken label")))
            .static_method("empty", || {
                Ok(Label {
                    text: Mutex::new(String::new()),
                    width: Mutex::new(0),
                })
            })
            .property("width", |label: &Label, Value(width): Value<u32>| {
                *label.width.lock() = width;
                Ok(())
            })
            .build()
    }

    #[test]
    #[traced_test]
    fn test_overload_by_runtime_type() {
        let helper = InvocationHelper::new();
        let class = label_class();

        let label = helper
            .invoke_constructor(&class, &[None], Vec::from([Bean::new(String::from("title"))]))
            .unwrap();
        assert_eq!(*label.downcast_ref::<Label>().unwrap().text.lock(), "title");

        let label = helper.invoke_constructor(&class, &[None], Vec::from([Bean::new(12u32)])).unwrap();
        assert_eq!(*label.downcast_ref::<Label>().unwrap().width.lock(), 12);
    }

    #[test]
    #[traced_test]
    fn test_overload_by_declared_type() {
        let helper = InvocationHelper::new();
        let class = label_class();

        let label = helper
            .invoke_constructor(&class, &[Some(TypeInfo::of::<u32>())], Vec::from([Bean::new("40")]))
            .unwrap();
        assert_eq!(*label.downcast_ref::<Label>().unwrap().width.lock(), 40);
    }

    #[test]
    #[traced_test]
    fn test_ambiguous_and_missing() {
        let helper = InvocationHelper::new();
        let class = label_class();

        assert!(matches!(
            helper.invoke_constructor(&class, &[None], Vec::from([Bean::new(1.5f64)])),
            Err(InjectionErrorKind::AmbiguousMember { count: 2, .. })
        ));
        assert!(matches!(
            helper.invoke_constructor(&class, &[None, None], Vec::from([Bean::new(1u32), Bean::new(2u32)])),
            Err(InjectionErrorKind::NoMatchingMember { signature }) if signature.ends_with("(?, ?)")
        ));
        assert!(matches!(
            helper.invoke_constructor(
                &class,
                &[Some(TypeInfo::of::<u32>()), None],
                Vec::from([Bean::new(1u32), Bean::new(2u32)])
            ),
            Err(InjectionErrorKind::NoMatchingMember { signature }) if signature.ends_with("(u32, ?)")
        ));
    }

    #[test]
    #[traced_test]
    fn test_methods() {
        let helper = InvocationHelper::new();
        let class = label_class();
        let label = helper.invoke_constructor(&class, &[], Vec::new()).unwrap();

        let result = helper
            .invoke_instance_method(&class, "append", &label, &[None], Vec::from([Bean::new(String::from("ab"))]))
            .unwrap();
        assert!(result.is_none());

        let text = helper.invoke_instance_method(&class, "text", &label, &[], Vec::new()).unwrap().unwrap();
        assert_eq!(text.downcast_ref::<String>().unwrap(), "ab");

        let created = helper.invoke_static_method(&class, "empty", &[], Vec::new()).unwrap().unwrap();
        assert!(class.is_instance(&created));
        assert!(helper.invoke_static_method(&class, "text", &[], Vec::new()).is_err());

        assert!(matches!(
            helper.invoke_instance_method(&class, "fail", &label, &[], Vec::new()),
            Err(InjectionErrorKind::Invocation { .. })
        ));
        assert!(matches!(
            helper.invoke_instance_method(&class, "text", &Bean::new(1u8), &[], Vec::new()),
            Err(InjectionErrorKind::IncompatibleTarget { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_set_property() {
        let helper = InvocationHelper::new();
        let class = label_class();
        let label = helper.invoke_constructor(&class, &[], Vec::new()).unwrap();

        helper.set_property(&class, &label, "width", Bean::new(String::from("25"))).unwrap();
        assert_eq!(*label.downcast_ref::<Label>().unwrap().width.lock(), 25);

        assert!(matches!(
            helper.set_property(&class, &label, "height", Bean::new(1u32)),
            Err(InjectionErrorKind::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_inject_conversion_is_identity() {
        struct Holder(Arc<Label>);

        let label_class = label_class();
        let holder_class = Class::builder::<Holder>("Holder")
            .constructor(|Inject(label): Inject<Label>| Ok(Holder(label)))
            .build();
        let helper = InvocationHelper::new();

        let label = helper.invoke_constructor(&label_class, &[], Vec::new()).unwrap();
        let holder = helper
            .invoke_constructor(&holder_class, &[None], Vec::from([label.clone()]))
            .unwrap();
        assert!(Bean::from_arc(holder.downcast_ref::<Holder>().unwrap().0.clone()).ptr_eq(&label));
    }
}
