use alloc::{sync::Arc, vec::Vec};

use crate::{any::TypeInfo, Bean};

/// Extracts a typed argument from a bean.
///
/// The invocation helper converts every argument to [`FromBean::type_info`] before extraction.
pub trait FromBean: Sized + Send + Sync + 'static {
    fn type_info() -> TypeInfo;

    /// # Errors
    /// Returns an error if the bean has another type.
    fn from_bean(bean: &Bean) -> anyhow::Result<Self>;
}

/// Argument sharing the bean instance.
pub struct Inject<T>(pub Arc<T>);

impl<T: Send + Sync + 'static> FromBean for Inject<T> {
    #[inline]
    fn type_info() -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn from_bean(bean: &Bean) -> anyhow::Result<Self> {
        bean.downcast()
            .map(Self)
            .ok_or_else(|| anyhow::anyhow!("expected `{}`, got `{}`", TypeInfo::of::<T>(), bean.type_info()))
    }
}

/// Argument holding a copy of the bean value.
pub struct Value<T>(pub T);

impl<T: Clone + Send + Sync + 'static> FromBean for Value<T> {
    #[inline]
    fn type_info() -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn from_bean(bean: &Bean) -> anyhow::Result<Self> {
        bean.downcast_ref::<T>()
            .cloned()
            .map(Self)
            .ok_or_else(|| anyhow::anyhow!("expected `{}`, got `{}`", TypeInfo::of::<T>(), bean.type_info()))
    }
}

/// Constructors and static methods.
pub trait Function<Args>: Clone + Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn parameter_types() -> Vec<TypeInfo>;

    /// # Errors
    /// Returns an error if an argument is missing or has another type, or if the function fails.
    fn call(&mut self, arguments: &[Bean]) -> anyhow::Result<Self::Output>;
}

/// Instance methods, receiving the target instance before the arguments.
pub trait Method<Target, Args>: Clone + Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn parameter_types() -> Vec<TypeInfo>;

    /// # Errors
    /// Returns an error if an argument is missing or has another type, or if the method fails.
    fn call(&mut self, target: &Target, arguments: &[Bean]) -> anyhow::Result<Self::Output>;
}

fn next_argument<'a>(arguments: &mut impl Iterator<Item = &'a Bean>) -> anyhow::Result<&'a Bean> {
    arguments.next().ok_or_else(|| anyhow::anyhow!("missing argument"))
}

macro_rules! impl_function {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Response, $($ty,)*> Function<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> anyhow::Result<Response> + Clone + Send + Sync + 'static,
            Response: Send + Sync + 'static,
            $( $ty: FromBean, )*
        {
            type Output = Response;

            fn parameter_types() -> Vec<TypeInfo> {
                alloc::vec![$($ty::type_info(),)*]
            }

            fn call(&mut self, arguments: &[Bean]) -> anyhow::Result<Self::Output> {
                let mut arguments = arguments.iter();
                $( let $ty = $ty::from_bean(next_argument(&mut arguments)?)?; )*
                self($($ty,)*)
            }
        }
    };
}

macro_rules! impl_method {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Target, Response, $($ty,)*> Method<Target, ($($ty,)*)> for F
        where
            F: FnMut(&Target, $($ty,)*) -> anyhow::Result<Response> + Clone + Send + Sync + 'static,
            Target: 'static,
            Response: Send + Sync + 'static,
            $( $ty: FromBean, )*
        {
            type Output = Response;

            fn parameter_types() -> Vec<TypeInfo> {
                alloc::vec![$($ty::type_info(),)*]
            }

            fn call(&mut self, target: &Target, arguments: &[Bean]) -> anyhow::Result<Self::Output> {
                let mut arguments = arguments.iter();
                $( let $ty = $ty::from_bean(next_argument(&mut arguments)?)?; )*
                self(target, $($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_function);
all_the_tuples!(impl_method);

#[cfg(test)]
mod tests {
    use super::{FromBean as _, Function, Inject, Method, Value};
    use crate::{any::TypeInfo, Bean};

    use alloc::{string::String, vec::Vec};

    fn parameter_types<Args, F: Function<Args>>(_function: &F) -> Vec<TypeInfo> {
        F::parameter_types()
    }

    #[test]
    fn test_function_arguments() {
        let mut join = |Value(left): Value<String>, Value(right): Value<u8>| Ok::<_, anyhow::Error>(alloc::format!("{left}{right}"));

        assert_eq!(
            parameter_types(&join),
            [TypeInfo::of::<String>(), TypeInfo::of::<u8>()]
        );
        assert_eq!(
            Function::call(&mut join, &[Bean::new(String::from("a")), Bean::new(1u8)]).unwrap(),
            "a1"
        );
        assert!(Function::call(&mut join, &[Bean::new(String::from("a"))]).is_err());
        assert!(Function::call(&mut join, &[Bean::new(1u8), Bean::new(1u8)]).is_err());
    }

    #[test]
    fn test_method_arguments() {
        let mut add = |base: &u32, Value(value): Value<u32>| Ok::<_, anyhow::Error>(base + value);

        assert_eq!(Method::call(&mut add, &2, &[Bean::new(3u32)]).unwrap(), 5);
    }

    #[test]
    fn test_inject_shares_instance() {
        let bean = Bean::new(String::from("shared"));
        let Inject(value) = Inject::<String>::from_bean(&bean).unwrap();

        assert!(Bean::from_arc(value).ptr_eq(&bean));
    }
}
