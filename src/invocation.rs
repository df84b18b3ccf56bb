mod chained;
mod constructor;
mod helper;
mod method;
mod property;

pub use chained::{ChainVariable, ChainVariables, ChainedInvocation};
pub use constructor::ConstructorInvocation;
pub use helper::HelperInvocation;
pub use method::MethodInvocation;
pub use property::SetPropertyInvocation;

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};
use tracing::warn;

use crate::{
    any::TypeInfo,
    class::{ClassDescription, ClassLoaderProvider},
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    transaction::DependencyProvider,
    Bean,
};

/// Something that can be executed against an optional target with parameters resolved by a transaction.
///
/// The transaction running an invokable has to be initialized with all of its
/// [`Invokable::parameter_dependencies`].
pub trait Invokable: Send + Sync + Display {
    fn parameter_dependencies(&self) -> Vec<Dependency>;

    /// # Errors
    /// Returns an error if a parameter cannot be resolved or if the call fails.
    fn invoke(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Option<Bean>>;
}

/// Parameters shared by the invocation kinds: target class, declared parameter types and parameter dependencies.
///
/// A parameter slot without declared type takes the type of the value it receives when an overload is selected.
#[derive(Debug)]
pub struct Invocation {
    target_class: Option<ClassDescription>,
    parameter_types: Vec<Option<ClassDescription>>,
    parameters: Vec<Dependency>,
}

impl Invocation {
    /// # Errors
    /// Returns [`InjectionErrorKind::InvalidArgument`] if parameter types are given for a different number of
    /// parameters.
    pub fn new(
        target_class: Option<ClassDescription>,
        parameter_types: Option<Vec<Option<ClassDescription>>>,
        parameters: Vec<Dependency>,
    ) -> InjectionResult<Self> {
        let parameter_types = match parameter_types {
            Some(parameter_types) if parameter_types.len() != parameters.len() => {
                let err = InjectionErrorKind::InvalidArgument {
                    message: "Number of parameter types does not match number of parameter dependencies",
                };
                warn!("{}", err);
                return Err(err);
            }
            Some(parameter_types) => parameter_types,
            None => parameters.iter().map(|_| None).collect(),
        };

        Ok(Self {
            target_class,
            parameter_types,
            parameters,
        })
    }

    #[inline]
    #[must_use]
    pub const fn target_class(&self) -> Option<&ClassDescription> {
        self.target_class.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn parameter_types(&self) -> &[Option<ClassDescription>] {
        &self.parameter_types
    }

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Dependency] {
        &self.parameters
    }

    /// Returns `true` if every parameter slot has a declared type.
    #[inline]
    #[must_use]
    pub fn is_type_info_complete(&self) -> bool {
        self.parameter_types.iter().all(Option::is_some)
    }

    /// Fetches the beans of all parameter dependencies from the transaction.
    ///
    /// # Errors
    /// Returns an error if a dependency does not belong to the transaction or its bean cannot be created.
    pub fn resolved_parameters(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Vec<Bean>> {
        self.parameters
            .iter()
            .map(|dependency| dependency_provider.get_dependent_bean(dependency))
            .collect()
    }

    /// Resolves the declared parameter types.
    ///
    /// # Errors
    /// Returns an error if a declared class cannot be loaded.
    pub fn resolved_parameter_types(&self, class_loader_provider: &dyn ClassLoaderProvider) -> InjectionResult<Vec<Option<TypeInfo>>> {
        self.parameter_types
            .iter()
            .map(|parameter_type| {
                parameter_type
                    .as_ref()
                    .map(|description| description.target_class(class_loader_provider).map(|class| class.type_info()))
                    .transpose()
            })
            .collect()
    }

    fn fmt_parameters(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (index, (dependency, parameter_type)) in self.parameters.iter().zip(&self.parameter_types).enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match parameter_type {
                Some(parameter_type) => write!(f, "{parameter_type}: {dependency}")?,
                None => write!(f, "{dependency}")?,
            }
        }
        f.write_str(")")
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(target_class) = &self.target_class {
            write!(f, "{target_class}")?;
        }
        self.fmt_parameters(f)
    }
}
