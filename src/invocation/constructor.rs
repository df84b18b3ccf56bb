use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};
use tracing::{debug_span, error};

use super::{Invocation, Invokable};
use crate::{
    class::ClassDescription,
    dependency::Dependency,
    errors::InjectionResult,
    transaction::DependencyProvider,
    Bean,
};

/// Creates an instance of its target class.
#[derive(Debug)]
pub struct ConstructorInvocation {
    target_class: ClassDescription,
    invocation: Invocation,
}

impl ConstructorInvocation {
    /// # Errors
    /// Returns an error if parameter types are given for a different number of parameters.
    pub fn new(
        target_class: ClassDescription,
        parameter_types: Option<Vec<Option<ClassDescription>>>,
        parameters: Vec<Dependency>,
    ) -> InjectionResult<Self> {
        Ok(Self {
            target_class,
            invocation: Invocation::new(None, parameter_types, parameters)?,
        })
    }

    #[inline]
    #[must_use]
    pub const fn target_class(&self) -> &ClassDescription {
        &self.target_class
    }

    #[inline]
    #[must_use]
    pub const fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Creates the instance.
    ///
    /// # Errors
    /// Returns an error if the class or a parameter cannot be resolved or if the constructor fails.
    pub fn create(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let span = debug_span!("construct", invocation = %self);
        let _guard = span.enter();

        self.create_instance(dependency_provider).inspect_err(|err| error!("{}", err))
    }

    fn create_instance(&self, dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        let class_loader_provider = dependency_provider.class_loader_provider();
        let class = self.target_class.target_class(class_loader_provider)?;
        let parameter_types = self.invocation.resolved_parameter_types(class_loader_provider)?;
        let arguments = self.invocation.resolved_parameters(dependency_provider)?;

        dependency_provider
            .invocation_helper()
            .invoke_constructor(&class, &parameter_types, arguments)
    }
}

impl Invokable for ConstructorInvocation {
    fn parameter_dependencies(&self) -> Vec<Dependency> {
        self.invocation.parameters().to_vec()
    }

    /// Creates the instance, ignoring the target.
    fn invoke(&self, dependency_provider: &dyn DependencyProvider, _target: Option<&Bean>) -> InjectionResult<Option<Bean>> {
        self.create(dependency_provider).map(Some)
    }
}

impl Display for ConstructorInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}::new", self.target_class)?;
        self.invocation.fmt_parameters(f)
    }
}
