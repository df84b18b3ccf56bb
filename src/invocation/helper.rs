use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use super::Invokable;
use crate::{dependency::Dependency, errors::InjectionResult, transaction::DependencyProvider, Bean};

/// Invokables without parameters, used as default initializers and shutdown handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperInvocation {
    /// Does nothing and returns no value.
    Null,
    /// Returns the target unchanged.
    Identity,
}

impl Invokable for HelperInvocation {
    fn parameter_dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    fn invoke(&self, _dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Option<Bean>> {
        match self {
            Self::Null => Ok(None),
            Self::Identity => Ok(target.cloned()),
        }
    }
}

impl Display for HelperInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NullInvocation"),
            Self::Identity => f.write_str("IdentityInvocation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HelperInvocation;
    use crate::{context::DefaultBeanContext, invocation::Invokable as _, transaction::DefaultDependencyProvider, Bean};

    #[test]
    fn test_helper_invocations() {
        let context = DefaultBeanContext::new(None);
        let dependency_provider = DefaultDependencyProvider::new(&context);
        let target = Bean::new(3u8);

        assert!(HelperInvocation::Null.invoke(&dependency_provider, Some(&target)).unwrap().is_none());
        assert!(HelperInvocation::Identity
            .invoke(&dependency_provider, Some(&target))
            .unwrap()
            .unwrap()
            .ptr_eq(&target));
        assert!(HelperInvocation::Identity.invoke(&dependency_provider, None).unwrap().is_none());
        assert!(HelperInvocation::Null.parameter_dependencies().is_empty());
    }
}
