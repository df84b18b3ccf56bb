use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString as _},
    sync::Arc,
    vec::Vec,
};
use core::fmt::{self, Display, Formatter};
use parking_lot::Mutex;
use tracing::{debug, debug_span, warn};

use super::Invokable;
use crate::{
    any::TypeInfo,
    dependency::Dependency,
    errors::{InjectionErrorKind, InjectionResult},
    provider::{BeanProvider, LockId},
    transaction::DependencyProvider,
    Bean,
};

/// Local variables of a [`ChainedInvocation`].
///
/// Cloning returns a handle to the same variables, so invokables of a chain can read and write them.
#[derive(Clone, Default)]
pub struct ChainVariables(Arc<Mutex<BTreeMap<String, Bean>>>);

impl ChainVariables {
    /// # Errors
    /// Returns [`InjectionErrorKind::UnknownVariable`] if the variable is not set.
    pub fn get(&self, name: &str) -> InjectionResult<Bean> {
        self.0.lock().get(name).cloned().ok_or_else(|| {
            let err = InjectionErrorKind::UnknownVariable { name: name.to_string() };
            warn!("{}", err);
            err
        })
    }

    pub fn set(&self, name: impl Into<String>, value: Bean) {
        self.0.lock().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Bean> {
        self.0.lock().remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.lock().contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.0.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl fmt::Debug for ChainVariables {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.lock().iter()).finish()
    }
}

/// A local variable of a chain used as dependency.
///
/// It resolves to itself, needs no other dependencies, is never locked and reads its bean from the chain variables.
pub struct ChainVariable {
    name: String,
    variables: ChainVariables,
}

impl ChainVariable {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl BeanProvider for ChainVariable {
    fn get_bean(&self, _dependency_provider: &dyn DependencyProvider) -> InjectionResult<Bean> {
        self.variables.get(&self.name)
    }

    fn bean_class(&self, _dependency_provider: &dyn DependencyProvider) -> InjectionResult<TypeInfo> {
        Err(InjectionErrorKind::UnknownBeanClass {
            provider: alloc::format!("Variable({})", self.name),
        })
    }

    fn dependencies(&self) -> BTreeSet<Dependency> {
        BTreeSet::new()
    }

    fn lock_id(&self) -> Option<LockId> {
        None
    }

    fn set_lock_id(&self, _lock_id: Option<LockId>) {}
}

struct ChainStep {
    invokable: Box<dyn Invokable>,
    result: Option<String>,
    source: Option<String>,
}

/// A script of invokables executed in order against a common target.
///
/// Each step runs against the value of its source variable, or against the target of the chain if it has none.
/// The value returned by a step is stored in its result variable; a step returning no value removes the variable.
///
/// The variables are shared by all invocations of the chain, so a chain must not be invoked concurrently.
pub struct ChainedInvocation {
    steps: Vec<ChainStep>,
    variables: ChainVariables,
    chain_dependencies: Mutex<BTreeMap<String, Arc<ChainVariable>>>,
    result_variable_name: Option<String>,
    clear_variables: bool,
}

impl Default for ChainedInvocation {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainedInvocation {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            variables: ChainVariables::default(),
            chain_dependencies: Mutex::new(BTreeMap::new()),
            result_variable_name: None,
            clear_variables: true,
        }
    }

    #[inline]
    pub fn add_invokable(&mut self, invokable: impl Invokable + 'static) {
        self.add_step(invokable, None, None);
    }

    /// Adds a step storing its result in the `result` variable and running against the `source` variable.
    pub fn add_step(&mut self, invokable: impl Invokable + 'static, result: Option<&str>, source: Option<&str>) {
        self.steps.push(ChainStep {
            invokable: Box::new(invokable),
            result: result.map(String::from),
            source: source.map(String::from),
        });
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn invokables(&self) -> impl Iterator<Item = &dyn Invokable> {
        self.steps.iter().map(|step| &*step.invokable)
    }

    /// Returns the dependency on the variable `name`. Repeated calls return the same dependency.
    #[must_use]
    pub fn chain_dependency(&self, name: &str) -> Dependency {
        Dependency::Variable(self.variable_provider(name))
    }

    /// Returns the bean provider of the variable `name`.
    #[must_use]
    pub fn variable_provider(&self, name: &str) -> Arc<ChainVariable> {
        self.chain_dependencies
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(ChainVariable {
                    name: name.to_string(),
                    variables: self.variables.clone(),
                })
            })
            .clone()
    }

    #[inline]
    #[must_use]
    pub const fn variables(&self) -> &ChainVariables {
        &self.variables
    }

    /// # Errors
    /// Returns [`InjectionErrorKind::UnknownVariable`] if the variable is not set.
    #[inline]
    pub fn variable(&self, name: &str) -> InjectionResult<Bean> {
        self.variables.get(name)
    }

    #[inline]
    pub fn set_variable(&self, name: impl Into<String>, value: Bean) {
        self.variables.set(name, value);
    }

    #[inline]
    #[must_use]
    pub fn variable_names(&self) -> BTreeSet<String> {
        self.variables.names()
    }

    #[inline]
    #[must_use]
    pub fn result_variable_name(&self) -> Option<&str> {
        self.result_variable_name.as_deref()
    }

    /// Makes the chain return the value of this variable instead of its target.
    #[inline]
    pub fn set_result_variable_name(&mut self, name: Option<String>) {
        self.result_variable_name = name;
    }

    #[inline]
    #[must_use]
    pub const fn is_clear_variables(&self) -> bool {
        self.clear_variables
    }

    /// Disabling the clearing keeps variables set before the chain is invoked.
    #[inline]
    pub fn set_clear_variables(&mut self, clear_variables: bool) {
        self.clear_variables = clear_variables;
    }

    fn run_step(&self, step: &ChainStep, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<()> {
        let source = step.source.as_deref().map(|source| self.variables.get(source)).transpose()?;
        let result = step.invokable.invoke(dependency_provider, source.as_ref().or(target))?;

        if let Some(result_name) = &step.result {
            match result {
                Some(value) => self.variables.set(result_name.as_str(), value),
                None => {
                    self.variables.remove(result_name);
                }
            }
        }
        Ok(())
    }
}

impl Invokable for ChainedInvocation {
    /// Deduplicated dependencies of all steps.
    fn parameter_dependencies(&self) -> Vec<Dependency> {
        self.steps
            .iter()
            .flat_map(|step| step.invokable.parameter_dependencies())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn invoke(&self, dependency_provider: &dyn DependencyProvider, target: Option<&Bean>) -> InjectionResult<Option<Bean>> {
        let span = debug_span!("chain", steps = self.steps.len());
        let _guard = span.enter();

        if self.clear_variables {
            self.variables.clear();
        }

        for step in &self.steps {
            self.run_step(step, dependency_provider, target)?;
        }
        debug!("Chain completed");

        match &self.result_variable_name {
            Some(name) => self.variables.get(name).map(Some),
            None => Ok(target.cloned()),
        }
    }
}

impl Display for ChainedInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("ChainedInvocation[")?;
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            if let Some(result) = &step.result {
                write!(f, "(result={result})")?;
            }
            if let Some(source) = &step.source {
                write!(f, "(source={source})")?;
            }
            write!(f, "{}", step.invokable)?;
        }
        f.write_str("]")
    }
}
