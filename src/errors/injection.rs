use alloc::string::String;

#[derive(thiserror::Error, Debug)]
pub enum InjectionErrorKind {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: &'static str },
    #[error("Cannot resolve named dependency `{name}`")]
    UnresolvableName { name: String },
    #[error("No bean provider for class `{class}` found")]
    UnresolvableClass { class: &'static str },
    #[error("Invalid dependency! This dependency does not belong to the current transaction: {dependency}")]
    NotInTransaction { dependency: String },
    #[error("Variable cannot be resolved: {name}")]
    UnknownVariable { name: String },
    #[error("Operation `{operation}` is not supported by this dependency provider")]
    Unsupported { operation: &'static str },
    #[error("Class loader is not registered: {name}")]
    UnknownClassLoader { name: String },
    #[error("Class `{name}` cannot be found")]
    ClassNotFound { name: String },
    #[error("Property `{property}` is not defined by class `{class}`")]
    UnknownProperty { class: String, property: String },
    #[error("Target class and instance must not both be absent: {invocation}")]
    NoTarget { invocation: String },
    #[error("No target instance to set property `{property}` on")]
    MissingTarget { property: String },
    #[error("Target instance of type `{actual}` is not compatible with class `{expected}`")]
    IncompatibleTarget { expected: &'static str, actual: &'static str },
    #[error("No match found for {signature}")]
    NoMatchingMember { signature: String },
    #[error("Multiple matches ({count}) found for {signature}")]
    AmbiguousMember { signature: String, count: usize },
    #[error("Cannot convert value of type `{from}` to `{to}`{}", .cause.as_ref().map(|cause| alloc::format!(": {cause}")).unwrap_or_default())]
    Conversion {
        from: &'static str,
        to: &'static str,
        cause: Option<anyhow::Error>,
    },
    #[error("Invocation of {signature} failed: {cause}")]
    Invocation { signature: String, cause: anyhow::Error },
    #[error("Class of the beans created by {provider} is unknown")]
    UnknownBeanClass { provider: String },
    #[error("Provider did not produce a bean: {provider}")]
    NoBean { provider: String },
    #[error("Unresolvable cyclic dependency {dependency} in bean provider {provider}")]
    CyclicDependency { dependency: String, provider: String },
    #[error("Bean providers required by `{dependency}` are locked by another transaction")]
    LockConflict { dependency: String },
}
