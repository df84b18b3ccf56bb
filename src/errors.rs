mod injection;

pub use injection::InjectionErrorKind;

pub type InjectionResult<T> = Result<T, InjectionErrorKind>;
