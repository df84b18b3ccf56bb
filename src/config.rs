/// Config for a bean context
/// ## Fields
/// - `wait_for_locked_providers`:
///   If `true`, a bean request whose dependency graph contains a bean provider that is locked by another request
///   waits until that request has finished.
///
///   If `false`, the request fails with [`crate::InjectionErrorKind::LockConflict`] instead.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub wait_for_locked_providers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_for_locked_providers: true,
        }
    }
}
