//! Error types for hook setup

/// Error type for hook operations
///
/// Errors raised by a hooked callable itself are the caller's own error type
/// and pass through untouched; this enum only covers setup-time failures and
/// lookups by name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// The named member to hook or detach does not exist or is not callable
    #[error("Invalid target: '{0}' is not a callable member")]
    InvalidTarget(String),

    /// A dynamic call by name resolved to nothing
    #[error("Method not found: {0}")]
    MissingMethod(String),
}

/// Result type for hook setup
pub type HookResult<T> = Result<T, HookError>;
