//! Error types for the hs-debug crate.

/// Errors from debug facility operations.
#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    /// No session with this id exists.
    #[error("unknown debug session '{0}'")]
    UnknownSession(String),

    /// The session has already ended.
    #[error("debug session '{0}' has already ended")]
    SessionEnded(String),

    /// A session with this id already exists.
    #[error("debug session '{0}' already exists")]
    SessionExists(String),

    /// Expression evaluation failed.
    ///
    /// The reason is a single redacted line; binding values never appear in
    /// it.
    #[error("failed to evaluate '{expression}': {reason}")]
    Evaluation {
        /// The offending expression (possibly truncated).
        expression: String,
        /// Single-line failure reason.
        reason: String,
    },

    /// An I/O error occurred (session dumps, log maintenance).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a session dump failed.
    #[error("failed to serialize session dump: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DebugError {
    /// Returns `true` for failures of session bookkeeping (unknown, ended,
    /// duplicate ids).
    #[inline]
    #[must_use]
    pub const fn is_session_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSession(_) | Self::SessionEnded(_) | Self::SessionExists(_)
        )
    }
}
