//! Error types for the hs-watcher crate.

use camino::Utf8PathBuf;

/// Errors that can occur during watcher operation.
///
/// # Error Recovery Strategy
///
/// - **Missing directory** ([`WatchError::MissingDirectory`]): recoverable -
///   the directory is skipped for that cycle and scanning continues.
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): recoverable - the
///   file is skipped.
/// - **Channel closed** ([`WatchError::ChannelClosed`]): fatal - the
///   background task is gone or unreachable.
/// - **I/O errors** ([`WatchError::Io`]): recoverable per file during a scan
///   (the file counts as unchanged for that cycle); fatal elsewhere.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A watched directory does not exist.
    #[error("watched directory does not exist: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// The watcher task ended unexpectedly or could not be joined.
    #[error("watcher task unreachable or ended unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    ///
    /// This crate uses UTF-8 paths throughout; non-UTF-8 files found during
    /// enumeration are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Returns `true` if scanning can continue past this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingDirectory(_) | Self::NonUtf8Path(_) | Self::Io(_)
        )
    }

    /// Returns `true` if the watcher should stop on this error.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_recoverable() {
        let err = WatchError::MissingDirectory(Utf8PathBuf::from("/gone"));
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("/gone"));
    }

    #[test]
    fn test_channel_closed_is_fatal() {
        let err = WatchError::ChannelClosed;
        assert!(!err.is_recoverable());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::NonUtf8Path(std::path::PathBuf::from("x"));
        assert!(err.is_recoverable());
    }
}
