//! Error type shared by the buffer and the settings registry
//!
//! Only recoverable conditions travel through `RiftError`. Broken internal
//! invariants (reading past the end of a document, stale block positions,
//! a block larger than its allocation) panic instead.

use std::fmt;

/// Category of the error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Reading or writing a file failed
    Io,
    /// An option value could not be parsed
    Parse,
    /// Unknown option or a value outside its bounds
    Settings,
    /// Edit command refused (read-only buffer, range past the end)
    Execution,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "IO",
            Self::Parse => "Parse",
            Self::Settings => "Settings",
            Self::Execution => "Execution",
        };
        f.write_str(name)
    }
}

/// A structured error in rift-text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiftError {
    pub kind: ErrorType,
    /// Machine-readable error code (e.g., "READ_ONLY", "OUT_OF_RANGE")
    pub code: &'static str,
    pub message: String,
}

impl RiftError {
    pub fn new(kind: ErrorType, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn contains_msg(&self, sub: &str) -> bool {
        self.message.contains(sub)
    }
}

impl fmt::Display for RiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for RiftError {}

/// Result alias for rift-text operations
pub type Result<T> = std::result::Result<T, RiftError>;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
