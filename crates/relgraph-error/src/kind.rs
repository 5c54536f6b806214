use strum_macros::Display;

use crate::ErrorStatus;

/// What went wrong.
///
/// Description and model problems are permanent for a given input; file
/// I/O and the layout program may succeed on a second attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Syntax the engine understands but does not implement, e.g. `ns::T` filters.
    Unsupported,
    /// Bad export settings or an inconsistent model document.
    ConfigInvalid,
    /// Malformed description line.
    ParseFailed,
    /// Unknown type, instance or attribute.
    SymbolNotFound,
    /// An attribute value has the wrong shape for its use.
    TypeMismatch,
    FileNotFound,
    PermissionDenied,
    IoFailed,
    /// The layout program failed to start or exited non-zero.
    ExternalToolFailed,
    /// A model document or config file is not valid JSON/TOML.
    DeserializationFailed,
}

impl ErrorKind {
    pub fn default_status(self) -> ErrorStatus {
        match self {
            ErrorKind::IoFailed | ErrorKind::ExternalToolFailed => ErrorStatus::Temporary,
            _ => ErrorStatus::Permanent,
        }
    }
}
