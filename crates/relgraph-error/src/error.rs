use std::fmt;

use crate::{ErrorKind, ErrorStatus};

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failed relgraph step.
///
/// Besides kind and message, an error remembers where in a run it happened:
/// the description line being processed, the diagram being exported and the
/// operations it passed through, innermost first. Anything else goes into
/// free-form `key=value` details.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    status: ErrorStatus,
    message: String,
    line: Option<String>,
    diagram: Option<String>,
    trail: Vec<&'static str>,
    details: Vec<(&'static str, String)>,
    source: Option<BoxedSource>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.default_status(),
            message: message.into(),
            line: None,
            diagram: None,
            trail: Vec::new(),
            details: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Description line the error was raised for.
    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    /// Diagram whose export failed.
    pub fn diagram(&self) -> Option<&str> {
        self.diagram.as_deref()
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attach the description line. The innermost line wins.
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        if self.line.is_none() {
            self.line = Some(line.into());
        }
        self
    }

    /// Attach the diagram name. The innermost name wins.
    pub fn in_diagram(mut self, name: impl Into<String>) -> Self {
        if self.diagram.is_none() {
            self.diagram = Some(name.into());
        }
        self
    }

    /// Record an operation the error propagated through.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if self.trail.last() != Some(&operation) {
            self.trail.push(operation);
        }
        self
    }

    pub fn with_detail(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.details.push((key, value.into()));
        self
    }

    pub fn set_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// A retry failed as well.
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(diagram) = &self.diagram {
            write!(f, " [diagram {diagram}]")?;
        }
        if let Some(line) = &self.line {
            write!(f, " [line {line:?}]")?;
        }
        for (key, value) in &self.details {
            write!(f, " {key}={value}")?;
        }
        write!(f, " ({}", self.status)?;
        if !self.trail.is_empty() {
            write!(f, ", in {}", self.trail.join(" <- "))?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string()).set_source(err)
    }
}

impl Error {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    /// Malformed description line.
    pub fn parse_failed(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message).with_line(line)
    }

    /// Unknown type or instance.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self::new(ErrorKind::SymbolNotFound, format!("'{symbol}' not found in model"))
            .with_detail("symbol", symbol)
    }

    pub fn attribute_not_found(owner: impl Into<String>, attribute: impl Into<String>) -> Self {
        let owner = owner.into();
        let attribute = attribute.into();
        Self::new(
            ErrorKind::SymbolNotFound,
            format!("'{owner}' has no attribute '{attribute}'"),
        )
        .with_detail("attribute", attribute)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// The layout program could not be started or exited with failure.
    pub fn external_tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalToolFailed, message).with_detail("tool", tool)
    }
}
