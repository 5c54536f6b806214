//! Error type shared by every relgraph crate.
//!
//! An [`Error`] tells the caller what failed ([`ErrorKind`]), whether trying
//! again can help ([`ErrorStatus`]), and where in a run it happened: the
//! description line, the diagram being exported and the operations it was
//! propagated through.
//!
//! ```rust
//! use relgraph_error::{Error, ErrorKind};
//!
//! let err = Error::parse_failed("app::Host[label]", "option 'label' has no value")
//!     .with_operation("description::parse")
//!     .in_diagram("hosts");
//! assert_eq!(err.kind(), ErrorKind::ParseFailed);
//! assert_eq!(err.line(), Some("app::Host[label]"));
//! ```
//!
//! Lower layers create errors; callers further up only add location
//! (`with_line`, `in_diagram`, `with_operation`) and never re-wrap.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

pub type Result<T> = std::result::Result<T, Error>;
