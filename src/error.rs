use std::{fmt, io};

use crate::id::Id;

/// Error conditions raised by the tree engine.
///
/// Variants map onto the error taxonomy of the core: illegal arguments
/// (`Misuse`), operations disallowed by `ReadWriteMode` (`ModeViolation`),
/// broken structural or metric invariants (`Invariant`), optimistic
/// concurrency conflicts (`ConcurrentModification`), asking for search
/// results before `execute` (`State`), and opaque failures bubbled up from
/// a `DataStore` (`Backend`).
#[derive(Debug)]
pub enum Error {
    Misuse(String),
    ModeViolation(String),
    Invariant(String),
    ConcurrentModification {
        expected: Option<Id>,
        found: Option<Id>,
    },
    State(String),
    Backend(String),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Misuse(msg) => write!(f, "misuse: {}", msg),
            Error::ModeViolation(msg) => write!(f, "mode-violation: {}", msg),
            Error::Invariant(msg) => write!(f, "invariant: {}", msg),
            Error::ConcurrentModification { expected, found } => write!(
                f,
                "concurrent-modification: expected {:?}, found {:?}",
                expected, found
            ),
            Error::State(msg) => write!(f, "state: {}", msg),
            Error::Backend(msg) => write!(f, "backend: {}", msg),
            Error::Io(err) => write!(f, "backend io: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
