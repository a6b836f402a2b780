use std::fmt;

/// Errors surfaced by the engine.
///
/// Shape and bounds violations are not represented here: they are programming
/// errors and panic at the call site, the same way mismatched matrix sizes
/// always have.
#[derive(Debug)]
pub enum NnError {
    /// An arena could not satisfy an allocation.
    OutOfMemory {
        /// Bytes requested, rounded up to whole words.
        requested: usize,
        /// Bytes still free in the arena.
        remaining: usize,
    },
    /// The layer-width vector cannot describe a network.
    InvalidArchitecture(String),
    /// An activation selector that names no known function.
    UnknownActivation(String),
    /// A training configuration that fails validation.
    InvalidConfig(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for NnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnError::OutOfMemory { requested, remaining } => write!(
                f,
                "arena out of memory: requested {requested} bytes, {remaining} bytes remaining"
            ),
            NnError::InvalidArchitecture(msg) => write!(f, "invalid architecture: {msg}"),
            NnError::UnknownActivation(name) => write!(f, "unknown activation function: {name:?}"),
            NnError::InvalidConfig(msg) => write!(f, "invalid training config: {msg}"),
            NnError::Io(err) => write!(f, "i/o error: {err}"),
            NnError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for NnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NnError::Io(err) => Some(err),
            NnError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NnError {
    fn from(err: std::io::Error) -> Self {
        NnError::Io(err)
    }
}

impl From<serde_json::Error> for NnError {
    fn from(err: serde_json::Error) -> Self {
        NnError::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, NnError>;
