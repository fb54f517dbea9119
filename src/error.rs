//! Unified error type.

use std::fmt;

/// The error type returned by cauce's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as response
/// writes, not as `Error`s. This type surfaces the failures that abort a
/// request or the server itself: I/O, a missing injector binding resolved at
/// invocation time, or a handler that returned an error. A handler error is
/// carried unmodified — the server boundary decides what to do with it.
#[derive(Debug)]
pub enum Error {
    /// Binding a port, accepting a connection, or reading a served file.
    Io(std::io::Error),
    /// A required injector binding was absent when a handler's arguments
    /// were resolved. Carries the type name of the missing binding.
    MissingDependency(&'static str),
    /// A handler failed. Fatal to the request; no later handler runs.
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps any error value as a handler failure.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::MissingDependency(ty) => write!(f, "no injector binding for `{ty}`"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::MissingDependency(_) => None,
            Self::Handler(e) => Some(e.as_ref()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
