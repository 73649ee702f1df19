#![forbid(unsafe_code)]

//! Errors raised by container and wiring operations.
//!
//! Every error is reported before the failing operation mutates any state.
//! [`Container::clear_mocks`](crate::Container::clear_mocks) holds this per
//! mocked name.
//! Callers that want "not satisfiable right now" as a plain boolean pass
//! `relaxed = true` to [`Container::wire`](crate::Container::wire) and
//! [`Container::unwire`](crate::Container::unwire) instead of matching on
//! these variants.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors from registry and wiring operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// `add` was called with a name that is already registered.
    #[error("object already exists: {0}")]
    DuplicateName(String),
    /// The name is neither registered nor mocked.
    #[error("no object with this name found: {0}")]
    NotFound(String),
    /// Strict `wire` on an object that already carries a wired marker.
    #[error("object already wired: {0}")]
    AlreadyWired(String),
    /// Strict `unwire` on an object that is not wired.
    #[error("object was not wired: {0}")]
    NotWired(String),
    /// The object is wired, but under another name.
    #[error("object wired as '{wired_as}' cannot be unwired as '{name}'")]
    WiredUnderDifferentName {
        /// The name the caller used.
        name: String,
        /// The name the object is actually wired under.
        wired_as: String,
    },
    /// Event bindings were declared against an object that emits no events.
    #[error("'{target}' is not an event source; '{dependent}' declares event bindings on it")]
    NotAnEventSource {
        /// Name of the target without an event source.
        target: String,
        /// Name of the object declaring the bindings.
        dependent: String,
    },
    /// A handler names a method the scope object does not expose.
    #[error("'{scope}' exposes no method named '{method}'")]
    UnknownMethod {
        /// Name of the scope object the method was looked up on.
        scope: String,
        /// The method name that did not resolve.
        method: String,
    },
}

impl WireError {
    /// The object name the error is about.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::DuplicateName(name)
            | Self::NotFound(name)
            | Self::AlreadyWired(name)
            | Self::NotWired(name)
            | Self::WiredUnderDifferentName { name, .. } => name,
            Self::NotAnEventSource { dependent, .. } => dependent,
            Self::UnknownMethod { scope, .. } => scope,
        }
    }
}
