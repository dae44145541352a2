use std::path::PathBuf;
use thiserror::Error;

use crate::di::Key;

pub type Result<T> = std::result::Result<T, WeftError>;

#[derive(Debug, Error)]
pub enum WeftError {
    /// Nothing is bound for the key and it cannot be constructed implicitly.
    #[error("Unbound: {key}\nSee the binding log: {}", log.display())]
    Unbound { key: Key, log: PathBuf },

    /// The store kept reporting an untargeted key after it was bound just in time.
    #[error("Resolution loop: {key} was bound just in time but is still untargeted")]
    ResolutionLoop { key: Key },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Failed to materialize null object for {interface}: {message}")]
    Materialization { interface: String, message: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Binding already registered: {key}")]
    AlreadyBound { key: Key },

    #[error("Method not found: {class}::{method}")]
    MethodNotFound { class: String, method: String },

    #[error("Missing argument: {name}")]
    MissingArgument { name: String },

    #[error("No method invocation in progress")]
    NoInvocation,

    #[error("Injector has been dropped")]
    InjectorDropped,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A user supplied constructor, setter or method body failed.
    #[error("Provision failed: {0}")]
    Provision(#[from] anyhow::Error),
}

impl WeftError {
    pub fn materialization(interface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Materialization {
            interface: interface.into(),
            message: message.into(),
        }
    }

    pub fn downcast_failed(type_name: impl Into<String>) -> Self {
        Self::DowncastFailed {
            type_name: type_name.into(),
        }
    }
}
