//! # Framework Errors
//!
//! Errors raised by the framework itself. Failures of a remote call are not
//! errors in this sense: they become error commands (see
//! [`TransportError`](crate::framework::TransportError)).

/// Errors that can occur while compiling declarations or running tasks.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameworkError {
    #[error("Invalid {section} configuration: {reason}")]
    InvalidConfig { section: String, reason: String },
    #[error("Task {name} failed: {reason}")]
    TaskFailed { name: String, reason: String },
}
