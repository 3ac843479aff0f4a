//! Runtime orchestration and lifecycle management.
//!
//! - [`Runtime`] - Mounts models, starts their tasks and the completion router,
//!   and shuts everything down gracefully
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod runtime;
pub mod tracing;

pub use runtime::*;
pub use self::tracing::*;
