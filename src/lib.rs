#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # API Model
//!
//! > **Declare your endpoints once; get commands, handlers and loading state for free.**
//!
//! This crate compiles declarative API endpoint definitions into a command-driven
//! runtime built on Tokio. An application says *what* it calls (`GET /users/:id`,
//! a REST resource at `/orders`) and the framework produces the command names,
//! command creators, handler tasks, loading flags and success / error commands.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Commands in, commands out
//!
//! Nothing calls the network directly. A component dispatches a request command;
//! the endpoint's task performs the call; the completion router dispatches a
//! success or an error command. State changes only through state transitions
//! applied to those commands, so every observer sees the same ordered stream.
//!
//! ### Names are data
//!
//! Command names are derived deterministically from `(model, method, key)`:
//! `api-users-GET-list_request`, `_success`, `_error`. Two processes compiling the
//! same declarations agree on every name without sharing anything.
//!
//! ## 🚀 Core Concepts
//!
//! ### Endpoints and resources
//! An [`EndpointConfig`](framework::EndpointConfig) describes one call. A
//! [`ResourceConfig`](framework::ResourceConfig) expands into the five REST verbs.
//!
//! ### Serial vs concurrent
//! Each endpoint task is a receive loop. Serial endpoints (the default) finish
//! one call before taking the next; concurrent endpoints spawn one execution per
//! request.
//!
//! ### Mocking
//! [`framework::mock::MockTransport`] scripts transport responses, including
//! gated responses that stay in flight until released.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Explicit settings
//! Base path, headers, error classifier, response post-processor and the global
//! auto-loading switch live in one [`Settings`](framework::Settings) value built
//! at startup and shared as `Arc<Settings>`.
//!
//! ### 2. Failures are values
//! A failed call never panics and never escapes a task: it becomes an error
//! command carrying `{req, error, except}`.
//!
//! ### 3. Observability
//! Everything logs through `tracing` with structured fields. See
//! [`lifecycle::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Compiler ([`framework`])
//! - **Role**: Turns declarations into names, creators and tasks, and runs them.
//! - **Key items**: [`ModelBuilder`](framework::ModelBuilder),
//!   [`CommandBus`](framework::CommandBus), [`Transport`](framework::Transport).
//!
//! ### 2. The Orchestrator ([`lifecycle`])
//! - **Role**: Mounts models, starts their tasks, shuts everything down.
//! - **Key items**: [`Runtime`](lifecycle::Runtime),
//!   [`shutdown`](lifecycle::Runtime::shutdown).
//!
//! ### 3. The Clients ([`clients`])
//! - **Role**: One-shot requests outside the command flow, and the HTTP transport.
//! - **Key items**: [`ApiClient`](clients::ApiClient).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod clients;
pub mod framework;
pub mod lifecycle;
