//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG`. Module paths are hidden (`with_target(false)`); every log line
//! carries the command type or model name as a structured field instead.
//!
//! ## What Gets Traced
//!
//! - **Lifecycle**: runtime, router and endpoint task start / stop, models mounted
//! - **Requests**: uri and method of every call at `debug`, failures at `error`
//! - **Configuration warnings**: missing path parameters, skipped declarations,
//!   name collisions
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=debug cargo run   # request uris, loading flags, outcomes
//! RUST_LOG=api_model::framework::bus=trace cargo run   # every dispatch
//! ```
//!
//! A request to a serial endpoint with auto-loading on looks like this at `debug`:
//!
//! ```text
//! INFO Endpoint task started request="api-users-GET-list_request" mode=Serial
//! DEBUG Loading flag flag="loading" on=true
//! DEBUG Sending request uri="/api/users" method="GET"
//! DEBUG Loading flag flag="loading" on=false
//! DEBUG Request succeeded kind="api-users-GET-list_success"
//! ```

/// Installs the global subscriber. Calling it again is a no-op.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
