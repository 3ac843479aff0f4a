//! Observers plugged into the [`CommandBus`](crate::framework::CommandBus).
//!
//! Middlewares see every command after it has been reduced and routed. They are
//! the hook for UI concerns the framework does not own: a blocking spinner, a
//! global error toast, analytics on successful calls.

use crate::framework::command::Command;
use crate::framework::config::LoadingSwitch;
use crate::framework::loading::LoadingToggle;
use crate::framework::names::{is_end_loading, is_error_command, is_start_loading, is_success_command};
use std::sync::Arc;

pub trait Middleware: Send + Sync {
    fn on_command(&self, command: &Command);
}

type LoadingCallback = Arc<dyn Fn(&LoadingSwitch) + Send + Sync>;
type CommandCallback = Arc<dyn Fn(&Command) + Send + Sync>;

/// Calls `on_start` / `on_end` with the `showLoading` tag of loading toggles.
///
/// Toggles without a truthy tag are ignored.
pub struct ShowLoadingMiddleware {
    on_start: LoadingCallback,
    on_end: LoadingCallback,
}

impl ShowLoadingMiddleware {
    pub fn new(
        on_start: impl Fn(&LoadingSwitch) + Send + Sync + 'static,
        on_end: impl Fn(&LoadingSwitch) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_start: Arc::new(on_start),
            on_end: Arc::new(on_end),
        }
    }
}

impl Middleware for ShowLoadingMiddleware {
    fn on_command(&self, command: &Command) {
        let start = is_start_loading(&command.kind);
        if !start && !is_end_loading(&command.kind) {
            return;
        }
        let toggle = LoadingToggle::from_payload(&command.payload);
        if let Some(show) = toggle.show_loading.filter(LoadingSwitch::is_on) {
            if start {
                (self.on_start)(&show);
            } else {
                (self.on_end)(&show);
            }
        }
    }
}

/// Calls `handle_error` for every `api-…_error` command.
pub struct ApiErrorMiddleware {
    handle_error: CommandCallback,
}

impl ApiErrorMiddleware {
    pub fn new(handle_error: impl Fn(&Command) + Send + Sync + 'static) -> Self {
        Self {
            handle_error: Arc::new(handle_error),
        }
    }
}

impl Middleware for ApiErrorMiddleware {
    fn on_command(&self, command: &Command) {
        if is_error_command(&command.kind) {
            (self.handle_error)(command);
        }
    }
}

/// Calls `handle_success` for every `api-…_success` command.
pub struct ApiSuccessMiddleware {
    handle_success: CommandCallback,
}

impl ApiSuccessMiddleware {
    pub fn new(handle_success: impl Fn(&Command) + Send + Sync + 'static) -> Self {
        Self {
            handle_success: Arc::new(handle_success),
        }
    }
}

impl Middleware for ApiSuccessMiddleware {
    fn on_command(&self, command: &Command) {
        if is_success_command(&command.kind) {
            (self.handle_success)(command);
        }
    }
}
