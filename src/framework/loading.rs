//! # Loading Injector
//!
//! Decides whether an endpoint toggles a loading flag and builds the companion
//! start/end commands.
//!
//! The effective auto-loading switch is the endpoint's own value, or the global
//! one from [`Settings`](crate::framework::Settings) when the endpoint is silent.
//! A toggle pair is emitted when either that switch or `showLoading` is on.
//! Every toggle names the state flag it flips: the auto-loading name, or
//! `loading` when the switch is a plain `true` or only `showLoading` is set.
//! `showLoading` rides along as a tag for UI listeners.

use crate::framework::command::Command;
use crate::framework::config::{EndpointConfig, LoadingSwitch, DEFAULT_LOADING_FLAG};
use crate::framework::names::loading_command_names;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingScope {
    Start,
    End,
}

/// What one endpoint toggles around each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingToggle {
    /// State key to flip.
    pub flag_name: String,
    /// Tag for UI listeners, when `showLoading` is on.
    pub show_loading: Option<LoadingSwitch>,
}

impl LoadingToggle {
    /// `None` when the endpoint toggles nothing.
    pub fn plan(endpoint: &EndpointConfig, global: &LoadingSwitch) -> Option<Self> {
        let auto = endpoint.auto_loading.as_ref().unwrap_or(global);
        let show = endpoint.show_loading.as_ref().filter(|s| s.is_on());

        if !auto.is_on() && show.is_none() {
            return None;
        }
        Some(Self {
            flag_name: auto.flag_name().to_string(),
            show_loading: show.cloned(),
        })
    }

    /// The toggle command for `model_name` at `scope`.
    pub fn command(&self, model_name: &str, scope: LoadingScope) -> Command {
        let names = loading_command_names(model_name);
        let kind = match scope {
            LoadingScope::Start => names.start,
            LoadingScope::End => names.end,
        };

        let mut payload = Map::new();
        payload.insert("flagName".to_string(), Value::String(self.flag_name.clone()));
        if let Some(show) = &self.show_loading {
            payload.insert("showLoading".to_string(), show.to_value());
        }
        Command::with_payload(kind, Value::Object(payload))
    }

    /// Reads a toggle back from a command payload. A missing `flagName` reads as
    /// the default flag.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            flag_name: payload
                .get("flagName")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_LOADING_FLAG)
                .to_string(),
            show_loading: payload.get("showLoading").and_then(LoadingSwitch::from_value),
        }
    }
}
