//! Commands and command creators.
//!
//! A [`Command`] is the only thing that travels over the
//! [`CommandBus`](crate::framework::CommandBus): a type string plus an optional
//! JSON payload. Its serialized form is `{"type": ..., "payload": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A uniquely typed message with an optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The command type, e.g. `api-users-GET-list_request`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `Value::Null` when the command carries no payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Command {
    /// A command without payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Builds commands of one fixed type.
///
/// Every compiled endpoint, resource verb and simple registration exposes one
/// of these in the model's [`CommandCreators`](crate::framework::CommandCreators).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandCreator {
    kind: String,
}

impl CommandCreator {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    /// The command type this creator produces.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// `{type}` with no payload.
    pub fn call(&self) -> Command {
        Command::new(self.kind.clone())
    }

    /// `{type, payload}`.
    pub fn create(&self, payload: Value) -> Command {
        Command::with_payload(self.kind.clone(), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creator_builds_typed_commands() {
        let creator = CommandCreator::new("api-test-DELETE-users-delete_request");

        let command = creator.create(json!({ "id": 1 }));
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({ "type": "api-test-DELETE-users-delete_request", "payload": { "id": 1 } })
        );

        let bare = creator.call();
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({ "type": "api-test-DELETE-users-delete_request" })
        );
    }
}
