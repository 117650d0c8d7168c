use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a transcript entry. Closed set: the backend never produces
/// anything else, and the persisted format depends on these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Error,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Error => "error",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_agent(self) -> bool {
        self == Role::Agent
    }

    /// Agent and error entries both terminate a round trip.
    pub fn is_terminal(self) -> bool {
        matches!(self, Role::Agent | Role::Error)
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, String> {
        match value {
            "user" => Ok(Role::User),
            "agent" => Ok(Role::Agent),
            "error" => Ok(Role::Error),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

/// One transcript entry. Immutable once constructed; the transcript only
/// ever grows by appending or resets wholesale on a session clear.
///
/// Agent content is markdown; user and error content is plain text. Routing
/// metadata is not stored here — it is derived from `agent_name` at read
/// time via [`crate::core::routing::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(
        rename = "agentName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub agent_name: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, prev_id: Option<u64>) -> Self {
        let timestamp = Utc::now();
        Self {
            id: creation_id(&timestamp, prev_id),
            role,
            content: content.into(),
            timestamp,
            agent_name: None,
        }
    }

    pub fn user(content: impl Into<String>, prev_id: Option<u64>) -> Self {
        Self::new(Role::User, content, prev_id)
    }

    pub fn agent(
        content: impl Into<String>,
        agent_name: impl Into<String>,
        prev_id: Option<u64>,
    ) -> Self {
        let mut message = Self::new(Role::Agent, content, prev_id);
        message.agent_name = Some(agent_name.into());
        message
    }

    pub fn error(content: impl Into<String>, prev_id: Option<u64>) -> Self {
        Self::new(Role::Error, content, prev_id)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_agent(&self) -> bool {
        self.role.is_agent()
    }
}

/// Creation-time-derived id, bumped past the previous id so that ids stay
/// strictly increasing even when two messages land in the same millisecond.
fn creation_id(timestamp: &DateTime<Utc>, prev_id: Option<u64>) -> u64 {
    let millis = timestamp.timestamp_millis().max(0) as u64;
    match prev_id {
        Some(prev) if millis <= prev => prev + 1,
        _ => millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_strings() {
        for role in [Role::User, Role::Agent, Role::Error] {
            assert_eq!(Role::try_from(role.as_str()), Ok(role));
        }
        assert!(Role::try_from("assistant").is_err());
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let first = Message::user("one", None);
        let second = Message::agent("two", "AccountMasterAgent", Some(first.id));
        let third = Message::user("three", Some(second.id));
        assert!(second.id > first.id);
        assert!(third.id > second.id);
    }

    #[test]
    fn agent_messages_carry_the_specialist_name() {
        let message = Message::agent("Your balance is $100", "AccountMasterAgent", None);
        assert_eq!(message.agent_name.as_deref(), Some("AccountMasterAgent"));
        assert!(message.is_agent());
    }

    #[test]
    fn user_and_error_messages_have_no_agent_name() {
        assert!(Message::user("hi", None).agent_name.is_none());
        assert!(Message::error("oops", None).agent_name.is_none());
    }

    #[test]
    fn serialization_uses_the_persisted_field_names() {
        let message = Message::agent("hello", "CardMasterAgent", None);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "agent");
        assert_eq!(value["agentName"], "CardMasterAgent");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn legacy_entries_without_ids_still_deserialize() {
        let raw = r#"{"type":"user","content":"hi","timestamp":"2025-01-01T00:00:00Z"}"#;
        let message: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(message.id, 0);
        assert!(message.is_user());
    }
}
