//! Row types for the orchestrator database.

use voxbi_common::types::DatasetRef;

/// Grants a phone number permission to talk through a channel instance on
/// behalf of a tenant. One phone may carry several of these.
#[derive(Debug, Clone)]
pub struct AuthorizedContact {
    pub phone: String,
    pub tenant_id: String,
    pub instance_id: String,
    pub active: bool,
}

/// One configured messaging-gateway connection.
#[derive(Debug, Clone)]
pub struct ChannelInstance {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub credential: String,
    pub connected: bool,
}

/// Per-sender ephemeral selection record. At most one live row per phone;
/// expires at the end of the calendar day it was written.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub phone: String,
    pub instance_id: Option<String>,
    pub dataset: Option<DatasetRef>,
    pub created_at: i64,
    pub expires_at: i64,
}

/// A dataset a contact may query, ordered by `position` for menu rendering.
#[derive(Debug, Clone)]
pub struct DatasetBinding {
    pub tenant_id: String,
    pub dataset: DatasetRef,
    pub position: i64,
}

/// Message direction relative to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

/// A logged message (append-only).
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub tenant_id: String,
    pub phone: String,
    pub content: String,
    pub direction: Direction,
    pub sender_label: String,
    pub created_at: i64,
}

/// A message about to be appended to the log.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub tenant_id: String,
    pub phone: String,
    pub content: String,
    pub direction: Direction,
    pub sender_label: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_roundtrip() {
        assert_eq!(Direction::parse("in"), Some(Direction::In));
        assert_eq!(Direction::parse("out"), Some(Direction::Out));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::In.as_str(), "in");
    }
}
