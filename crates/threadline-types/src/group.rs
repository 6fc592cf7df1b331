//! Message groups: sets of sibling messages that are valid at the same time.
//!
//! A group declares that its member messages are side-by-side alternatives
//! rather than mutually exclusive branches. Membership lives on the message
//! (`Message::group_id`); the group record only carries the mode.

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, MessageId};

/// How a group's members are presented.
///
/// `Compare` is the only mode the engine acts on. Anything else the store
/// sends is kept verbatim in `Other` so it round-trips and can be reported.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupMode {
    /// Parallel replies rendered as columns.
    Compare,
    /// A mode this engine does not recognize.
    Other(String),
}

impl GroupMode {
    /// Convert to string representation.
    pub fn as_str(&self) -> &str {
        match self {
            GroupMode::Compare => "compare",
            GroupMode::Other(s) => s,
        }
    }

    pub fn is_compare(&self) -> bool {
        matches!(self, GroupMode::Compare)
    }
}

impl From<String> for GroupMode {
    fn from(s: String) -> Self {
        if s == "compare" {
            GroupMode::Compare
        } else {
            GroupMode::Other(s)
        }
    }
}

impl From<GroupMode> for String {
    fn from(mode: GroupMode) -> String {
        match mode {
            GroupMode::Compare => "compare".to_string(),
            GroupMode::Other(s) => s,
        }
    }
}

impl std::fmt::Display for GroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message group record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageGroup {
    pub id: GroupId,
    pub mode: GroupMode,
    /// The message the grouped siblings reply to.
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
}

impl MessageGroup {
    /// Create a compare group under `parent_message_id`.
    pub fn compare(id: impl Into<GroupId>, parent_message_id: impl Into<MessageId>) -> Self {
        Self {
            id: id.into(),
            mode: GroupMode::Compare,
            parent_message_id: Some(parent_message_id.into()),
        }
    }

    pub fn is_compare(&self) -> bool {
        self.mode.is_compare()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_string() {
        assert_eq!(GroupMode::from("compare".to_string()), GroupMode::Compare);
        assert_eq!(
            GroupMode::from("parallel".to_string()),
            GroupMode::Other("parallel".to_string())
        );
        // Exact match only; the store always writes lowercase.
        assert!(!GroupMode::from("Compare".to_string()).is_compare());
    }

    #[test]
    fn test_group_serde() {
        let json = r#"{"id":"g1","mode":"compare","parentMessageId":"u1"}"#;
        let group: MessageGroup = serde_json::from_str(json).unwrap();
        assert!(group.is_compare());
        assert_eq!(group.parent_message_id.as_ref().unwrap(), "u1");
        assert_eq!(serde_json::to_string(&group).unwrap(), json);
    }

    #[test]
    fn test_unknown_mode_is_preserved() {
        let json = r#"{"id":"g2","mode":"vote","parentMessageId":null}"#;
        let group: MessageGroup = serde_json::from_str(json).unwrap();
        assert!(!group.is_compare());
        assert_eq!(group.mode.as_str(), "vote");
        assert_eq!(serde_json::to_string(&group).unwrap(), json);
    }
}
