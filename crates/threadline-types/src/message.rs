//! Message records as persisted by the message store.
//!
//! A conversation is a DAG of messages linked by `parent_id`. Edits and
//! regenerations add siblings (branches); compare runs add siblings that share
//! a `group_id`; tool use chains assistant → tool → assistant down one path.
//!
//! ## Design: narrow metadata
//!
//! The store's metadata is an open bag. The flattening engine reads exactly
//! two well-known keys, so [`MessageMetadata`] exposes those as typed fields
//! and keeps everything else in `extra` untouched. Engine code never looks in
//! `extra`.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use strum::EnumString;

use crate::ids::{GroupId, MessageId, ToolCallId};

/// Role in conversation (participant type).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Role {
    /// Person at the keyboard.
    #[default]
    #[strum(serialize = "user", serialize = "human")]
    User,
    /// Model reply, possibly carrying tool invocations.
    #[strum(serialize = "assistant", serialize = "model", serialize = "agent")]
    Assistant,
    /// Tool execution result (answers one invocation by `tool_call_id`).
    Tool,
    /// System message (prompts, notices).
    System,
}

impl Role {
    /// Parse from string (case-insensitive).
    ///
    /// Supports aliases: "human" -> User, "model"/"agent" -> Assistant.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tool invocation requested by an assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call id; the answering tool message carries the same id.
    pub id: ToolCallId,
    /// Tool name as exposed to the model.
    pub name: String,
    /// Arguments as a JSON string (may be partial while streaming).
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: String,
}

impl ToolInvocation {
    pub fn new(id: impl Into<ToolCallId>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The metadata keys the engine reads, plus the untouched remainder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Which child is the active branch (set on the *parent* of a branch point).
    ///
    /// Signed because the store does not validate it; negative or
    /// out-of-range values resolve to the first child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_branch_index: Option<i64>,
    /// Marks the compare column whose subtree continues the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_column: Option<bool>,
    /// Everything else in the bag.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageMetadata {
    /// Whether this message is flagged as the active compare column.
    pub fn is_active_column(&self) -> bool {
        self.active_column.unwrap_or(false)
    }
}

/// Read an explicit `null` as the field's default.
///
/// The store writes `null` for unset optional columns; `#[serde(default)]`
/// alone only covers absent keys.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// An immutable message record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    /// Parent message (DAG edge; None for roots).
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Ordered tool invocations (assistant messages only; usually empty).
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolInvocation>,
    /// The invocation this message answers (tool messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<ToolCallId>,
    /// Message group membership (compare columns).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: MessageMetadata,
    /// Creation time (Unix millis).
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: u64,
}

impl Message {
    /// Start building a message with the two required fields.
    pub fn builder(id: impl Into<MessageId>, role: Role) -> MessageBuilder {
        MessageBuilder::new(id, role)
    }

    /// Check if this message requests tool invocations.
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// An assistant message that opens (or continues) a tool round-trip.
    pub fn is_tool_invoking_assistant(&self) -> bool {
        self.role == Role::Assistant && self.has_tools()
    }

    /// An assistant message with no tool invocations (a final answer).
    pub fn is_plain_assistant(&self) -> bool {
        self.role == Role::Assistant && !self.has_tools()
    }

    /// Find this message's invocation with the given call id.
    pub fn invocation(&self, call_id: &ToolCallId) -> Option<&ToolInvocation> {
        self.tools.iter().find(|t| &t.id == call_id)
    }

    /// Whether `other` is a tool message answering one of this message's invocations.
    pub fn is_answered_by(&self, other: &Message) -> bool {
        other.role == Role::Tool
            && other
                .tool_call_id
                .as_ref()
                .is_some_and(|call_id| self.invocation(call_id).is_some())
    }
}

/// Builder for [`Message`]. Tests and fixtures build many of these.
///
/// ```
/// # use threadline_types::*;
/// let msg = Message::builder("a1", Role::Assistant)
///     .parent("u1")
///     .content("Let me look that up")
///     .tool(ToolInvocation::new("call-1", "search", r#"{"q":"rust"}"#))
///     .build();
/// assert!(msg.is_tool_invoking_assistant());
/// ```
pub struct MessageBuilder {
    msg: Message,
}

impl MessageBuilder {
    pub fn new(id: impl Into<MessageId>, role: Role) -> Self {
        Self {
            msg: Message {
                id: id.into(),
                parent_id: None,
                role,
                content: String::new(),
                tools: Vec::new(),
                tool_call_id: None,
                group_id: None,
                metadata: MessageMetadata::default(),
                created_at: 0,
            },
        }
    }

    pub fn parent(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.msg.parent_id = Some(parent_id.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.msg.content = content.into();
        self
    }

    pub fn tool(mut self, invocation: ToolInvocation) -> Self {
        self.msg.tools.push(invocation);
        self
    }

    pub fn tool_call_id(mut self, call_id: impl Into<ToolCallId>) -> Self {
        self.msg.tool_call_id = Some(call_id.into());
        self
    }

    pub fn group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.msg.group_id = Some(group_id.into());
        self
    }

    pub fn active_branch_index(mut self, index: i64) -> Self {
        self.msg.metadata.active_branch_index = Some(index);
        self
    }

    pub fn active_column(mut self, active: bool) -> Self {
        self.msg.metadata.active_column = Some(active);
        self
    }

    pub fn created_at(mut self, millis: u64) -> Self {
        self.msg.created_at = millis;
        self
    }

    /// Consume the builder and return the message.
    pub fn build(self) -> Message {
        self.msg
    }
}

// ============================================================================
// Tests
// ============================================================================
