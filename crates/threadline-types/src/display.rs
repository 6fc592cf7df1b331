//! Display items: the flattened output handed to a renderer.
//!
//! The renderer trusts these as authoritative: branch descriptors drive the
//! "1 of N" controls, compare groups drive the column layout. Items own
//! clones of the messages they wrap so the output outlives the snapshot.
//!
//! Serialized with an internal `"type"` tag:
//!
//! ```text
//! {"type": "plain_message",   "message": {...}, "branch": {...}}
//! {"type": "assistant_group", "id": "a1", "blocks": [...], "messageIds": [...]}
//! {"type": "compare_group",   "groupId": "g1", "columns": [...], "activeColumnId": "c1"}
//! ```

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, MessageId};
use crate::message::{Message, Role, ToolInvocation};

/// Branch position of an emitted item among its siblings.
///
/// Invariant: `count >= 1` and `active_branch_index < count`. The resolver
/// only produces descriptors for `count > 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDescriptor {
    pub count: usize,
    pub active_branch_index: usize,
}

impl BranchDescriptor {
    pub fn new(count: usize, active_branch_index: usize) -> Self {
        debug_assert!(count >= 1 && active_branch_index < count);
        Self { count, active_branch_index }
    }

    /// One-based position label, e.g. `"2/3"`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.active_branch_index + 1, self.count)
    }
}

/// A tool message matched to the invocation it answers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultRef {
    pub message_id: MessageId,
    pub content: String,
}

/// One invocation and, once it has arrived, its result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExchange {
    pub invocation: ToolInvocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResultRef>,
}

impl ToolExchange {
    /// The invocation has no result yet (still executing or streaming).
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// A message's text, rendered as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub message_id: MessageId,
    pub role: Role,
    pub content: String,
}

/// An assistant message merged with the results of its tool invocations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStepBlock {
    /// The invoking assistant message.
    pub message_id: MessageId,
    /// The assistant's own text (reasoning preceding the calls).
    pub content: String,
    /// One entry per invocation, in invocation order.
    pub exchanges: Vec<ToolExchange>,
}

/// One unit of content inside an assistant group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    ToolStep(ToolStepBlock),
}

impl ContentBlock {
    /// The message this block was rendered from.
    pub fn message_id(&self) -> &MessageId {
        match self {
            ContentBlock::Text(b) => &b.message_id,
            ContentBlock::ToolStep(b) => &b.message_id,
        }
    }

    /// The block's own text.
    pub fn content(&self) -> &str {
        match self {
            ContentBlock::Text(b) => &b.content,
            ContentBlock::ToolStep(b) => &b.content,
        }
    }

    pub fn is_tool_step(&self) -> bool {
        matches!(self, ContentBlock::ToolStep(_))
    }

    /// Message ids of the tool results merged into this block.
    pub fn result_ids(&self) -> impl Iterator<Item = &MessageId> {
        let exchanges: &[ToolExchange] = match self {
            ContentBlock::Text(_) => &[],
            ContentBlock::ToolStep(b) => &b.exchanges,
        };
        exchanges
            .iter()
            .filter_map(|e| e.result.as_ref().map(|r| &r.message_id))
    }
}

/// A single message shown on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlainMessage {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchDescriptor>,
}

/// One assistant turn: tool round-trips collapsed into a single item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantGroup {
    /// The message that opened the turn.
    pub id: MessageId,
    pub blocks: Vec<ContentBlock>,
    /// Every message absorbed into the turn, in chain order.
    pub message_ids: Vec<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchDescriptor>,
}

impl AssistantGroup {
    /// The last absorbed message; traversal continues from its children.
    pub fn terminal_id(&self) -> &MessageId {
        self.message_ids.last().unwrap_or(&self.id)
    }
}

/// Parallel replies rendered side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareGroup {
    pub group_id: GroupId,
    /// One rendered column per group member, in sibling order. Columns are
    /// plain messages or assistant groups, never nested compare groups.
    pub columns: Vec<DisplayItem>,
    /// The column flagged `activeColumn`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_column_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchDescriptor>,
}

/// One element of the flattened conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayItem {
    PlainMessage(PlainMessage),
    AssistantGroup(AssistantGroup),
    CompareGroup(CompareGroup),
}

impl DisplayItem {
    /// Short name of the variant, for logs and outlines.
    pub fn kind(&self) -> &'static str {
        match self {
            DisplayItem::PlainMessage(_) => "message",
            DisplayItem::AssistantGroup(_) => "assistant_group",
            DisplayItem::CompareGroup(_) => "compare_group",
        }
    }

    /// The message that anchors this item.
    ///
    /// Plain messages: the message. Assistant groups: the turn's first
    /// message. Compare groups: the active column, else the first column.
    pub fn anchor_id(&self) -> Option<&MessageId> {
        match self {
            DisplayItem::PlainMessage(p) => Some(&p.message.id),
            DisplayItem::AssistantGroup(g) => Some(&g.id),
            DisplayItem::CompareGroup(c) => c
                .active_column_id
                .as_ref()
                .or_else(|| c.columns.first().and_then(|col| col.anchor_id())),
        }
    }

    pub fn branch(&self) -> Option<&BranchDescriptor> {
        match self {
            DisplayItem::PlainMessage(p) => p.branch.as_ref(),
            DisplayItem::AssistantGroup(g) => g.branch.as_ref(),
            DisplayItem::CompareGroup(c) => c.branch.as_ref(),
        }
    }

    /// Attach (or clear) the branch descriptor.
    pub fn set_branch(&mut self, branch: Option<BranchDescriptor>) {
        match self {
            DisplayItem::PlainMessage(p) => p.branch = branch,
            DisplayItem::AssistantGroup(g) => g.branch = branch,
            DisplayItem::CompareGroup(c) => c.branch = branch,
        }
    }

    /// Every message id this item accounts for, including embedded columns.
    pub fn message_ids(&self) -> Vec<&MessageId> {
        match self {
            DisplayItem::PlainMessage(p) => vec![&p.message.id],
            DisplayItem::AssistantGroup(g) => g.message_ids.iter().collect(),
            DisplayItem::CompareGroup(c) => c.columns.iter().flat_map(|col| col.message_ids()).collect(),
        }
    }

    pub fn as_plain(&self) -> Option<&PlainMessage> {
        match self {
            DisplayItem::PlainMessage(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_assistant_group(&self) -> Option<&AssistantGroup> {
        match self {
            DisplayItem::AssistantGroup(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_compare_group(&self) -> Option<&CompareGroup> {
        match self {
            DisplayItem::CompareGroup(c) => Some(c),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(id: &str) -> DisplayItem {
        DisplayItem::PlainMessage(PlainMessage {
            message: Message::builder(id, Role::Assistant).content(id).build(),
            branch: None,
        })
    }

    #[test]
    fn test_branch_label_is_one_based() {
        assert_eq!(BranchDescriptor::new(3, 0).label(), "1/3");
        assert_eq!(BranchDescriptor::new(2, 1).label(), "2/2");
    }

    #[test]
    fn test_set_branch() {
        let mut item = plain("u1");
        assert!(item.branch().is_none());
        item.set_branch(Some(BranchDescriptor::new(2, 1)));
        assert_eq!(item.branch(), Some(&BranchDescriptor::new(2, 1)));
    }

    #[test]
    fn test_compare_group_message_ids_include_columns() {
        let item = DisplayItem::CompareGroup(CompareGroup {
            group_id: GroupId::new("g1"),
            columns: vec![plain("col-a"), plain("col-b")],
            active_column_id: Some(MessageId::new("col-b")),
            branch: None,
        });
        let ids: Vec<&str> = item.message_ids().into_iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["col-a", "col-b"]);
        assert_eq!(item.anchor_id().unwrap(), "col-b");
    }

    #[test]
    fn test_compare_group_anchor_falls_back_to_first_column() {
        let item = DisplayItem::CompareGroup(CompareGroup {
            group_id: GroupId::new("g1"),
            columns: vec![plain("col-a"), plain("col-b")],
            active_column_id: None,
            branch: None,
        });
        assert_eq!(item.anchor_id().unwrap(), "col-a");
    }

    #[test]
    fn test_item_json_shape() {
        let mut item = plain("u2");
        item.set_branch(Some(BranchDescriptor::new(2, 1)));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "plain_message");
        assert_eq!(json["message"]["id"], "u2");
        assert_eq!(json["branch"]["count"], 2);
        assert_eq!(json["branch"]["activeBranchIndex"], 1);
    }

    #[test]
    fn test_tool_step_result_ids() {
        let block = ContentBlock::ToolStep(ToolStepBlock {
            message_id: MessageId::new("a1"),
            content: "Thinking".to_string(),
            exchanges: vec![
                ToolExchange {
                    invocation: ToolInvocation::new("call-1", "search", "{}"),
                    result: Some(ToolResultRef {
                        message_id: MessageId::new("t1"),
                        content: "found".to_string(),
                    }),
                },
                ToolExchange {
                    invocation: ToolInvocation::new("call-2", "fetch", "{}"),
                    result: None,
                },
            ],
        });
        let ids: Vec<&MessageId> = block.result_ids().collect();
        assert_eq!(ids, vec![&MessageId::new("t1")]);
        assert_eq!(block.content(), "Thinking");
        assert!(block.is_tool_step());
    }

    #[test]
    fn test_terminal_id() {
        let group = AssistantGroup {
            id: MessageId::new("a1"),
            blocks: Vec::new(),
            message_ids: vec![MessageId::new("a1"), MessageId::new("t1"), MessageId::new("a2")],
            branch: None,
        };
        assert_eq!(group.terminal_id(), "a2");
    }
}
