//! Shared conversation types for threadline.
//!
//! This crate is the data model: typed IDs, message records, message groups,
//! snapshots, and the display items the flattening engine produces. It has
//! **no internal threadline dependencies**, a pure leaf crate that the
//! engine and the CLI build on.
//!
//! # Relationship Overview
//!
//! ```text
//! ConversationSnapshot ← one conversation, as read from the store
//!     └── Message (MessageId)
//!     │     └── parent_id forms the reply DAG (siblings = branches)
//!     │     └── tools[] / tool_call_id pair invocations with results
//!     │     └── group_id joins a MessageGroup
//!     └── MessageGroup (GroupId, mode = compare)
//!
//! DisplayItem ← one element of the flattened output
//!     └── PlainMessage    (one Message)
//!     └── AssistantGroup  (ContentBlocks of one tool-use turn)
//!     └── CompareGroup    (one column per grouped sibling)
//! ```
//!
//! # Key Types
//!
//! |--------------------------|-------------------------------------------------|
//! | Type                     | Purpose                                         |
//! |--------------------------|-------------------------------------------------|
//! | [`Message`]              | Immutable message record                        |
//! | [`MessageMetadata`]      | The two metadata keys the engine reads          |
//! | [`MessageGroup`]         | Declares siblings as side-by-side alternatives  |
//! | [`ConversationSnapshot`] | Engine input: messages + groups                 |
//! | [`DisplayItem`]          | Engine output element                           |
//! | [`BranchDescriptor`]     | `{count, activeBranchIndex}` for branch controls |
//! | [`ContentBlock`]         | One block inside an assistant group             |
//! |--------------------------|-------------------------------------------------|

pub mod display;
pub mod group;
pub mod ids;
pub mod message;
pub mod snapshot;

// Re-export primary types at crate root for convenience.
pub use display::{
    AssistantGroup, BranchDescriptor, CompareGroup, ContentBlock, DisplayItem, PlainMessage,
    TextBlock, ToolExchange, ToolResultRef, ToolStepBlock,
};
pub use group::{GroupMode, MessageGroup};
pub use ids::{GroupId, MessageId, ToolCallId};
pub use message::{Message, MessageBuilder, MessageMetadata, Role, ToolInvocation};
pub use snapshot::{ConversationSnapshot, SnapshotError};
