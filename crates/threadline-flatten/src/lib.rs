//! Conversation flattening engine for threadline.
//!
//! Turns a stored conversation (a DAG of messages linked by `parent_id`,
//! branched by edits and regenerations, fanned out by compare runs) into the
//! linear list of [`DisplayItem`]s a chat UI renders top to bottom.
//!
//! # Pipeline
//!
//! ```text
//! ConversationSnapshot
//!     └── ConversationIndex       (id lookup, ordered children, roots)
//!           └── Flattener          (one path per branch point, per root)
//!                 ├── select_active_branch    → BranchDescriptor
//!                 ├── collect_assistant_turn  → AssistantTurn
//!                 │     └── render_block      → ContentBlock
//!                 └── compare groups          → CompareGroup columns
//! ```
//!
//! Every stage is a pure function of the snapshot: no I/O, no mutation, no
//! failure modes. Malformed input is worked around silently; [`diagnose`]
//! reports what was worked around.
//!
//! # Example
//!
//! ```
//! use threadline_flatten::flatten;
//! use threadline_types::{ConversationSnapshot, DisplayItem, Message, Role};
//!
//! let snapshot = ConversationSnapshot::new(
//!     vec![
//!         Message::builder("u1", Role::User).content("hi").build(),
//!         Message::builder("a1", Role::Assistant).parent("u1").content("hello").build(),
//!         Message::builder("a2", Role::Assistant).parent("u1").content("hey").build(),
//!     ],
//!     Vec::new(),
//! );
//!
//! let items = flatten(&snapshot);
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[1].branch().map(|b| b.label()), Some("1/2".to_string()));
//! assert!(matches!(items[1], DisplayItem::PlainMessage(_)));
//! ```

mod branch;
mod diagnostics;
mod flatten;
mod index;
mod render;
mod sequence;

pub use branch::{ActiveBranch, resolve_active_branch, select_active_branch};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity, diagnose};
pub use flatten::{Flattener, MAX_FLATTEN_STEPS, flatten};
pub use index::ConversationIndex;
pub use render::{RenderUnit, render_block, render_plain, render_turn};
pub use sequence::{AssistantTurn, collect_assistant_turn, is_tool_chain_head, opens_turn};

pub use threadline_types::DisplayItem;

/// Build the lookup index over a snapshot.
///
/// Shorthand for [`ConversationIndex::from_snapshot`].
pub fn build_index(snapshot: &threadline_types::ConversationSnapshot) -> ConversationIndex<'_> {
    ConversationIndex::from_snapshot(snapshot)
}
