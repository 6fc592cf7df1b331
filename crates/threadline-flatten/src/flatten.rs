//! Flattening orchestrator: message DAG in, display items out.
//!
//! Walks one continuation path per branch point, starting from every root.
//! Each visited node is classified once, in strict priority order:
//!
//! 1. **Compare**: the node is a column of a `compare` group. Emit one
//!    [`CompareGroup`] with every column, continue from the active column.
//! 2. **Assistant turn**: the node opens a tool-use turn. Emit one
//!    [`AssistantGroup`], continue from the turn's terminal message.
//! 3. **Plain**: emit the node as a [`PlainMessage`], continue from it.
//!
//! Continuing from a node with several children resolves the active branch
//! and visits only that child, handing it the [`BranchDescriptor`] to carry.
//!
//! ## Known limitations (pinned by tests)
//!
//! - Children of an active compare column are *not* branch-resolved: every
//!   child is visited, none carries a descriptor.
//! - An active branch child that opens an assistant turn *and* is a compare
//!   column is emitted twice: once as the descriptor-carrying assistant group,
//!   then again inside the compare group.
//!
//! Traversal uses an explicit work stack, so conversation length is not
//! bounded by the call stack.

use std::collections::HashSet;

use threadline_types::{
    BranchDescriptor, CompareGroup, ConversationSnapshot, DisplayItem, GroupId, Message, MessageGroup,
};

use crate::branch::select_active_branch;
use crate::index::ConversationIndex;
use crate::render::{render_plain, render_turn};
use crate::sequence::{collect_assistant_turn, opens_turn};

/// Circuit breaker: maximum work-stack pops per flattening pass.
///
/// A message is visited at most twice per pass (see the duplication case
/// above), so this only trips on absurdly large snapshots.
pub const MAX_FLATTEN_STEPS: usize = 1 << 20;

/// Flatten a snapshot into display items.
///
/// Builds a throwaway index. Callers flattening the same snapshot repeatedly
/// can build a [`ConversationIndex`] once and use [`Flattener`] directly.
pub fn flatten(snapshot: &ConversationSnapshot) -> Vec<DisplayItem> {
    let index = ConversationIndex::from_snapshot(snapshot);
    Flattener::new(&index).flatten()
}

/// What a node is, for dispatch.
enum NodeKind<'a> {
    Compare(&'a MessageGroup),
    AssistantTurn,
    Plain,
}

/// A pending node on the work stack.
#[derive(Debug, Clone, Copy)]
struct Visit<'a> {
    message: &'a Message,
    /// Set when the node was chosen at a branch point.
    branch: Option<BranchDescriptor>,
}

impl<'a> Visit<'a> {
    fn plain(message: &'a Message) -> Self {
        Self { message, branch: None }
    }
}

/// Per-pass traversal state. Dropped when the pass ends.
struct Pass<'a> {
    items: Vec<DisplayItem>,
    /// Compare groups already emitted this pass.
    emitted_groups: HashSet<&'a GroupId>,
}

/// The flattening driver over a prebuilt index.
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'i, 'a> {
    index: &'i ConversationIndex<'a>,
}

impl<'i, 'a> Flattener<'i, 'a> {
    pub fn new(index: &'i ConversationIndex<'a>) -> Self {
        Self { index }
    }

    /// Run one pass. Deterministic for a given index.
    pub fn flatten(&self) -> Vec<DisplayItem> {
        let mut pass = Pass {
            items: Vec::new(),
            emitted_groups: HashSet::new(),
        };

        // Push in reverse so the first root (and first child) pops first.
        let mut stack: Vec<Visit<'a>> = self.index.roots().iter().rev().map(|&m| Visit::plain(m)).collect();
        let mut steps = 0usize;

        while let Some(visit) = stack.pop() {
            steps += 1;
            if steps > MAX_FLATTEN_STEPS {
                tracing::warn!("flatten hit MAX_FLATTEN_STEPS ({MAX_FLATTEN_STEPS}), truncating");
                break;
            }
            let next = self.visit(visit, &mut pass);
            stack.extend(next.into_iter().rev());
        }

        tracing::trace!(
            messages = self.index.len(),
            items = pass.items.len(),
            steps,
            "flattened conversation"
        );
        pass.items
    }

    fn classify(&self, msg: &'a Message) -> NodeKind<'a> {
        if let Some(group) = self.index.compare_group(msg) {
            NodeKind::Compare(group)
        } else if opens_turn(msg, self.index) {
            NodeKind::AssistantTurn
        } else {
            NodeKind::Plain
        }
    }

    /// Emit the item(s) for one node and return where traversal continues.
    fn visit(&self, visit: Visit<'a>, pass: &mut Pass<'a>) -> Vec<Visit<'a>> {
        let msg = visit.message;

        // An active branch child is checked for a turn before the compare
        // check; a child that is both gets both emissions.
        if let Some(descriptor) = visit.branch {
            if opens_turn(msg, self.index) {
                if let Some(turn) = collect_assistant_turn(msg, self.index) {
                    pass.items
                        .push(DisplayItem::AssistantGroup(render_turn(&turn, Some(descriptor))));
                    return match self.index.compare_group(msg) {
                        Some(group) => self.emit_compare(msg, group, None, pass),
                        None => self.continue_from(turn.terminal),
                    };
                }
            }
        }

        match self.classify(msg) {
            NodeKind::Compare(group) => self.emit_compare(msg, group, visit.branch, pass),
            NodeKind::AssistantTurn => match collect_assistant_turn(msg, self.index) {
                Some(turn) => {
                    pass.items
                        .push(DisplayItem::AssistantGroup(render_turn(&turn, visit.branch)));
                    self.continue_from(turn.terminal)
                }
                None => self.emit_plain(msg, visit.branch, pass),
            },
            NodeKind::Plain => self.emit_plain(msg, visit.branch, pass),
        }
    }

    fn emit_plain(&self, msg: &'a Message, branch: Option<BranchDescriptor>, pass: &mut Pass<'a>) -> Vec<Visit<'a>> {
        pass.items.push(DisplayItem::PlainMessage(render_plain(msg, branch)));
        self.continue_from(msg)
    }

    fn emit_compare(
        &self,
        msg: &'a Message,
        group: &'a MessageGroup,
        branch: Option<BranchDescriptor>,
        pass: &mut Pass<'a>,
    ) -> Vec<Visit<'a>> {
        if !pass.emitted_groups.insert(&group.id) {
            // Another member (e.g. a sibling root) already rendered the group.
            return Vec::new();
        }

        let members: Vec<&'a Message> = self
            .index
            .siblings(msg)
            .iter()
            .copied()
            .filter(|m| m.group_id.as_ref() == Some(&group.id))
            .collect();

        let mut columns = Vec::with_capacity(members.len());
        let mut active: Option<(&'a Message, &'a Message)> = None;

        for &member in &members {
            let (column, terminal) = self.render_column(member);
            columns.push(column);
            if active.is_none() && member.metadata.is_active_column() {
                active = Some((member, terminal));
            }
        }

        if active.is_none() {
            tracing::debug!(group = %group.id, "compare group has no active column");
        }

        pass.items.push(DisplayItem::CompareGroup(CompareGroup {
            group_id: group.id.clone(),
            columns,
            active_column_id: active.map(|(column, _)| column.id.clone()),
            branch,
        }));

        match active {
            // Unfiltered: every child continues, no branch resolution.
            Some((_, terminal)) => self.index.children(&terminal.id).iter().map(|&c| Visit::plain(c)).collect(),
            None => Vec::new(),
        }
    }

    /// Render one compare column; returns the item and the message whose
    /// children continue the column.
    fn render_column(&self, member: &'a Message) -> (DisplayItem, &'a Message) {
        if opens_turn(member, self.index) {
            if let Some(turn) = collect_assistant_turn(member, self.index) {
                return (DisplayItem::AssistantGroup(render_turn(&turn, None)), turn.terminal);
            }
        }
        (DisplayItem::PlainMessage(render_plain(member, None)), member)
    }

    /// Where traversal goes after `msg`: its only child, or its active branch.
    fn continue_from(&self, msg: &'a Message) -> Vec<Visit<'a>> {
        let children = self.index.children(&msg.id);
        match children {
            [] => Vec::new(),
            &[only] => vec![Visit::plain(only)],
            _ => match select_active_branch(Some(msg), children) {
                Some(active) => vec![Visit {
                    message: active.message,
                    branch: Some(active.descriptor),
                }],
                None => Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadline_types::{MessageId, Role, ToolInvocation};

    fn user(id: &str, parent: Option<&str>) -> Message {
        let b = Message::builder(id, Role::User).content(id);
        match parent {
            Some(p) => b.parent(p).build(),
            None => b.build(),
        }
    }

    fn answer(id: &str, parent: &str) -> Message {
        Message::builder(id, Role::Assistant).parent(parent).content(id).build()
    }

    fn anchors(items: &[DisplayItem]) -> Vec<String> {
        items
            .iter()
            .map(|i| i.anchor_id().map(|id| id.to_string()).unwrap_or_default())
            .collect()
    }

    fn run(messages: Vec<Message>) -> Vec<DisplayItem> {
        flatten(&ConversationSnapshot::new(messages, Vec::new()))
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(run(Vec::new()).is_empty());
    }

    #[test]
    fn test_linear_conversation() {
        let items = run(vec![user("u1", None), answer("a1", "u1"), user("u2", Some("a1")), answer("a2", "u2")]);
        assert_eq!(anchors(&items), vec!["u1", "a1", "u2", "a2"]);
        assert!(items.iter().all(|i| i.branch().is_none()));
    }

    #[test]
    fn test_branch_point_picks_default() {
        let items = run(vec![user("u1", None), answer("a1", "u1"), answer("a1b", "u1")]);
        assert_eq!(anchors(&items), vec!["u1", "a1"]);
        assert_eq!(items[1].branch(), Some(&BranchDescriptor::new(2, 0)));
    }

    #[test]
    fn test_multiple_roots_each_walk() {
        let items = run(vec![user("r1", None), user("r2", None), answer("a2", "r2")]);
        assert_eq!(anchors(&items), vec!["r1", "r2", "a2"]);
    }

    #[test]
    fn test_dangling_tool_call_falls_through_to_plain() {
        let items = run(vec![
            user("u1", None),
            Message::builder("t1", Role::Tool)
                .parent("u1")
                .tool_call_id("nowhere")
                .build(),
        ]);
        assert_eq!(items.len(), 2);
        assert!(items[1].as_plain().is_some());
    }

    #[test]
    fn test_branch_child_turn_carries_descriptor() {
        let parent = Message::builder("u1", Role::User).active_branch_index(1).build();
        let items = run(vec![
            parent,
            answer("a0", "u1"),
            Message::builder("a1", Role::Assistant)
                .parent("u1")
                .tool(ToolInvocation::new("c1", "search", "{}"))
                .build(),
            Message::builder("t1", Role::Tool).parent("a1").tool_call_id("c1").build(),
        ]);

        assert_eq!(items.len(), 2);
        let group = items[1].as_assistant_group().unwrap();
        assert_eq!(group.branch, Some(BranchDescriptor::new(2, 1)));
        assert_eq!(group.message_ids, vec![MessageId::new("a1"), MessageId::new("t1")]);
    }

    #[test]
    fn test_index_can_be_reused() {
        let messages = vec![user("u1", None), answer("a1", "u1")];
        let index = ConversationIndex::build(&messages, &[]);
        let flattener = Flattener::new(&index);
        assert_eq!(flattener.flatten(), flattener.flatten());
    }
}
