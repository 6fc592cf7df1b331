//! Sequence collector: gathers one assistant turn's tool round-trips.
//!
//! A turn is the chain
//!
//! ```text
//! assistant(tools) → tool result(s) → assistant(tools) → … → assistant(final)
//! ```
//!
//! collapsed into a single display item. The walk stops early, leaving the
//! rest for the orchestrator, at any branch point, at a compare column, or
//! at a message that does not continue the chain (e.g. the user's next
//! prompt).

use threadline_types::{Message, MessageId, Role};

use crate::index::ConversationIndex;
use crate::render::RenderUnit;

/// A collected turn: render units in chain order plus every absorbed id.
#[derive(Debug, Clone)]
pub struct AssistantTurn<'a> {
    pub units: Vec<RenderUnit<'a>>,
    /// Absorbed messages in chain order; the first is the turn's head.
    pub message_ids: Vec<&'a MessageId>,
    /// The last absorbed message. Traversal continues from its children.
    pub terminal: &'a Message,
    head: &'a Message,
}

impl<'a> AssistantTurn<'a> {
    /// The message that opened the turn.
    pub fn head(&self) -> &'a Message {
        self.head
    }
}

/// Whether `msg` is a tool message answering an invocation on its parent.
///
/// Such a message starts a turn of its own when the orchestrator reaches it
/// directly (its invoking assistant stopped at a branch point).
pub fn is_tool_chain_head(msg: &Message, index: &ConversationIndex<'_>) -> bool {
    msg.role == Role::Tool && index.parent(msg).is_some_and(|p| p.is_answered_by(msg))
}

/// Whether `msg` opens an assistant turn.
pub fn opens_turn(msg: &Message, index: &ConversationIndex<'_>) -> bool {
    msg.is_tool_invoking_assistant() || is_tool_chain_head(msg, index)
}

/// Collect the turn starting at `start`.
///
/// Returns `None` when `start` does not open a turn.
pub fn collect_assistant_turn<'a>(start: &'a Message, index: &ConversationIndex<'a>) -> Option<AssistantTurn<'a>> {
    let mut units = Vec::new();
    let mut message_ids = Vec::new();

    let mut assistant = if start.is_tool_invoking_assistant() {
        start
    } else if is_tool_chain_head(start, index) {
        let owner = index.parent(start)?;
        units.push(RenderUnit::DetachedResults {
            assistant: owner,
            results: vec![start],
        });
        message_ids.push(&start.id);
        match next_in_chain(start, index) {
            ChainNext::Assistant(next) => next,
            ChainNext::Final(last) => {
                units.push(RenderUnit::Message(last));
                message_ids.push(&last.id);
                return Some(AssistantTurn { units, message_ids, terminal: last, head: start });
            }
            ChainNext::Stop => {
                return Some(AssistantTurn { units, message_ids, terminal: start, head: start });
            }
        }
    } else {
        return None;
    };

    loop {
        message_ids.push(&assistant.id);

        let children = index.children(&assistant.id);
        let all_results = !children.is_empty() && children.iter().all(|c| assistant.is_answered_by(c));

        if !all_results {
            // No results yet (still executing), or the assistant's children
            // include something other than its results: a branch point.
            units.push(RenderUnit::ToolStep { assistant, results: Vec::new() });
            return Some(AssistantTurn { units, message_ids, terminal: assistant, head: start });
        }

        let results: Vec<&'a Message> = children.to_vec();
        message_ids.extend(results.iter().copied().map(|r| &r.id));

        // Continue from the last result that has children.
        let tail = results
            .iter()
            .rev()
            .find(|r| !index.children(&r.id).is_empty())
            .or(results.last())
            .copied()
            .unwrap_or(assistant);

        units.push(RenderUnit::ToolStep { assistant, results });

        match next_in_chain(tail, index) {
            ChainNext::Assistant(next) => assistant = next,
            ChainNext::Final(last) => {
                units.push(RenderUnit::Message(last));
                message_ids.push(&last.id);
                return Some(AssistantTurn { units, message_ids, terminal: last, head: start });
            }
            ChainNext::Stop => {
                return Some(AssistantTurn { units, message_ids, terminal: tail, head: start });
            }
        }
    }
}

/// How the chain continues after a tool result.
enum ChainNext<'a> {
    /// Another tool-invoking assistant message.
    Assistant(&'a Message),
    /// A tool-free assistant message that ends the turn.
    Final(&'a Message),
    /// The turn ends at the tool result.
    Stop,
}

fn next_in_chain<'a>(tool_result: &'a Message, index: &ConversationIndex<'a>) -> ChainNext<'a> {
    let &[next] = index.children(&tool_result.id) else {
        // No continuation yet, or a branch point.
        return ChainNext::Stop;
    };
    if index.compare_group(next).is_some() {
        // Compare columns are rendered by the orchestrator.
        return ChainNext::Stop;
    }
    if next.is_tool_invoking_assistant() {
        ChainNext::Assistant(next)
    } else if next.is_plain_assistant() {
        ChainNext::Final(next)
    } else {
        ChainNext::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadline_types::{MessageGroup, ToolInvocation};

    fn user(id: &str, parent: Option<&str>) -> Message {
        let b = Message::builder(id, Role::User).content(id);
        match parent {
            Some(p) => b.parent(p).build(),
            None => b.build(),
        }
    }

    fn calling(id: &str, parent: &str, calls: &[&str]) -> Message {
        let mut b = Message::builder(id, Role::Assistant).parent(parent).content(id);
        for call in calls {
            b = b.tool(ToolInvocation::new(*call, "search", "{}"));
        }
        b.build()
    }

    fn result(id: &str, parent: &str, call: &str) -> Message {
        Message::builder(id, Role::Tool)
            .parent(parent)
            .tool_call_id(call)
            .content(id)
            .build()
    }

    fn answer(id: &str, parent: &str) -> Message {
        Message::builder(id, Role::Assistant).parent(parent).content(id).build()
    }

    fn collect<'a>(index: &ConversationIndex<'a>, id: &str) -> Option<AssistantTurn<'a>> {
        let start = index.get(&MessageId::new(id))?;
        collect_assistant_turn(start, index)
    }

    fn ids(turn: &AssistantTurn<'_>) -> Vec<String> {
        turn.message_ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_single_round_trip() {
        let messages = vec![
            user("u1", None),
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            answer("a2", "t1"),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1", "a2"]);
        assert_eq!(turn.terminal.id, "a2");
        assert_eq!(turn.units.len(), 2);
        assert_eq!(turn.head().id, "a1");
    }

    #[test]
    fn test_multi_step_chain() {
        let messages = vec![
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            calling("a2", "t1", &["c2"]),
            result("t2", "a2", "c2"),
            answer("a3", "t2"),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1", "a2", "t2", "a3"]);
        assert_eq!(turn.units.len(), 3);
    }

    #[test]
    fn test_parallel_results_are_not_branches() {
        let messages = vec![
            calling("a1", "u1", &["c1", "c2"]),
            result("t1", "a1", "c1"),
            result("t2", "a1", "c2"),
            answer("a2", "t2"),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1", "t2", "a2"]);
        assert_eq!(turn.terminal.id, "a2");
    }

    #[test]
    fn test_pending_tool_call_ends_at_assistant() {
        let messages = vec![calling("a1", "u1", &["c1"])];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1"]);
        assert_eq!(turn.terminal.id, "a1");
    }

    #[test]
    fn test_result_without_continuation_is_terminal() {
        let messages = vec![calling("a1", "u1", &["c1"]), result("t1", "a1", "c1")];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1"]);
        assert_eq!(turn.terminal.id, "t1");
    }

    #[test]
    fn test_user_after_result_ends_turn_before_it() {
        let messages = vec![
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            user("u2", Some("t1")),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1"]);
        assert_eq!(turn.terminal.id, "t1");
    }

    #[test]
    fn test_branch_after_result_stops_turn() {
        let messages = vec![
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            answer("a2", "t1"),
            answer("a2b", "t1"),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1"]);
        assert_eq!(turn.terminal.id, "t1");
    }

    #[test]
    fn test_mixed_children_stop_at_assistant() {
        let messages = vec![
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            user("u2", Some("a1")),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1"]);
        assert_eq!(turn.terminal.id, "a1");
    }

    #[test]
    fn test_unmatched_result_is_not_absorbed() {
        let messages = vec![calling("a1", "u1", &["c1"]), result("t1", "a1", "c9")];
        let index = ConversationIndex::build(&messages, &[]);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1"]);
        let t1 = index.get(&MessageId::new("t1")).unwrap();
        assert!(!opens_turn(t1, &index));
    }

    #[test]
    fn test_tool_chain_head() {
        let messages = vec![
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            user("u2", Some("a1")),
            answer("a2", "t1"),
        ];
        let index = ConversationIndex::build(&messages, &[]);
        let t1 = index.get(&MessageId::new("t1")).unwrap();
        assert!(is_tool_chain_head(t1, &index));

        let turn = collect(&index, "t1").unwrap();
        assert_eq!(ids(&turn), vec!["t1", "a2"]);
        assert!(matches!(turn.units[0], RenderUnit::DetachedResults { .. }));
        assert_eq!(turn.terminal.id, "a2");
    }

    #[test]
    fn test_compare_column_is_left_for_orchestrator() {
        let groups = vec![MessageGroup::compare("g1", "t1")];
        let messages = vec![
            calling("a1", "u1", &["c1"]),
            result("t1", "a1", "c1"),
            Message::builder("col", Role::Assistant).parent("t1").group("g1").build(),
        ];
        let index = ConversationIndex::build(&messages, &groups);
        let turn = collect(&index, "a1").unwrap();

        assert_eq!(ids(&turn), vec!["a1", "t1"]);
    }

    #[test]
    fn test_plain_messages_do_not_open_turns() {
        let messages = vec![user("u1", None), answer("a1", "u1")];
        let index = ConversationIndex::build(&messages, &[]);
        assert!(collect(&index, "u1").is_none());
        assert!(collect(&index, "a1").is_none());
    }
}
