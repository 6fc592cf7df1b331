//! Computed lookup index over a conversation snapshot.
//!
//! The ConversationIndex provides id lookups and ordered child lists
//! computed once from the flat message list. It borrows the snapshot and is
//! never mutated after construction, so one index can serve any number of
//! flattening passes (and threads) over the same snapshot.

use std::collections::HashMap;

use threadline_types::{ConversationSnapshot, GroupId, Message, MessageGroup, MessageId};

/// Computed lookup index over snapshot data.
///
/// Child order is input order, which the store guarantees is creation
/// order. Traversal order is undefined for unsorted input; call
/// [`ConversationSnapshot::sort_by_creation`] first if in doubt.
#[derive(Debug, Clone)]
pub struct ConversationIndex<'a> {
    /// Messages with no parent, or whose parent is not in the snapshot.
    roots: Vec<&'a Message>,
    /// Children indexed by parent ID.
    children: HashMap<&'a MessageId, Vec<&'a Message>>,
    /// All messages indexed by ID (first occurrence wins).
    by_id: HashMap<&'a MessageId, &'a Message>,
    /// Group records indexed by ID.
    groups: HashMap<&'a GroupId, &'a MessageGroup>,
}

impl<'a> ConversationIndex<'a> {
    /// Build an index over a snapshot's messages and groups.
    pub fn from_snapshot(snapshot: &'a ConversationSnapshot) -> Self {
        Self::build(&snapshot.messages, &snapshot.groups)
    }

    /// Build an index from messages (in creation order) and group records.
    pub fn build(messages: &'a [Message], groups: &'a [MessageGroup]) -> Self {
        let mut by_id: HashMap<&MessageId, &Message> = HashMap::with_capacity(messages.len());
        let mut duplicates = 0usize;

        for msg in messages {
            if by_id.contains_key(&msg.id) {
                duplicates += 1;
                continue;
            }
            by_id.insert(&msg.id, msg);
        }

        let mut roots = Vec::new();
        let mut children: HashMap<&MessageId, Vec<&Message>> = HashMap::new();
        let mut dangling = 0usize;

        for msg in messages {
            // Later duplicates are not the indexed message.
            if !by_id.get(&msg.id).is_some_and(|m| std::ptr::eq(*m, msg)) {
                continue;
            }
            match &msg.parent_id {
                Some(parent_id) if by_id.contains_key(parent_id) => {
                    children.entry(parent_id).or_default().push(msg);
                }
                Some(_) => {
                    dangling += 1;
                    roots.push(msg);
                }
                None => roots.push(msg),
            }
        }

        let groups = groups.iter().map(|g| (&g.id, g)).collect();

        tracing::trace!(
            messages = by_id.len(),
            roots = roots.len(),
            duplicates,
            dangling,
            "built conversation index"
        );

        Self { roots, children, by_id, groups }
    }

    /// Get a message by ID.
    pub fn get(&self, id: &MessageId) -> Option<&'a Message> {
        self.by_id.get(id).copied()
    }

    /// Get children of a message, in creation order.
    pub fn children(&self, id: &MessageId) -> &[&'a Message] {
        self.children.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Root messages, in creation order.
    pub fn roots(&self) -> &[&'a Message] {
        &self.roots
    }

    /// The message's parent, if it is present in the snapshot.
    pub fn parent(&self, msg: &Message) -> Option<&'a Message> {
        msg.parent_id.as_ref().and_then(|id| self.get(id))
    }

    /// The message's sibling list (including itself), in creation order.
    ///
    /// Roots, including messages with a dangling parent, are siblings of
    /// each other.
    pub fn siblings(&self, msg: &Message) -> &[&'a Message] {
        match self.parent(msg) {
            Some(parent) => self.children(&parent.id),
            None => &self.roots,
        }
    }

    /// Get a group record by ID.
    pub fn group(&self, id: &GroupId) -> Option<&'a MessageGroup> {
        self.groups.get(id).copied()
    }

    /// The compare group this message is a column of, if any.
    ///
    /// Dangling group references and unrecognized modes yield `None`.
    pub fn compare_group(&self, msg: &Message) -> Option<&'a MessageGroup> {
        msg.group_id
            .as_ref()
            .and_then(|id| self.group(id))
            .filter(|g| g.is_compare())
    }

    /// Iterate indexed messages (order unspecified).
    pub fn messages(&self) -> impl Iterator<Item = &'a Message> + '_ {
        self.by_id.values().copied()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Get the total number of indexed messages.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadline_types::Role;

    fn msg(id: &str, parent: Option<&str>) -> Message {
        let b = Message::builder(id, Role::User).content(id);
        match parent {
            Some(p) => b.parent(p).build(),
            None => b.build(),
        }
    }

    fn ids(msgs: &[&Message]) -> Vec<String> {
        msgs.iter().map(|m| m.id.to_string()).collect()
    }

    #[test]
    fn test_index_from_flat_list() {
        let messages = vec![msg("u1", None), msg("a1", Some("u1")), msg("a2", Some("u1")), msg("u2", Some("a1"))];
        let index = ConversationIndex::build(&messages, &[]);

        assert_eq!(index.len(), 4);
        assert_eq!(ids(index.roots()), vec!["u1"]);
        assert_eq!(ids(index.children(&MessageId::new("u1"))), vec!["a1", "a2"]);
        assert_eq!(ids(index.children(&MessageId::new("a1"))), vec!["u2"]);
        assert!(index.children(&MessageId::new("a2")).is_empty());
        assert!(index.children(&MessageId::new("missing")).is_empty());
    }

    #[test]
    fn test_empty_input() {
        let index = ConversationIndex::build(&[], &[]);
        assert!(index.is_empty());
        assert!(index.roots().is_empty());
    }

    #[test]
    fn test_every_non_root_in_exactly_one_child_list() {
        let messages = vec![
            msg("u1", None),
            msg("a1", Some("u1")),
            msg("a2", Some("u1")),
            msg("u2", Some("a2")),
            msg("x", Some("gone")),
        ];
        let index = ConversationIndex::build(&messages, &[]);

        for m in &messages {
            let listed: usize = messages
                .iter()
                .map(|p| index.children(&p.id).iter().filter(|c| c.id == m.id).count())
                .sum();
            let in_roots = index.roots().iter().filter(|r| r.id == m.id).count();
            assert_eq!(listed + in_roots, 1, "{} listed {} times", m.id, listed + in_roots);
        }
    }

    #[test]
    fn test_dangling_parent_becomes_root() {
        let messages = vec![msg("u1", None), msg("orphan", Some("deleted"))];
        let index = ConversationIndex::build(&messages, &[]);

        assert_eq!(ids(index.roots()), vec!["u1", "orphan"]);
        let orphan = index.get(&MessageId::new("orphan")).unwrap();
        assert!(index.parent(orphan).is_none());
        assert_eq!(ids(index.siblings(orphan)), vec!["u1", "orphan"]);
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let mut second = msg("u1", None);
        second.content = "second".to_string();
        let messages = vec![msg("u1", None), second, msg("a1", Some("u1"))];
        let index = ConversationIndex::build(&messages, &[]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&MessageId::new("u1")).unwrap().content, "u1");
        assert_eq!(index.roots().len(), 1);
    }

    #[test]
    fn test_self_parent_is_unreachable() {
        let messages = vec![msg("u1", None), msg("loop", Some("loop"))];
        let index = ConversationIndex::build(&messages, &[]);

        assert_eq!(ids(index.roots()), vec!["u1"]);
        assert_eq!(ids(index.children(&MessageId::new("loop"))), vec!["loop"]);
    }

    #[test]
    fn test_compare_group_lookup() {
        let groups = vec![
            MessageGroup::compare("g1", "u1"),
            MessageGroup {
                id: GroupId::new("g2"),
                mode: threadline_types::GroupMode::Other("vote".into()),
                parent_message_id: None,
            },
        ];
        let messages = vec![
            msg("u1", None),
            Message::builder("c1", Role::Assistant).parent("u1").group("g1").build(),
            Message::builder("c2", Role::Assistant).parent("u1").group("g2").build(),
            Message::builder("c3", Role::Assistant).parent("u1").group("g9").build(),
        ];
        let index = ConversationIndex::build(&messages, &groups);

        let get = |id: &str| index.get(&MessageId::new(id)).unwrap();
        assert_eq!(index.compare_group(get("c1")).unwrap().id, "g1");
        assert!(index.compare_group(get("c2")).is_none());
        assert!(index.compare_group(get("c3")).is_none());
        assert!(index.compare_group(get("u1")).is_none());
    }
}
