//! Snapshot diagnostics: a side report of malformed input.
//!
//! The flattener never fails. It drops dangling references, falls back on bad
//! indices, and skips unreachable messages without a word. `diagnose` reports
//! all of those so callers can log them or surface them to telemetry. It does
//! not change what [`flatten`](crate::flatten) produces.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use threadline_types::{ConversationSnapshot, GroupId, Message, MessageId, Role};

use crate::index::ConversationIndex;

/// How much a diagnostic matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    /// Handled silently, but worth knowing about.
    Info,
    /// Data the engine had to drop or guess around.
    Warning,
}

impl Severity {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DiagnosticKind {
    /// A later message reuses an earlier message's id and is ignored.
    DuplicateId,
    /// `parentId` names a message not in the snapshot; treated as a root.
    DanglingParent,
    /// `groupId` names a group not in the snapshot; treated as ungrouped.
    DanglingGroup,
    /// A group record with a mode other than `compare`.
    UnrecognizedGroupMode,
    /// A tool message that answers no invocation on its parent.
    OrphanToolResult,
    /// Messages are not in `createdAt` order.
    UnsortedInput,
    /// Not reachable from any root (a parent cycle).
    Unreachable,
    /// A compare group with zero or several `activeColumn` flags.
    AmbiguousActiveColumn,
    /// `activeBranchIndex` outside `0..children` at a real branch point.
    BranchIndexOutOfRange,
}

impl DiagnosticKind {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateId => "duplicate_id",
            DiagnosticKind::DanglingParent => "dangling_parent",
            DiagnosticKind::DanglingGroup => "dangling_group",
            DiagnosticKind::UnrecognizedGroupMode => "unrecognized_group_mode",
            DiagnosticKind::OrphanToolResult => "orphan_tool_result",
            DiagnosticKind::UnsortedInput => "unsorted_input",
            DiagnosticKind::Unreachable => "unreachable",
            DiagnosticKind::AmbiguousActiveColumn => "ambiguous_active_column",
            DiagnosticKind::BranchIndexOutOfRange => "branch_index_out_of_range",
        }
    }

    /// Default severity for this kind.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnrecognizedGroupMode
            | DiagnosticKind::UnsortedInput
            | DiagnosticKind::BranchIndexOutOfRange => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding about a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// The message concerned; `None` for snapshot-wide findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    pub detail: String,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message_id: Option<&MessageId>, detail: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message_id: message_id.cloned(),
            detail: detail.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message_id {
            Some(id) => write!(f, "{}: {} [{}]: {}", self.severity, self.kind, id, self.detail),
            None => write!(f, "{}: {}: {}", self.severity, self.kind, self.detail),
        }
    }
}

/// Check a snapshot for everything the flattener silently works around.
///
/// Findings come out grouped by check, each group in input order.
pub fn diagnose(snapshot: &ConversationSnapshot) -> Vec<Diagnostic> {
    let index = ConversationIndex::from_snapshot(snapshot);
    let mut out = Vec::new();

    check_duplicates(snapshot, &mut out);
    check_references(snapshot, &index, &mut out);
    check_groups(snapshot, &mut out);

    if !snapshot.is_sorted_by_creation() {
        out.push(Diagnostic::new(
            DiagnosticKind::UnsortedInput,
            None,
            "messages are not in createdAt order; traversal order is undefined",
        ));
    }

    check_reachability(snapshot, &index, &mut out);
    check_branch_indices(snapshot, &index, &mut out);

    tracing::debug!(
        messages = snapshot.len(),
        findings = out.len(),
        warnings = out.iter().filter(|d| d.is_warning()).count(),
        "diagnosed snapshot"
    );
    out
}

fn check_duplicates(snapshot: &ConversationSnapshot, out: &mut Vec<Diagnostic>) {
    let mut seen: HashSet<&MessageId> = HashSet::new();
    for msg in &snapshot.messages {
        if !seen.insert(&msg.id) {
            out.push(Diagnostic::new(
                DiagnosticKind::DuplicateId,
                Some(&msg.id),
                "later occurrence ignored",
            ));
        }
    }
}

fn check_references(snapshot: &ConversationSnapshot, index: &ConversationIndex<'_>, out: &mut Vec<Diagnostic>) {
    for msg in &snapshot.messages {
        if let Some(parent_id) = &msg.parent_id {
            if index.get(parent_id).is_none() {
                out.push(Diagnostic::new(
                    DiagnosticKind::DanglingParent,
                    Some(&msg.id),
                    format!("parent {parent_id} not in snapshot; treated as root"),
                ));
            }
        }

        if let Some(group_id) = &msg.group_id {
            if index.group(group_id).is_none() {
                out.push(Diagnostic::new(
                    DiagnosticKind::DanglingGroup,
                    Some(&msg.id),
                    format!("group {group_id} not in snapshot; treated as ungrouped"),
                ));
            }
        }

        if msg.role == Role::Tool && !index.parent(msg).is_some_and(|p| p.is_answered_by(msg)) {
            let detail = match &msg.tool_call_id {
                Some(call_id) => format!("toolCallId {call_id} matches no invocation on the parent"),
                None => "tool message without toolCallId".to_string(),
            };
            out.push(Diagnostic::new(DiagnosticKind::OrphanToolResult, Some(&msg.id), detail));
        }
    }
}

fn check_groups(snapshot: &ConversationSnapshot, out: &mut Vec<Diagnostic>) {
    let mut members: HashMap<&GroupId, Vec<&Message>> = HashMap::new();
    for msg in &snapshot.messages {
        if let Some(group_id) = &msg.group_id {
            members.entry(group_id).or_default().push(msg);
        }
    }

    for group in &snapshot.groups {
        if !group.is_compare() {
            out.push(Diagnostic::new(
                DiagnosticKind::UnrecognizedGroupMode,
                group.parent_message_id.as_ref(),
                format!("group {} has mode {:?}; members render as plain siblings", group.id, group.mode.as_str()),
            ));
            continue;
        }

        let Some(columns) = members.get(&group.id) else {
            continue;
        };
        let active = columns.iter().filter(|m| m.metadata.is_active_column()).count();
        if active != 1 {
            let detail = if active == 0 {
                format!("group {} has no active column; nothing continues below it", group.id)
            } else {
                format!("group {} has {active} active columns; the first wins", group.id)
            };
            out.push(Diagnostic::new(
                DiagnosticKind::AmbiguousActiveColumn,
                columns.first().map(|m| &m.id),
                detail,
            ));
        }
    }
}

fn check_reachability(snapshot: &ConversationSnapshot, index: &ConversationIndex<'_>, out: &mut Vec<Diagnostic>) {
    let mut reached: HashSet<&MessageId> = HashSet::with_capacity(index.len());
    let mut stack: Vec<&Message> = index.roots().to_vec();
    while let Some(msg) = stack.pop() {
        if reached.insert(&msg.id) {
            stack.extend(index.children(&msg.id).iter().copied());
        }
    }

    let mut reported: HashSet<&MessageId> = HashSet::new();
    for msg in &snapshot.messages {
        if !reached.contains(&msg.id) && reported.insert(&msg.id) {
            out.push(Diagnostic::new(
                DiagnosticKind::Unreachable,
                Some(&msg.id),
                "not reachable from any root (parent cycle)",
            ));
        }
    }
}

fn check_branch_indices(snapshot: &ConversationSnapshot, index: &ConversationIndex<'_>, out: &mut Vec<Diagnostic>) {
    for msg in &snapshot.messages {
        let Some(requested) = msg.metadata.active_branch_index else {
            continue;
        };
        let count = index.children(&msg.id).len();
        if count > 1 && !(requested >= 0 && (requested as u64) < count as u64) {
            out.push(Diagnostic::new(
                DiagnosticKind::BranchIndexOutOfRange,
                Some(&msg.id),
                format!("activeBranchIndex {requested} with {count} children; using 0"),
            ));
        }
    }
}
