//! Flattened conversation as an ASCII outline.
//!
//! One top-level line per display item, with nested lines for the content
//! blocks of assistant groups and the columns of compare groups. Ids are
//! shown in their 8-character short form:
//!
//! ```text
//! user u1 "What's the weather?"
//! [2/2] assistant a2 (3 messages)
//! ├─ search(city=Oslo) → ✓
//! └─ "It is raining."
//! compare g1 (2 columns)
//! ├─ * assistant col-a "Short answer"
//! └─ assistant col-b "Long answer"
//! ```

use threadline_flatten::Diagnostic;
use threadline_types::{ContentBlock, DisplayItem, ToolExchange};

/// One outline line and its nested lines.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutlineNode {
    label: String,
    children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn leaf(label: String) -> Self {
        Self { label, children: Vec::new() }
    }
}

/// Format display items as outline lines.
pub fn format_outline(items: &[DisplayItem], summary_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for item in items {
        let node = item_node(item, summary_width);
        format_node(&node, 0, "", true, &mut lines);
    }
    lines
}

/// Format diagnostics, one per line.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.to_string()).collect()
}

fn branch_marker(item: &DisplayItem) -> String {
    item.branch().map(|b| format!("[{}] ", b.label())).unwrap_or_default()
}

fn item_node(item: &DisplayItem, width: usize) -> OutlineNode {
    let marker = branch_marker(item);
    match item {
        DisplayItem::PlainMessage(p) => OutlineNode::leaf(format!(
            "{}{} {} \"{}\"",
            marker,
            p.message.role,
            p.message.id.short(),
            format_content_summary(&p.message.content, width)
        )),
        DisplayItem::AssistantGroup(g) => {
            let mut children = Vec::new();
            for block in &g.blocks {
                match block {
                    ContentBlock::Text(t) => {
                        children.push(OutlineNode::leaf(format!("\"{}\"", format_content_summary(&t.content, width))));
                    }
                    ContentBlock::ToolStep(step) => {
                        if !step.content.trim().is_empty() {
                            children.push(OutlineNode::leaf(format!(
                                "\"{}\"",
                                format_content_summary(&step.content, width)
                            )));
                        }
                        children.extend(step.exchanges.iter().map(|e| OutlineNode::leaf(format_exchange(e, width))));
                    }
                }
            }
            OutlineNode {
                label: format!("{}assistant {} ({} messages)", marker, g.id.short(), g.message_ids.len()),
                children,
            }
        }
        DisplayItem::CompareGroup(c) => {
            let children = c
                .columns
                .iter()
                .map(|column| {
                    let mut node = item_node(column, width);
                    if column.anchor_id().is_some() && column.anchor_id() == c.active_column_id.as_ref() {
                        node.label = format!("* {}", node.label);
                    }
                    node
                })
                .collect();
            OutlineNode {
                label: format!("{}compare {} ({} columns)", marker, c.group_id.short(), c.columns.len()),
                children,
            }
        }
    }
}

/// Collapsed tool format: `name(args) → ✓`, or `→ …` while pending.
fn format_exchange(exchange: &ToolExchange, width: usize) -> String {
    let status = if exchange.is_pending() { "…" } else { "✓" };
    format!(
        "{}({}) → {}",
        exchange.invocation.name,
        format_content_summary(&exchange.invocation.arguments, width),
        status
    )
}

/// Recursively format a node and its children.
fn format_node(node: &OutlineNode, depth: usize, prefix: &str, is_last: bool, lines: &mut Vec<String>) {
    let connector = if depth == 0 {
        ""
    } else if is_last {
        "└─ "
    } else {
        "├─ "
    };
    lines.push(format!("{}{}{}", prefix, connector, node.label));

    let child_prefix = if depth == 0 {
        String::new()
    } else if is_last {
        format!("{}   ", prefix)
    } else {
        format!("{}│  ", prefix)
    };

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == node.children.len() - 1;
        format_node(child, depth + 1, &child_prefix, is_last_child, lines);
    }
}

/// Format content as a truncated summary.
fn format_content_summary(content: &str, max_chars: usize) -> String {
    // First line only
    let first_line = content.lines().next().unwrap_or("");
    let trimmed = first_line.trim();

    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
