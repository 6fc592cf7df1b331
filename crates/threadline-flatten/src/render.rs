//! Block transformer: one unit in, one content block out.
//!
//! Stateless. Tool results are paired with invocations by `tool_call_id`;
//! an invocation without a result yet renders as a pending exchange, which
//! is how a still-streaming turn shows up.

use threadline_types::{
    AssistantGroup, BranchDescriptor, ContentBlock, Message, PlainMessage, TextBlock, ToolExchange,
    ToolResultRef, ToolStepBlock,
};

use crate::sequence::AssistantTurn;

/// What a single content block is rendered from.
#[derive(Debug, Clone)]
pub enum RenderUnit<'a> {
    /// A message shown as its own text (user input, a final answer).
    Message(&'a Message),
    /// An invoking assistant message and the tool messages answering it.
    ToolStep {
        assistant: &'a Message,
        results: Vec<&'a Message>,
    },
    /// Tool messages whose invoking assistant was emitted by an earlier item.
    ///
    /// Renders only the answered invocations, without repeating the
    /// assistant's text.
    DetachedResults {
        assistant: &'a Message,
        results: Vec<&'a Message>,
    },
}

/// Render one unit into one content block.
pub fn render_block(unit: &RenderUnit<'_>) -> ContentBlock {
    match unit {
        RenderUnit::Message(msg) => ContentBlock::Text(TextBlock {
            message_id: msg.id.clone(),
            role: msg.role,
            content: msg.content.clone(),
        }),
        RenderUnit::ToolStep { assistant, results } => ContentBlock::ToolStep(ToolStepBlock {
            message_id: assistant.id.clone(),
            content: assistant.content.clone(),
            exchanges: assistant
                .tools
                .iter()
                .map(|inv| ToolExchange {
                    invocation: inv.clone(),
                    result: find_result(results, inv),
                })
                .collect(),
        }),
        RenderUnit::DetachedResults { assistant, results } => ContentBlock::ToolStep(ToolStepBlock {
            message_id: assistant.id.clone(),
            content: String::new(),
            exchanges: assistant
                .tools
                .iter()
                .filter_map(|inv| {
                    find_result(results, inv).map(|result| ToolExchange {
                        invocation: inv.clone(),
                        result: Some(result),
                    })
                })
                .collect(),
        }),
    }
}

/// First result answering `inv`; later duplicates for the same call are not shown.
fn find_result(results: &[&Message], inv: &threadline_types::ToolInvocation) -> Option<ToolResultRef> {
    results
        .iter()
        .find(|r| r.tool_call_id.as_ref() == Some(&inv.id))
        .map(|r| ToolResultRef {
            message_id: r.id.clone(),
            content: r.content.clone(),
        })
}

/// Render a collected turn as one assistant group.
pub fn render_turn(turn: &AssistantTurn<'_>, branch: Option<BranchDescriptor>) -> AssistantGroup {
    AssistantGroup {
        id: turn.head().id.clone(),
        blocks: turn.units.iter().map(render_block).collect(),
        message_ids: turn.message_ids.iter().map(|id| (*id).clone()).collect(),
        branch,
    }
}

/// Wrap a message as a standalone item.
pub fn render_plain(msg: &Message, branch: Option<BranchDescriptor>) -> PlainMessage {
    PlainMessage {
        message: msg.clone(),
        branch,
    }
}
