// src/memory/features/ingest/format.rs

//! Deterministic page formatting.
//!
//! The page is the primary record: the turn's text is preserved verbatim
//! inside a fixed layout, so the same turn always yields byte-identical
//! content.

use crate::memory::core::types::ConversationTurn;

/// Render a turn as page content: timestamped header line, labelled user and
/// assistant blocks, optional tool-calls block.
pub fn format_page_content(turn: &ConversationTurn) -> String {
    let mut out = String::new();

    out.push('[');
    out.push_str(&turn.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    out.push(']');
    if let Some(conversation_id) = &turn.conversation_id {
        out.push_str(&format!(" conversation {conversation_id}"));
    }
    if let Some(turn_number) = turn.turn_number {
        out.push_str(&format!(" turn {turn_number}"));
    }
    out.push('\n');

    out.push_str("User:\n");
    out.push_str(&turn.user_message);
    out.push_str("\n\nAssistant:\n");
    out.push_str(&turn.assistant_message);
    out.push('\n');

    if let Some(calls) = &turn.tool_calls {
        if !calls.is_empty() {
            out.push_str("\nTool calls:\n");
            for call in calls {
                out.push_str(&format!(
                    "- {}({}) -> {}\n",
                    call.tool, call.arguments, call.result
                ));
            }
        }
    }

    out
}

/// English-text token estimate: roughly four characters per token.
pub fn estimate_tokens(content: &str) -> i32 {
    (content.len() / 4) as i32
}
