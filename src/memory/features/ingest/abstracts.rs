// src/memory/features/ingest/abstracts.rs

//! Abstract prompt and response grammar.
//!
//! The LLM is asked for a `SUMMARY:` line followed by a `HEADERS:` bullet
//! list. Parsing is tolerant: anything that does not fit the grammar is
//! ignored, and a fully garbled response yields an empty summary and no
//! headers — the write still proceeds.

pub const ABSTRACT_SYSTEM_PROMPT: &str = "\
You distill conversation turns into compact index records for later recall.
Reply with exactly this layout and nothing else:

SUMMARY: <one sentence capturing what the turn was about>
HEADERS:
- <keyword>
- <keyword>

Use 3 to 7 short headers naming the topics, entities, and tasks in the turn.";

pub fn abstract_user_prompt(page_content: &str) -> String {
    format!("Produce the index record for this conversation turn:\n\n{page_content}")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAbstract {
    pub summary: String,
    pub headers: Vec<String>,
}

/// Parse an abstract response. Field prefixes are case-insensitive; header
/// bullets require a leading `-`; unknown lines are skipped.
pub fn parse_abstract_response(text: &str) -> ParsedAbstract {
    let mut parsed = ParsedAbstract::default();
    let mut in_headers = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        let lower = line.to_lowercase();

        if let Some(rest) = lower.strip_prefix("summary:") {
            let offset = line.len() - rest.len();
            parsed.summary = line[offset..].trim().to_string();
            in_headers = false;
        } else if lower.starts_with("headers:") {
            in_headers = true;
        } else if in_headers && line.starts_with('-') {
            let header = line[1..].trim();
            if !header.is_empty() {
                parsed.headers.push(header.to_string());
            }
        }
    }

    parsed
}
