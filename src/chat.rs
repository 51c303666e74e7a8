use tracing::warn;

use crate::error::ScoutError;

use crate::llm::{ChatTurn, LlmClient, LlmRequest};
use crate::paper::Paper;

pub const MAX_CONTEXT_PAPERS: usize = 50;
pub const ABSTRACT_PREVIEW_CHARS: usize = 200;

pub const SYSTEM_OVERLOADED_REPLY: &str =
    "The research assistant is overloaded right now (provider quota reached). Please try again in a few minutes.";
pub const GENERIC_FAILURE_REPLY: &str =
    "Sorry, I could not reach the research assistant. Please check your settings and try again.";

pub fn build_context(papers: &[Paper]) -> String {
    papers
        .iter()
        .take(MAX_CONTEXT_PAPERS)
        .enumerate()
        .map(|(index, paper)| {
            format!(
                "[{}] Title: {} | Date: {} | Abstract: {}",
                index + 1,
                paper.title,
                paper.published_date,
                preview(&paper.abstract_text, ABSTRACT_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn system_instruction(papers: &[Paper]) -> String {
    let context = build_context(papers);
    let context = if context.is_empty() {
        "(the library is empty)".to_string()
    } else {
        context
    };
    format!(
        "You are a research assistant for a banking AI research team. Answer using the paper \
library below. Cite papers by their number in square brackets, e.g. [1] or [2][5], whenever you \
use them, and say so plainly when the library does not cover the question.\n\nLibrary:\n{context}"
    )
}

pub fn query_corpus<C: LlmClient + ?Sized>(
    client: &C,
    history: &[ChatTurn],
    message: &str,
    papers: &[Paper],
) -> String {
    let request = LlmRequest::new(message)
        .with_system(system_instruction(papers))
        .with_history(history.to_vec());
    match client.generate(&request) {
        Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
        Ok(_) => GENERIC_FAILURE_REPLY.to_string(),
        Err(err) if err.is_quota() => {
            warn!(error = %err, "chat hit provider quota");
            SYSTEM_OVERLOADED_REPLY.to_string()
        }
        Err(err) => {
            warn!(error = %err, "chat request failed");
            GENERIC_FAILURE_REPLY.to_string()
        }
    }
}

pub fn parse_history(content: &str) -> Result<Vec<ChatTurn>, ScoutError> {
    serde_json::from_str(content)
        .map_err(|err| ScoutError::InvalidValue(format!("chat history: {err}")))
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
