//! Prompt assembly for summaries and document chat.

use crate::gemini::{GenerationRequest, GenerationSettings, Role, Turn};
use crate::session::ChatExchange;
use std::borrow::Cow;

/// Marker appended when document content exceeds the prompt budget.
pub const TRUNCATION_MARKER: &str = "\n... [Content Truncated]";

/// Sampling settings for summaries.
pub const SUMMARY_SETTINGS: GenerationSettings = GenerationSettings {
    temperature: 0.5,
    top_k: 1,
    top_p: 1.0,
    max_output_tokens: 2048,
};

/// Sampling settings for chat answers.
pub const CHAT_SETTINGS: GenerationSettings = GenerationSettings {
    temperature: 0.3,
    top_k: 1,
    top_p: 1.0,
    max_output_tokens: 1024,
};

/// Cut `content` to at most `max_chars` characters, marking the cut.
pub fn truncate_content(content: &str, max_chars: usize) -> Cow<'_, str> {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = String::with_capacity(byte_index + TRUNCATION_MARKER.len());
            truncated.push_str(&content[..byte_index]);
            truncated.push_str(TRUNCATION_MARKER);
            Cow::Owned(truncated)
        }
        None => Cow::Borrowed(content),
    }
}

/// Single-turn request asking for a multi-paragraph summary of `content`.
pub fn summary_request(content: &str, max_chars: usize) -> GenerationRequest {
    let content = truncate_content(content, max_chars);
    GenerationRequest {
        turns: vec![Turn::user(format!(
            "Please provide a concise, multi-paragraph summary of the following document content:\n\n---\n\n{content}"
        ))],
        settings: SUMMARY_SETTINGS,
    }
}

/// Request answering `question` from `content`, replaying `history` as prior turns.
pub fn chat_request(
    question: &str,
    content: &str,
    history: &[ChatExchange],
    max_chars: usize,
) -> GenerationRequest {
    let content = truncate_content(content, max_chars);
    let mut turns = Vec::with_capacity(history.len() * 2 + 1);
    for exchange in history {
        turns.push(Turn::user(exchange.question.clone()));
        turns.push(Turn {
            role: Role::Model,
            text: exchange.answer.clone(),
        });
    }
    turns.push(Turn::user(format!(
        "Based on the following document content, please answer this question: {question}\n\n\
         Document content:\n---\n{content}\n\n\
         Please provide a detailed and accurate answer based only on the information in the document. \
         If the answer cannot be found in the document, please say so."
    )));
    GenerationRequest {
        turns,
        settings: CHAT_SETTINGS,
    }
}
