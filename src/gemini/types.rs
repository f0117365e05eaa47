//! Request and response shapes of the `generateContent` REST endpoint.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text written by the user (or the prompt built on their behalf).
    User,
    /// Text previously produced by the model.
    Model,
}

/// One turn of the conversation sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Turn author.
    pub role: Role,
    /// Turn text.
    pub text: String,
}

impl Turn {
    /// User turn carrying `text`.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

/// Sampling parameters forwarded as `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Maximum tokens in the response.
    pub max_output_tokens: u32,
}

/// Provider-neutral generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Conversation turns, oldest first; the last turn is the prompt to answer.
    pub turns: Vec<Turn>,
    /// Sampling parameters.
    pub settings: GenerationSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentBody<'a> {
    pub(super) contents: Vec<ContentBody<'a>>,
    pub(super) generation_config: GenerationSettings,
}

#[derive(Serialize)]
pub(super) struct ContentBody<'a> {
    pub(super) role: Role,
    pub(super) parts: [PartBody<'a>; 1],
}

#[derive(Serialize)]
pub(super) struct PartBody<'a> {
    pub(super) text: &'a str,
}

impl<'a> From<&'a GenerationRequest> for GenerateContentBody<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            contents: request
                .turns
                .iter()
                .map(|turn| ContentBody {
                    role: turn.role,
                    parts: [PartBody { text: &turn.text }],
                })
                .collect(),
            generation_config: request.settings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GenerateContentResponse {
    #[serde(default)]
    pub(super) candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Candidate {
    pub(super) content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    pub(super) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidateContent {
    #[serde(default)]
    pub(super) parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidatePart {
    pub(super) text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub(super) fn first_text(self) -> Result<String, String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| "response contained no candidates".to_string())?;
        let finish_reason = candidate.finish_reason.unwrap_or_default();
        candidate
            .content
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| format!("candidate contained no text (finishReason: {finish_reason})"))
    }
}
