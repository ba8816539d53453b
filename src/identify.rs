use base64::Engine;
use serde_json::Value;

use crate::config::Config;
use crate::models::{Content, GenerateContentRequest, InlineData, Part};

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "labid-api/0.1";

pub const PROMPT: &str = "Identify the laboratory equipment in this image and provide a short description \
     of what it is used for. Format the output as:\n\
     Name: <name>\nDescription: <description>";

const ANSWER_POINTER: &str = "/candidates/0/content/parts/0/text";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("API request failed: {0}")]
    Request(String),
    #[error("Unexpected response format from model.")]
    UnexpectedFormat { raw: Value },
}

// ── Public result type ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub name: String,
    pub description: String,
}

// ── Recognizer ───────────────────────────────────────────────────────────────

/// Client for the generateContent endpoint. Cheap to share; holds one
/// connection pool.
pub struct Recognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl Recognizer {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::ClientBuilder::new()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Recognizer {
            client,
            endpoint: config.generate_url(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn identify(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<Identification, RecognitionError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: PROMPT },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: base64::engine::general_purpose::STANDARD.encode(bytes),
                        },
                    },
                ],
            }],
        };

        tracing::debug!(mime_type, size = bytes.len(), "calling model");

        // The URL carries the key, so it is stripped from every error.
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| RecognitionError::Request(describe(e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Request(format!("{}: {}", status, text.trim())));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| RecognitionError::Request(describe(e)))?;

        match raw.pointer(ANSWER_POINTER).and_then(Value::as_str) {
            Some(text) => Ok(parse_answer(text)),
            None => Err(RecognitionError::UnexpectedFormat { raw }),
        }
    }
}

fn describe(e: reqwest::Error) -> String {
    let timed_out = e.is_timeout();
    let e = e.without_url();
    if timed_out {
        format!("timed out: {}", e)
    } else {
        e.to_string()
    }
}

// ── Answer parsing ───────────────────────────────────────────────────────────

/// Pulls `Name:` and `Description:` lines out of the model's answer.
///
/// Missing name becomes `"Unknown"`. The whole trimmed answer stands in for
/// the description only when neither line was found.
pub fn parse_answer(text: &str) -> Identification {
    let mut name = String::new();
    let mut description = String::new();

    for line in text.split(is_line_break) {
        let lower = line.trim_start().to_lowercase();
        if lower.starts_with("name:") {
            name = after_colon(line);
        } else if lower.starts_with("description:") {
            description = after_colon(line);
        }
    }

    if name.is_empty() && description.is_empty() {
        description = text.trim().to_string();
    }
    if name.is_empty() {
        name = "Unknown".to_string();
    }

    Identification { name, description }
}

/// Every separator Unicode treats as a line boundary, including bare `\r`.
/// A `\r\n` pair leaves an empty piece between, which matches nothing.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}
