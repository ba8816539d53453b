use serde::Serialize;
use serde_json::Value;

// ── HTTP contract ────────────────────────────────────────────────────────────

/// One entry of the `results` array, in upload order.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IdentificationResult {
    pub index: usize,
    pub filename: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Outcome {
    Identified {
        name: String,
        description: String,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<Value>,
    },
}

impl IdentificationResult {
    pub fn failed(index: usize, filename: Option<String>, error: impl ToString) -> Self {
        IdentificationResult {
            index,
            filename,
            outcome: Outcome::Failed {
                error: error.to_string(),
                raw: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    pub results: Vec<IdentificationResult>,
}

// ── Gemini generateContent body ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
pub struct InlineData<'a> {
    pub mime_type: &'a str,
    pub data: String,
}
