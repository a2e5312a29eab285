use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct AnalyzeWordRequest {
    pub(crate) sentence: Option<String>,
    pub(crate) word: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ExplainSentenceRequest {
    pub(crate) sentence: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExplainSentenceResponse {
    pub(crate) explanation: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TranslateRequest {
    pub(crate) text: Option<String>,
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslateResponse {
    pub(crate) translation: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct WordPageQuery {
    pub(crate) word: Option<String>,
    pub(crate) sentence: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
