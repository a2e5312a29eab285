use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use crate::error::LookupError;
use crate::languages::Language;

pub const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

/// A translation between two supported languages. Construction is the only
/// validation step; nothing invalid reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub from: Language,
    pub to: Language,
}

impl TranslationRequest {
    pub fn new(text: &str, from: &str, to: &str) -> Result<Self, LookupError> {
        let from = Language::from_code(from)?;
        let to = Language::from_code(to)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LookupError::InvalidInput("text"));
        }
        Ok(Self {
            text: text.to_string(),
            from,
            to,
        })
    }

    pub fn langpair(&self) -> String {
        format!("{}|{}", self.from, self.to)
    }
}

pub type TranslationFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

pub trait TranslationService: Clone + Send + Sync + 'static {
    fn translate(&self, request: TranslationRequest) -> TranslationFuture;
}

/// Client for the public MyMemory `get` endpoint.
#[derive(Debug, Clone)]
pub struct MyMemory {
    endpoint: String,
    client: reqwest::Client,
}

impl MyMemory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint
        };
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

impl TranslationService for MyMemory {
    fn translate(&self, request: TranslationRequest) -> TranslationFuture {
        let this = self.clone();
        Box::pin(async move {
            let langpair = request.langpair();
            let response = this
                .client
                .get(&this.endpoint)
                .query(&[("q", request.text.as_str()), ("langpair", langpair.as_str())])
                .send()
                .await
                .with_context(|| "MyMemory request failed")?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!("MyMemory API error ({}): {}", status, body));
            }
            extract_translation(&body)
        })
    }
}

/// Reads `responseData.translatedText`; an absent field is an empty
/// translation, not an error.
fn extract_translation(body: &str) -> Result<String> {
    let payload: Value =
        serde_json::from_str(body).with_context(|| "failed to parse MyMemory response JSON")?;
    Ok(payload
        .pointer("/responseData/translatedText")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}
