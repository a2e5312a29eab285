use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

mod openrouter;

pub use openrouter::OpenRouter;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    /// Raw assistant text, possibly empty.
    pub content: String,
    /// Structured object when the provider's own structured-output mode
    /// produced one.
    pub parsed: Option<Value>,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reasoning {
    pub effort: String,
    pub max_tokens: u32,
    pub exclude: bool,
    pub enabled: bool,
}

impl Reasoning {
    /// Hidden reasoning with a bounded budget.
    pub fn hidden(effort: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            effort: effort.into(),
            max_tokens,
            exclude: true,
            enabled: true,
        }
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

/// A chat-completion backend, configured by value and consumed by
/// [`Provider::complete`].
pub trait Provider: Clone + Send + Sync + 'static {
    fn with_model(self, model: String) -> Self;
    fn with_temperature(self, temperature: f32) -> Self;
    fn with_reasoning(self, reasoning: Reasoning) -> Self;
    fn with_response_format(self, format: Value) -> Self;
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn complete(self) -> ProviderFuture;
}

pub fn resolve_key(override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key.filter(|key| !key.trim().is_empty()) {
        return Ok(key.to_string());
    }
    crate::settings::get_env(API_KEY_ENV)
        .ok_or_else(|| anyhow!("API key not found (checked {})", API_KEY_ENV))
}
