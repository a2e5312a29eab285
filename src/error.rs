/// Failure modes of a lookup request (word, sentence or translation).
///
/// Malformed structured output is deliberately absent: the panel falls back
/// to the raw answer instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Missing {0}")]
    InvalidInput(&'static str),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Missing OpenRouter API key")]
    MissingKey,

    #[error("upstream request failed: {0:#}")]
    Transport(#[from] anyhow::Error),

    #[error("request superseded")]
    Cancelled,
}

impl LookupError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LookupError::InvalidInput(_) | LookupError::UnsupportedLanguage(_)
        )
    }
}
