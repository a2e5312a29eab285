use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LookupError;
use crate::extract;
use crate::prompts;
use crate::providers::{self, OpenRouter, Provider, ProviderResponse, Reasoning};
use crate::schema;
use crate::settings::Settings;

/// A validated word lookup. The word is trimmed and non-empty; a blank
/// sentence counts as no sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    sentence: Option<String>,
    word: String,
}

impl AnalysisRequest {
    pub fn new(sentence: Option<String>, word: &str) -> Result<Self, LookupError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(LookupError::InvalidInput("word"));
        }
        let sentence = sentence
            .map(|sentence| sentence.trim().to_string())
            .filter(|sentence| !sentence.is_empty());
        Ok(Self {
            sentence,
            word: word.to_string(),
        })
    }

    pub fn sentence(&self) -> Option<&str> {
        self.sentence.as_deref()
    }

    pub fn word(&self) -> &str {
        &self.word
    }
}

/// Wire shape of a word analysis: the raw model text plus whatever
/// structured object could be recovered from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub content: String,
    pub analysis: Option<Value>,
}

impl AnalysisOutcome {
    pub fn recovered(&self) -> Option<Value> {
        match &self.analysis {
            Some(analysis) if analysis.is_object() => Some(analysis.clone()),
            _ => extract::recover_object(&self.content),
        }
    }

    pub fn raw_content(&self) -> Option<&str> {
        let content = self.content.trim();
        (!content.is_empty()).then_some(content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    pub word_model: String,
    pub sentence_model: String,
    pub word_temperature: f32,
    pub sentence_temperature: f32,
    pub reasoning: Reasoning,
}

impl AnalyzerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            word_model: settings.word_model.clone(),
            sentence_model: settings.sentence_model().to_string(),
            word_temperature: settings.word_temperature,
            sentence_temperature: settings.sentence_temperature,
            reasoning: Reasoning::hidden(
                settings.reasoning_effort.clone(),
                settings.reasoning_max_tokens,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analyzer<P: Provider> {
    provider: P,
    options: AnalyzerOptions,
}

impl Analyzer<OpenRouter> {
    /// OpenRouter-backed analyzer; the key comes from the override or the
    /// environment.
    pub fn from_settings(settings: &Settings, key: Option<&str>) -> Result<Self, LookupError> {
        let key = providers::resolve_key(key).map_err(|_| LookupError::MissingKey)?;
        let provider = OpenRouter::new(key).with_base_url(settings.base_url.clone());
        Ok(Self::new(provider, AnalyzerOptions::from_settings(settings)))
    }
}

impl<P: Provider> Analyzer<P> {
    pub fn new(provider: P, options: AnalyzerOptions) -> Self {
        Self { provider, options }
    }

    pub async fn analyze_word(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisOutcome, LookupError> {
        let prompts = prompts::word_prompts(request)?;
        let response = self
            .provider
            .clone()
            .with_model(self.options.word_model.clone())
            .with_temperature(self.options.word_temperature)
            .with_reasoning(self.options.reasoning.clone())
            .with_response_format(schema::response_format())
            .append_system_input(prompts.system)
            .append_user_input(prompts.user)
            .complete()
            .await?;
        log_usage("word", &response);

        let analysis = match response.parsed.filter(Value::is_object) {
            Some(parsed) => Some(parsed),
            None => {
                tracing::debug!(word = request.word(), "no parsed object, recovering from text");
                extract::recover_object(&response.content)
            }
        };
        if let Some(analysis) = &analysis {
            if !schema::conforms(analysis) {
                tracing::debug!(word = request.word(), "analysis drifts from the schema");
            }
        }
        Ok(AnalysisOutcome {
            content: response.content,
            analysis,
        })
    }

    /// Returns the trimmed explanation; an empty model answer stays empty.
    pub async fn explain_sentence(&self, sentence: &str) -> Result<String, LookupError> {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return Err(LookupError::InvalidInput("sentence"));
        }
        let prompts = prompts::sentence_prompts(sentence)?;
        let response = self
            .provider
            .clone()
            .with_model(self.options.sentence_model.clone())
            .with_temperature(self.options.sentence_temperature)
            .append_system_input(prompts.system)
            .append_user_input(prompts.user)
            .complete()
            .await?;
        log_usage("sentence", &response);
        Ok(response.content.trim().to_string())
    }
}

fn log_usage(lookup: &'static str, response: &ProviderResponse) {
    let Some(usage) = &response.usage else {
        return;
    };
    tracing::debug!(
        lookup,
        model = response.model.as_deref().unwrap_or("unknown"),
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        "provider usage"
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::providers::{ProviderFuture, ProviderResponse};
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    /// Snapshot of one provider call as the analyzer configured it.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordedCall {
        pub model: String,
        pub temperature: Option<f32>,
        pub reasoning: Option<Reasoning>,
        pub response_format: Option<Value>,
        pub system: Vec<String>,
        pub user: Vec<String>,
    }

    #[derive(Clone)]
    pub(crate) enum Reply {
        Text(String),
        Parsed(String, Value),
        /// Answers with the last user prompt.
        EchoUser,
        Fail,
    }

    #[derive(Clone)]
    pub(crate) struct TestProvider {
        reply: Reply,
        delay: Duration,
        call: RecordedCall,
        calls: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl TestProvider {
        pub(crate) fn new(reply: Reply) -> Self {
            Self {
                reply,
                delay: Duration::ZERO,
                call: RecordedCall::default(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn text(content: &str) -> Self {
            Self::new(Reply::Text(content.to_string()))
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().clone()
        }
    }

    impl Provider for TestProvider {
        fn with_model(mut self, model: String) -> Self {
            self.call.model = model;
            self
        }

        fn with_temperature(mut self, temperature: f32) -> Self {
            self.call.temperature = Some(temperature);
            self
        }

        fn with_reasoning(mut self, reasoning: Reasoning) -> Self {
            self.call.reasoning = Some(reasoning);
            self
        }

        fn with_response_format(mut self, format: Value) -> Self {
            self.call.response_format = Some(format);
            self
        }

        fn append_system_input(mut self, input: String) -> Self {
            self.call.system.push(input);
            self
        }

        fn append_user_input(mut self, input: String) -> Self {
            self.call.user.push(input);
            self
        }

        fn complete(self) -> ProviderFuture {
            Box::pin(async move {
                self.calls.lock().push(self.call.clone());
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                let (content, parsed) = match self.reply {
                    Reply::Text(content) => (content, None),
                    Reply::Parsed(content, parsed) => (content, Some(parsed)),
                    Reply::EchoUser => (self.call.user.last().cloned().unwrap_or_default(), None),
                    Reply::Fail => return Err(anyhow!("upstream unavailable")),
                };
                Ok(ProviderResponse {
                    content,
                    parsed,
                    model: Some(self.call.model.clone()),
                    usage: None,
                })
            })
        }
    }

    pub(crate) fn test_options() -> AnalyzerOptions {
        AnalyzerOptions {
            word_model: "test/word".to_string(),
            sentence_model: "test/sentence".to_string(),
            word_temperature: 0.9,
            sentence_temperature: 0.7,
            reasoning: Reasoning::hidden("medium", 1500),
        }
    }

    #[test]
    fn blank_word_is_rejected() {
        let error = AnalysisRequest::new(Some("Речення.".to_string()), "   ").unwrap_err();
        assert!(matches!(error, LookupError::InvalidInput("word")));
        assert_eq!(error.to_string(), "Missing word");
    }

    #[test]
    fn blank_sentence_becomes_none() {
        let request = AnalysisRequest::new(Some("  ".to_string()), " яблуко ").unwrap();
        assert_eq!(request.sentence(), None);
        assert_eq!(request.word(), "яблуко");
    }

    #[test]
    fn outcome_prefers_object_analysis_over_text() {
        let outcome = AnalysisOutcome {
            content: r#"{"origin": "from text"}"#.to_string(),
            analysis: Some(json!({"origin": "parsed"})),
        };
        assert_eq!(outcome.recovered(), Some(json!({"origin": "parsed"})));

        let outcome = AnalysisOutcome {
            content: r#"Ось відповідь: {"origin": "from text"}"#.to_string(),
            analysis: Some(json!("not an object")),
        };
        assert_eq!(outcome.recovered(), Some(json!({"origin": "from text"})));
        assert_eq!(
            AnalysisOutcome::default().raw_content(),
            None,
            "empty content has no disclosure"
        );
    }

    #[tokio::test]
    async fn word_call_carries_schema_reasoning_and_prompts() {
        let provider = TestProvider::text(r#"{"origin": "праслов'янське"}"#);
        let analyzer = Analyzer::new(provider.clone(), test_options());
        let request =
            AnalysisRequest::new(Some("Я їм яблуко.".to_string()), "яблуко").unwrap();

        let outcome = analyzer.analyze_word(&request).await.unwrap();
        assert_eq!(outcome.analysis, Some(json!({"origin": "праслов'янське"})));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.model, "test/word");
        assert_eq!(call.temperature, Some(0.9));
        assert_eq!(call.reasoning, Some(Reasoning::hidden("medium", 1500)));
        assert_eq!(call.response_format, Some(schema::response_format()));
        assert_eq!(call.system.len(), 1);
        assert!(call.user[0].contains("Слово: яблуко"));
        assert!(call.user[0].contains("Речення: Я їм яблуко."));
    }

    #[tokio::test]
    async fn parsed_object_wins_over_text() {
        let provider = TestProvider::new(Reply::Parsed(
            "unparseable".to_string(),
            json!({"origin": "parsed"}),
        ));
        let analyzer = Analyzer::new(provider, test_options());
        let request = AnalysisRequest::new(None, "яблуко").unwrap();
        let outcome = analyzer.analyze_word(&request).await.unwrap();
        assert_eq!(outcome.content, "unparseable");
        assert_eq!(outcome.analysis, Some(json!({"origin": "parsed"})));
    }

    #[tokio::test]
    async fn prose_answer_keeps_content_without_analysis() {
        let analyzer = Analyzer::new(TestProvider::text("Це яблуко."), test_options());
        let request = AnalysisRequest::new(None, "яблуко").unwrap();
        let outcome = analyzer.analyze_word(&request).await.unwrap();
        assert_eq!(outcome.content, "Це яблуко.");
        assert_eq!(outcome.analysis, None);
    }

    #[tokio::test]
    async fn provider_failure_is_transport() {
        let analyzer = Analyzer::new(TestProvider::new(Reply::Fail), test_options());
        let request = AnalysisRequest::new(None, "яблуко").unwrap();
        let error = analyzer.analyze_word(&request).await.unwrap_err();
        assert!(matches!(error, LookupError::Transport(_)));
        assert!(!error.is_validation());
    }

    #[tokio::test]
    async fn sentence_uses_sentence_model_without_schema() {
        let provider = TestProvider::text("  1. **Стисла перефраза:** жарт  \n");
        let analyzer = Analyzer::new(provider.clone(), test_options());
        let explanation = analyzer.explain_sentence(" Я тут таке написав ").await.unwrap();
        assert_eq!(explanation, "1. **Стисла перефраза:** жарт");

        let call = &provider.calls()[0];
        assert_eq!(call.model, "test/sentence");
        assert_eq!(call.temperature, Some(0.7));
        assert!(call.reasoning.is_none());
        assert!(call.response_format.is_none());
        assert!(call.user[0].contains("«Я тут таке написав»"));
    }

    #[tokio::test]
    async fn blank_sentence_makes_no_call() {
        let provider = TestProvider::text("unused");
        let analyzer = Analyzer::new(provider.clone(), test_options());
        let error = analyzer.explain_sentence("  ").await.unwrap_err();
        assert_eq!(error.to_string(), "Missing sentence");
        assert!(provider.calls().is_empty());
    }
}
