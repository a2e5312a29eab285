use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

pub mod analyzer;
pub mod error;
pub mod extract;
pub mod languages;
pub mod logging;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod schema;
pub mod server;
pub mod session;
pub mod settings;
pub mod translate;

#[cfg(test)]
mod test_util;

pub use analyzer::{AnalysisOutcome, AnalysisRequest, Analyzer};
pub use error::LookupError;
pub use providers::{OpenRouter, Provider, ProviderUsage};
pub use render::TextStyle;
pub use translate::{MyMemory, TranslationRequest, TranslationService};

/// One-shot lookup requested from the command line.
#[derive(Debug, Clone)]
pub enum Lookup {
    Word {
        word: String,
        sentence: Option<String>,
    },
    Explain {
        sentence: String,
    },
    Translate {
        text: String,
        from: Option<String>,
        to: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub lookup: Lookup,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    /// Print the wire payload instead of rendered sections.
    pub json: bool,
    pub style: TextStyle,
}

/// Loads layered settings and applies a model override to both word and
/// sentence lookups.
pub fn load_settings(
    settings_path: Option<&str>,
    model: Option<&str>,
) -> Result<settings::Settings> {
    let mut settings = settings::load_settings(settings_path.map(Path::new))?;
    if let Some(model) = model.map(str::trim).filter(|model| !model.is_empty()) {
        settings.word_model = model.to_string();
        settings.sentence_model = Some(model.to_string());
    }
    Ok(settings)
}

pub async fn run(config: Config) -> Result<String> {
    let settings = load_settings(config.settings_path.as_deref(), config.model.as_deref())?;

    match config.lookup {
        Lookup::Word { word, sentence } => {
            let request = AnalysisRequest::new(sentence, &word)?;
            let analyzer = Analyzer::from_settings(&settings, config.key.as_deref())
                .with_context(|| "set OPENROUTER_API_KEY or pass --key")?;
            let outcome = analyzer.analyze_word(&request).await?;
            if config.json {
                return Ok(serde_json::to_string_pretty(&outcome)?);
            }
            let panel = render::WordPanel {
                word: request.word(),
                sentence: request.sentence(),
                outcome: Some(&outcome),
                loading: false,
                error: None,
            };
            Ok(render::render_text(
                request.word(),
                &render::word_sections(&panel),
                config.style,
            ))
        }
        Lookup::Explain { sentence } => {
            let analyzer = Analyzer::from_settings(&settings, config.key.as_deref())
                .with_context(|| "set OPENROUTER_API_KEY or pass --key")?;
            let explanation = analyzer.explain_sentence(&sentence).await?;
            if config.json {
                return Ok(serde_json::to_string_pretty(
                    &json!({ "explanation": explanation }),
                )?);
            }
            let text = session::ExplainState::Resolved(explanation).text(sentence.trim());
            Ok(render::render_spans(
                &render::parse_emphasis(&text),
                config.style,
            ))
        }
        Lookup::Translate { text, from, to } => {
            let from = from.unwrap_or_else(|| settings.default_from.clone());
            let to = to.unwrap_or_else(|| settings.default_to.clone());
            let request = TranslationRequest::new(&text, &from, &to)?;
            let translation = MyMemory::new(settings.translate_endpoint.clone())
                .translate(request)
                .await?;
            if config.json {
                return Ok(serde_json::to_string_pretty(
                    &json!({ "translation": translation }),
                )?);
            }
            Ok(translation)
        }
    }
}
