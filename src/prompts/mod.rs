use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::analyzer::AnalysisRequest;

const WORD_SYSTEM_TEMPLATE: &str = include_str!("templates/word_system.tera");
const WORD_USER_TEMPLATE: &str = include_str!("templates/word_user.tera");
const SENTENCE_SYSTEM_TEMPLATE: &str = include_str!("templates/sentence_system.tera");
const SENTENCE_USER_TEMPLATE: &str = include_str!("templates/sentence_user.tera");

/// Separator the model is told to put between case name and form.
pub const CASE_SEPARATOR: &str = " — ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub fn word_prompts(request: &AnalysisRequest) -> Result<PromptPair> {
    Ok(PromptPair {
        system: word_system_prompt()?,
        user: word_user_prompt(request)?,
    })
}

pub fn sentence_prompts(sentence: &str) -> Result<PromptPair> {
    Ok(PromptPair {
        system: sentence_system_prompt()?,
        user: sentence_user_prompt(sentence)?,
    })
}

/// The six-part analytical procedure for a single word.
pub fn word_system_prompt() -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("cases_field", "grammar.cases");
    context.insert("case_separator", CASE_SEPARATOR);
    render("word system prompt", WORD_SYSTEM_TEMPLATE, &context)
}

pub fn word_user_prompt(request: &AnalysisRequest) -> Result<String> {
    let mut context = TeraContext::new();
    if let Some(sentence) = request.sentence() {
        context.insert("sentence", sentence);
    }
    context.insert("word", request.word());
    render("word prompt", WORD_USER_TEMPLATE, &context)
}

/// The four-point colloquial-register breakdown.
pub fn sentence_system_prompt() -> Result<String> {
    render(
        "sentence system prompt",
        SENTENCE_SYSTEM_TEMPLATE,
        &TeraContext::new(),
    )
}

pub fn sentence_user_prompt(sentence: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("sentence", sentence.trim());
    render("sentence prompt", SENTENCE_USER_TEMPLATE, &context)
}

fn render(label: &str, template: &str, context: &TeraContext) -> Result<String> {
    let rendered = Tera::one_off(template, context, false)
        .with_context(|| format!("failed to render {}", label))?;
    Ok(rendered.trim_end().to_string())
}
