use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::LookupError;

/// The fixed set of languages the translation endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Uk,
    De,
    Es,
    Fr,
}

pub const SUPPORTED_LANGUAGES: [Language; 5] = [
    Language::En,
    Language::Uk,
    Language::De,
    Language::Es,
    Language::Fr,
];

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Uk => "uk",
            Language::De => "de",
            Language::Es => "es",
            Language::Fr => "fr",
        }
    }

    /// Display name in the interface language (Ukrainian).
    pub fn label(&self) -> &'static str {
        match self {
            Language::En => "Англійська",
            Language::Uk => "Українська",
            Language::De => "Німецька",
            Language::Es => "Іспанська",
            Language::Fr => "Французька",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, LookupError> {
        let normalized = normalize_code(code);
        SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|language| language.code() == normalized)
            .ok_or_else(|| LookupError::UnsupportedLanguage(code.trim().to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LookupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Language::from_code(value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn language_options() -> Vec<LanguageOption> {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|language| LanguageOption {
            value: language.code(),
            label: language.label(),
        })
        .collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
