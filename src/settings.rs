use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub word_model: String,
    pub sentence_model: Option<String>,
    pub base_url: String,
    pub word_temperature: f32,
    pub sentence_temperature: f32,
    pub reasoning_effort: String,
    pub reasoning_max_tokens: u32,
    pub server_addr: String,
    pub dist_dir: PathBuf,
    pub translate_endpoint: String,
    pub debounce_ms: u64,
    pub default_from: String,
    pub default_to: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            word_model: "google/gemini-2.5-flash".to_string(),
            sentence_model: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            word_temperature: 0.9,
            sentence_temperature: 0.7,
            reasoning_effort: "medium".to_string(),
            reasoning_max_tokens: 1500,
            server_addr: "0.0.0.0:4000".to_string(),
            dist_dir: PathBuf::from("dist"),
            translate_endpoint: "https://api.mymemory.translated.net/get".to_string(),
            debounce_ms: 500,
            default_from: "en".to_string(),
            default_to: "uk".to_string(),
        }
    }
}

impl Settings {
    /// Model used for sentence explanations; falls back to the word model.
    pub fn sentence_model(&self) -> &str {
        self.sentence_model.as_deref().unwrap_or(&self.word_model)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    model: Option<ModelSettings>,
    server: Option<ServerSettings>,
    translate: Option<TranslateSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSettings {
    word: Option<String>,
    sentence: Option<String>,
    base_url: Option<String>,
    word_temperature: Option<f32>,
    sentence_temperature: Option<f32>,
    reasoning_effort: Option<String>,
    reasoning_max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    dist_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    endpoint: Option<String>,
    debounce_ms: Option<u64>,
    default_from: Option<String>,
    default_to: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded default settings")?;
    settings.merge(defaults);
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    settings.apply_env();
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(model) = incoming.model {
            if let Some(word) = non_blank(model.word) {
                self.word_model = word;
            }
            if let Some(sentence) = non_blank(model.sentence) {
                self.sentence_model = Some(sentence);
            }
            if let Some(base_url) = non_blank(model.base_url) {
                self.base_url = base_url;
            }
            if let Some(temperature) = model.word_temperature {
                if temperature >= 0.0 {
                    self.word_temperature = temperature;
                }
            }
            if let Some(temperature) = model.sentence_temperature {
                if temperature >= 0.0 {
                    self.sentence_temperature = temperature;
                }
            }
            if let Some(effort) = non_blank(model.reasoning_effort) {
                self.reasoning_effort = effort;
            }
            if let Some(limit) = model.reasoning_max_tokens {
                if limit > 0 {
                    self.reasoning_max_tokens = limit;
                }
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server_addr = addr;
            }
            if let Some(dir) = non_blank(server.dist_dir) {
                self.dist_dir = PathBuf::from(dir);
            }
        }
        if let Some(translate) = incoming.translate {
            if let Some(endpoint) = non_blank(translate.endpoint) {
                self.translate_endpoint = endpoint;
            }
            if let Some(debounce) = translate.debounce_ms {
                self.debounce_ms = debounce;
            }
            if let Some(from) = non_blank(translate.default_from) {
                self.default_from = from;
            }
            if let Some(to) = non_blank(translate.default_to) {
                self.default_to = to;
            }
        }
    }

    fn apply_env(&mut self) {
        if let Some(model) = get_env("OPENROUTER_MODEL") {
            self.word_model = model;
        }
        if let Some(model) = get_env("OPENROUTER_MODEL_SENTENCE") {
            self.sentence_model = Some(model);
        }
        if let Some(base_url) = get_env("OPENROUTER_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(port) = get_env("PORT") {
            let host = self
                .server_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server_addr = format!("{}:{}", host, port.trim());
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub(crate) fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".mova-lens"))
        }
    })
}
