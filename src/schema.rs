//! The closed output contract enforced on word analyses.
//!
//! [`response_format`] is what the provider receives; the serde types mirror
//! it so a recovered value can be checked against the contract.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SCHEMA_NAME: &str = "word_analysis";

/// A single morpheme slot. Models emit either one segment or a list of
/// segments for compound/repeated morphemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Morpheme {
    Single(String),
    Compound(Vec<String>),
}

impl Default for Morpheme {
    fn default() -> Self {
        Morpheme::Single(String::new())
    }
}

impl Morpheme {
    /// Projects both variants onto a list of non-blank, trimmed segments.
    pub fn segments(&self) -> Vec<String> {
        match self {
            Morpheme::Single(value) => {
                let value = value.trim();
                if value.is_empty() {
                    Vec::new()
                } else {
                    vec![value.to_string()]
                }
            }
            Morpheme::Compound(values) => values
                .iter()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WordAnalysis {
    pub synonyms: Synonyms,
    pub grammar: Grammar,
    pub structure: Structure,
    pub origin: String,
    #[serde(default)]
    pub meanings: Vec<Meaning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Synonyms {
    #[serde(default)]
    pub modern: Vec<String>,
    #[serde(default)]
    pub archaic: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Grammar {
    pub part_of_speech: String,
    pub gender: String,
    #[serde(default)]
    pub cases: Vec<String>,
    pub number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Structure {
    #[serde(default)]
    pub prefix: Morpheme,
    #[serde(default)]
    pub root: Morpheme,
    #[serde(default)]
    pub suffix: Morpheme,
    #[serde(default)]
    pub ending: Morpheme,
    #[serde(default)]
    pub base: Morpheme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Meaning {
    pub definition: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Returns true when `value` has exactly the closed shape of the contract.
pub fn conforms(value: &Value) -> bool {
    WordAnalysis::deserialize(value).is_ok()
}

fn string_array() -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "default": []
    })
}

fn morpheme() -> Value {
    json!({
        "anyOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" } }
        ],
        "default": ""
    })
}

/// JSON Schema for the analysis object (closed at every level).
pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "synonyms": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "modern": string_array(),
                    "archaic": string_array()
                },
                "required": ["modern", "archaic"]
            },
            "grammar": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "part_of_speech": { "type": "string" },
                    "gender": { "type": "string" },
                    "cases": string_array(),
                    "number": { "type": "string" }
                },
                "required": ["part_of_speech", "gender", "cases", "number"]
            },
            "structure": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "prefix": morpheme(),
                    "root": morpheme(),
                    "suffix": morpheme(),
                    "ending": morpheme(),
                    "base": morpheme()
                },
                "required": ["prefix", "root", "suffix", "ending", "base"]
            },
            "origin": { "type": "string" },
            "meanings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "definition": { "type": "string" },
                        "examples": string_array(),
                        "notes": { "type": "string", "default": "" }
                    },
                    "required": ["definition", "examples", "notes"]
                },
                "default": []
            }
        },
        "required": ["synonyms", "grammar", "structure", "origin", "meanings"]
    })
}

/// `response_format` payload for an OpenAI-compatible chat completion.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "strict": true,
            "schema": analysis_schema()
        }
    })
}
