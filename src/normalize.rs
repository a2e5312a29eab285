//! Projection of a recovered analysis into a display view that never fails.
//!
//! Every field is coerced on its own and degrades to empty; nothing here
//! can fail, whatever shape the model produced.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Morpheme;

/// Substring that marks a verb in a Ukrainian part-of-speech label.
pub const VERB_MARKER: &str = "дієсл";

const CASE_SEPARATORS: [&str; 4] = [" — ", "—", " – ", " - "];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedView {
    pub modern_synonyms: Vec<String>,
    pub archaic_synonyms: Vec<String>,
    pub part_of_speech: Option<String>,
    pub is_verb: bool,
    pub gender: Option<String>,
    pub number: Option<String>,
    pub cases: Vec<CaseRow>,
    pub structure: Vec<MorphemeRow>,
    pub origin: Option<String>,
    pub meanings: Vec<MeaningItem>,
    pub quiz: Vec<QuizItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MorphemeKind {
    Prefix,
    Root,
    Suffix,
    Ending,
    Base,
}

impl MorphemeKind {
    pub const ALL: [MorphemeKind; 5] = [
        MorphemeKind::Prefix,
        MorphemeKind::Root,
        MorphemeKind::Suffix,
        MorphemeKind::Ending,
        MorphemeKind::Base,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MorphemeKind::Prefix => "prefix",
            MorphemeKind::Root => "root",
            MorphemeKind::Suffix => "suffix",
            MorphemeKind::Ending => "ending",
            MorphemeKind::Base => "base",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MorphemeKind::Prefix => "Префікс",
            MorphemeKind::Root => "Корінь",
            MorphemeKind::Suffix => "Суфікс",
            MorphemeKind::Ending => "Закінчення",
            MorphemeKind::Base => "Основа",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MorphemeRow {
    pub kind: MorphemeKind,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeaningItem {
    pub definition: Option<String>,
    pub examples: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizItem {
    pub question: Option<String>,
    pub options: Vec<String>,
    pub answer: Option<usize>,
}

impl NormalizedView {
    pub fn from_analysis(analysis: Option<&Value>) -> Self {
        let Some(root) = analysis.and_then(Value::as_object) else {
            return Self::default();
        };

        let synonyms = root.get("synonyms");
        let grammar = root.get("grammar");
        let structure = root.get("structure");
        let part_of_speech = text(member(grammar, "part_of_speech"));

        Self {
            modern_synonyms: string_sequence(member(synonyms, "modern")),
            archaic_synonyms: string_sequence(member(synonyms, "archaic")),
            is_verb: part_of_speech.as_deref().is_some_and(is_verb),
            part_of_speech,
            gender: text(member(grammar, "gender")),
            number: text(member(grammar, "number")),
            cases: string_sequence(member(grammar, "cases"))
                .iter()
                .map(|entry| split_case(entry))
                .collect(),
            structure: MorphemeKind::ALL
                .iter()
                .map(|kind| MorphemeRow {
                    kind: *kind,
                    values: morpheme(member(structure, kind.key())),
                })
                .filter(|row| !row.values.is_empty())
                .collect(),
            origin: text(root.get("origin")),
            meanings: objects(root.get("meanings"))
                .map(|meaning| MeaningItem {
                    definition: text(meaning.get("definition")),
                    examples: string_sequence(meaning.get("examples")),
                    notes: text(meaning.get("notes")),
                })
                .collect(),
            quiz: objects(root.get("quiz"))
                .map(|item| QuizItem {
                    question: text(item.get("question")),
                    options: string_sequence(item.get("options")),
                    answer: answer_index(item.get("answer")),
                })
                .collect(),
        }
    }

    pub fn has_synonyms(&self) -> bool {
        !self.modern_synonyms.is_empty() || !self.archaic_synonyms.is_empty()
    }

    pub fn has_morphology(&self) -> bool {
        self.part_of_speech.is_some()
            || self.gender.is_some()
            || self.number.is_some()
            || !self.cases.is_empty()
            || self.is_verb
    }

    /// First non-empty definition, used as the one-line summary.
    pub fn primary_meaning(&self) -> Option<&str> {
        self.meanings
            .first()
            .and_then(|meaning| meaning.definition.as_deref())
    }
}

fn member<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(|value| value.get(key))
}

fn text(value: Option<&Value>) -> Option<String> {
    let value = value?.as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Non-arrays become empty; blank and non-string entries are dropped.
pub fn string_sequence(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn morpheme(value: Option<&Value>) -> Vec<String> {
    let morpheme = match value {
        Some(Value::Array(_)) => Morpheme::Compound(string_sequence(value)),
        Some(Value::String(single)) => Morpheme::Single(single.clone()),
        _ => return Vec::new(),
    };
    morpheme.segments()
}

/// Splits "Називний — яблуко" into label and form at the first dash-like
/// separator. Anything unsplittable becomes a label with an empty value.
pub fn split_case(entry: &str) -> CaseRow {
    let first = CASE_SEPARATORS
        .iter()
        .filter_map(|separator| entry.find(separator).map(|at| (at, *separator)))
        .min_by_key(|(at, separator)| (*at, std::cmp::Reverse(separator.len())));
    if let Some((at, separator)) = first {
        let label = entry[..at].trim();
        let value = entry[at + separator.len()..].trim();
        if !label.is_empty() && !value.is_empty() {
            return CaseRow {
                label: label.to_string(),
                value: value.to_string(),
            };
        }
    }
    CaseRow {
        label: entry.trim().to_string(),
        value: String::new(),
    }
}

pub fn is_verb(part_of_speech: &str) -> bool {
    part_of_speech.to_lowercase().contains(VERB_MARKER)
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Whole numbers only, so `1`, `1.0` and `"1.0"` all select option 1.
fn answer_index(value: Option<&Value>) -> Option<usize> {
    let index = match value? {
        Value::Number(number) => number.as_f64()?,
        Value::String(raw) => raw.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (index.is_finite() && index >= 0.0 && index.fract() == 0.0).then(|| index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_or_non_object_analysis_is_empty() {
        assert_eq!(NormalizedView::from_analysis(None), NormalizedView::default());
        assert_eq!(
            NormalizedView::from_analysis(Some(&json!("text"))),
            NormalizedView::default()
        );
    }

    #[test]
    fn string_sequences_drop_blank_and_foreign_entries() {
        let value = json!(["плід", "", "  ", 3, null, {"a": 1}, " овоч "]);
        assert_eq!(string_sequence(Some(&value)), vec!["плід", "овоч"]);
        assert!(string_sequence(Some(&json!("плід"))).is_empty());
    }

    #[test]
    fn empty_prefix_row_is_omitted_and_root_array_kept() {
        let view = NormalizedView::from_analysis(Some(&json!({
            "structure": { "prefix": "", "root": ["ходи"], "suffix": 7, "ending": "ти" }
        })));
        let kinds: Vec<_> = view.structure.iter().map(|row| row.kind).collect();
        assert_eq!(kinds, vec![MorphemeKind::Root, MorphemeKind::Ending]);
        assert_eq!(view.structure[0].values, vec!["ходи"]);
    }

    #[test]
    fn compound_morphemes_keep_every_segment() {
        assert_eq!(
            morpheme(Some(&json!(["по", "", "за"]))),
            vec!["по", "за"]
        );
        assert!(morpheme(Some(&json!(null))).is_empty());
    }

    #[test]
    fn case_entries_split_on_first_dash() {
        assert_eq!(
            split_case("Знахідний — яблуко"),
            CaseRow { label: "Знахідний".into(), value: "яблуко".into() }
        );
        assert_eq!(
            split_case("Кличний—яблуко"),
            CaseRow { label: "Кличний".into(), value: "яблуко".into() }
        );
        assert_eq!(
            split_case("Родовий - чорно-білого"),
            CaseRow { label: "Родовий".into(), value: "чорно-білого".into() }
        );
    }

    #[test]
    fn malformed_case_entry_becomes_a_label() {
        assert_eq!(
            split_case("malformed-no-separator"),
            CaseRow { label: "malformed-no-separator".into(), value: String::new() }
        );
        assert_eq!(
            split_case("Орудний — "),
            CaseRow { label: "Орудний —".into(), value: String::new() }
        );
    }

    #[test]
    fn verb_detection_is_case_insensitive() {
        assert!(is_verb("Дієслово"));
        assert!(is_verb("дієслівна форма"));
        assert!(!is_verb("іменник"));
    }

    #[test]
    fn meanings_keep_only_objects() {
        let view = NormalizedView::from_analysis(Some(&json!({
            "meanings": [
                "stray",
                null,
                { "definition": "d1", "examples": ["e1", "e2", 5], "notes": "" },
                { "definition": 4, "examples": "e3" }
            ]
        })));
        assert_eq!(view.meanings.len(), 2);
        assert_eq!(view.meanings[0].definition.as_deref(), Some("d1"));
        assert_eq!(view.meanings[0].examples, vec!["e1", "e2"]);
        assert_eq!(view.meanings[0].notes, None);
        assert_eq!(view.meanings[1], MeaningItem::default());
        assert_eq!(view.primary_meaning(), Some("d1"));
    }

    #[test]
    fn quiz_answers_must_be_integers() {
        let view = NormalizedView::from_analysis(Some(&json!({
            "quiz": [
                { "question": "q1", "options": ["a", "b"], "answer": 1 },
                { "question": "q2", "options": ["a"], "answer": "0" },
                { "question": "q3", "options": ["a"], "answer": "first" },
                { "question": "q4", "options": ["a"], "answer": 1.5 },
                { "question": "q5", "options": ["a"], "answer": -1 },
                { "question": "q6", "options": ["a", "b"], "answer": 1.0 },
                { "question": "q7", "options": ["a", "b"], "answer": " 1.0 " },
                { "question": "q8", "options": ["a"], "answer": "NaN" },
                42
            ]
        })));
        let answers: Vec<_> = view.quiz.iter().map(|item| item.answer).collect();
        assert_eq!(
            answers,
            vec![Some(1), Some(0), None, None, None, Some(1), Some(1), None]
        );
    }

    #[test]
    fn type_drift_never_panics() {
        let view = NormalizedView::from_analysis(Some(&json!({
            "synonyms": "плід",
            "grammar": ["іменник"],
            "structure": null,
            "origin": { "text": "?" },
            "meanings": { "definition": "d" },
            "quiz": "none"
        })));
        assert_eq!(view, NormalizedView::default());
        assert!(!view.has_morphology());
    }
}
