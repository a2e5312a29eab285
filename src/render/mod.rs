//! Turns a word panel into independently optional display sections.

use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::analyzer::AnalysisOutcome;
use crate::normalize::{CaseRow, MeaningItem, NormalizedView, QuizItem};

mod emphasis;

pub use emphasis::{parse_emphasis, Span};

const WORD_TEMPLATE: &str = include_str!("templates/word.html.tera");

pub const SUMMARY_FALLBACK: &str = "Це слово потребує додаткового пояснення.";
pub const INFINITIVE_PLACEHOLDER: &str = "інфінітив";
pub const NOT_APPLICABLE_PLACEHOLDER: &str = "не застосовується";
pub const EMPTY_CASE_VALUE: &str = "—";
pub const WORD_LOADING_TEXT: &str = "Готуємо пояснення слова…";
pub const RAW_ANSWER_HINT: &str =
    "(відповідь ШІ прихована: /raw в інтерактивному режимі або --json для разового запиту)";

/// Everything the word page knows at one moment.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPanel<'a> {
    pub word: &'a str,
    pub sentence: Option<&'a str>,
    pub outcome: Option<&'a AnalysisOutcome>,
    pub loading: bool,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Context {
        sentence: Option<String>,
        raw_answer: Option<String>,
    },
    Loading {
        message: String,
    },
    Error {
        message: String,
        retry: bool,
    },
    Summary {
        text: String,
        pills: Vec<String>,
    },
    Synonyms {
        modern: Vec<String>,
        archaic: Vec<String>,
    },
    Morphology {
        rows: Vec<GrammarRow>,
        cases: Vec<CaseCell>,
    },
    Structure {
        rows: Vec<StructureRow>,
    },
    Origin {
        text: String,
    },
    Meanings {
        items: Vec<MeaningItem>,
    },
    Quiz {
        items: Vec<QuizItem>,
    },
    RawAnswer {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarRow {
    pub label: &'static str,
    pub value: String,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseCell {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureRow {
    pub label: &'static str,
    pub values: Vec<String>,
}

impl StructureRow {
    pub fn joined(&self) -> String {
        self.values.join(", ")
    }
}

/// Builds the sections for a word panel. Sections without data are left
/// out entirely; a panel with no word renders nothing.
pub fn word_sections(panel: &WordPanel<'_>) -> Vec<Section> {
    let word = panel.word.trim();
    if word.is_empty() {
        return Vec::new();
    }

    let recovered = panel.outcome.and_then(AnalysisOutcome::recovered);
    let raw = panel.outcome.and_then(AnalysisOutcome::raw_content);
    let sentence = panel
        .sentence
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty());

    let disclosure = raw.filter(|_| recovered.is_some());

    let mut sections = Vec::new();
    if sentence.is_some() || disclosure.is_some() {
        sections.push(Section::Context {
            sentence: sentence.map(str::to_string),
            raw_answer: disclosure.map(str::to_string),
        });
    }

    if panel.loading {
        sections.push(Section::Loading {
            message: WORD_LOADING_TEXT.to_string(),
        });
        return sections;
    }
    if let Some(message) = panel.error.filter(|message| !message.is_empty()) {
        sections.push(Section::Error {
            message: message.to_string(),
            retry: true,
        });
        return sections;
    }

    match recovered {
        Some(analysis) => {
            let view = NormalizedView::from_analysis(Some(&analysis));
            sections.extend(analysis_sections(&view));
        }
        None => {
            if let Some(raw) = raw {
                sections.push(Section::RawAnswer {
                    text: raw.to_string(),
                });
            }
        }
    }
    sections
}

/// Sections backed by a recovered analysis; the summary is always present.
pub fn analysis_sections(view: &NormalizedView) -> Vec<Section> {
    let mut sections = Vec::new();

    let pills = view
        .part_of_speech
        .iter()
        .chain(view.number.iter())
        .cloned()
        .collect();
    sections.push(Section::Summary {
        text: view
            .primary_meaning()
            .unwrap_or(SUMMARY_FALLBACK)
            .to_string(),
        pills,
    });

    if view.has_synonyms() {
        sections.push(Section::Synonyms {
            modern: view.modern_synonyms.clone(),
            archaic: view.archaic_synonyms.clone(),
        });
    }

    if view.has_morphology() {
        sections.push(Section::Morphology {
            rows: grammar_rows(view),
            cases: view.cases.iter().map(case_cell).collect(),
        });
    }

    if !view.structure.is_empty() {
        sections.push(Section::Structure {
            rows: view
                .structure
                .iter()
                .map(|row| StructureRow {
                    label: row.kind.label(),
                    values: row.values.clone(),
                })
                .collect(),
        });
    }

    if let Some(origin) = &view.origin {
        sections.push(Section::Origin {
            text: origin.clone(),
        });
    }

    if !view.meanings.is_empty() {
        sections.push(Section::Meanings {
            items: view.meanings.clone(),
        });
    }

    if !view.quiz.is_empty() {
        sections.push(Section::Quiz {
            items: view.quiz.clone(),
        });
    }

    sections
}

fn grammar_rows(view: &NormalizedView) -> Vec<GrammarRow> {
    let mut rows = Vec::new();
    if let Some(part_of_speech) = &view.part_of_speech {
        rows.push(GrammarRow {
            label: "Частина мови",
            value: part_of_speech.clone(),
            placeholder: false,
        });
    }
    rows.push(inflection_row("Рід", view.gender.as_deref(), view.is_verb));
    rows.push(inflection_row("Число", view.number.as_deref(), view.is_verb));
    rows
}

/// Gender and number never render blank: verbs get the infinitive note,
/// everything else the "not applicable" note.
fn inflection_row(label: &'static str, value: Option<&str>, is_verb: bool) -> GrammarRow {
    match value {
        Some(value) => GrammarRow {
            label,
            value: value.to_string(),
            placeholder: false,
        },
        None => GrammarRow {
            label,
            value: if is_verb {
                INFINITIVE_PLACEHOLDER
            } else {
                NOT_APPLICABLE_PLACEHOLDER
            }
            .to_string(),
            placeholder: true,
        },
    }
}

fn case_cell(row: &CaseRow) -> CaseCell {
    CaseCell {
        label: row.label.clone(),
        value: if row.value.is_empty() {
            EMPTY_CASE_VALUE.to_string()
        } else {
            row.value.clone()
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Plain,
    Ansi,
}

impl TextStyle {
    fn strong(&self, text: &str) -> String {
        match self {
            TextStyle::Plain => text.to_string(),
            TextStyle::Ansi => format!("\x1b[1m{}\x1b[0m", text),
        }
    }

    fn muted(&self, text: &str) -> String {
        match self {
            TextStyle::Plain => text.to_string(),
            TextStyle::Ansi => format!("\x1b[2;3m{}\x1b[0m", text),
        }
    }
}

pub fn render_spans(spans: &[Span], style: TextStyle) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Plain(text) => text.clone(),
            Span::Strong(text) => style.strong(text),
        })
        .collect()
}

pub fn render_text(word: &str, sections: &[Section], style: TextStyle) -> String {
    let mut blocks = vec![style.strong(word.trim())];
    for section in sections {
        let block = render_section_text(section, style);
        if !block.is_empty() {
            blocks.push(block);
        }
    }
    blocks.join("\n\n")
}

fn render_section_text(section: &Section, style: TextStyle) -> String {
    let mut lines = Vec::new();
    let title = |lines: &mut Vec<String>, text: &str| lines.push(style.strong(text));
    match section {
        Section::Context {
            sentence,
            raw_answer,
        } => {
            if let Some(sentence) = sentence {
                lines.push(format!("{} {}", style.strong("Контекст:"), sentence));
            }
            if raw_answer.is_some() {
                lines.push(style.muted(RAW_ANSWER_HINT));
            }
        }
        Section::Loading { message } => lines.push(message.clone()),
        Section::Error { message, retry } => {
            lines.push(message.clone());
            if *retry {
                lines.push(style.muted("Спробувати знову: /retry"));
            }
        }
        Section::Summary { text, pills } => {
            title(&mut lines, "Коротко");
            lines.push(text.clone());
            if !pills.is_empty() {
                lines.push(
                    pills
                        .iter()
                        .map(|pill| format!("[{}]", pill))
                        .collect::<Vec<_>>()
                        .join(" "),
                );
            }
        }
        Section::Synonyms { modern, archaic } => {
            title(&mut lines, "Синоніми");
            if !modern.is_empty() {
                lines.push(format!("Сучасні: {}", modern.join(", ")));
            }
            if !archaic.is_empty() {
                lines.push(format!("Застарілі: {}", archaic.join(", ")));
            }
        }
        Section::Morphology { rows, cases } => {
            title(&mut lines, "Морфологія");
            for row in rows {
                let value = if row.placeholder {
                    style.muted(&row.value)
                } else {
                    row.value.clone()
                };
                lines.push(format!("{}: {}", row.label, value));
            }
            if !cases.is_empty() {
                let width = cases
                    .iter()
                    .map(|cell| cell.label.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max("Відмінок".chars().count());
                lines.push(format!("{:<width$}  {}", "Відмінок", "Форма", width = width));
                for cell in cases {
                    lines.push(format!(
                        "{:<width$}  {}",
                        cell.label,
                        cell.value,
                        width = width
                    ));
                }
            }
        }
        Section::Structure { rows } => {
            title(&mut lines, "Будова слова");
            for row in rows {
                lines.push(format!("{}: {}", row.label, row.joined()));
            }
        }
        Section::Origin { text } => {
            title(&mut lines, "Походження");
            lines.push(text.clone());
        }
        Section::Meanings { items } => {
            title(&mut lines, "Значення та приклади");
            for (index, item) in items.iter().enumerate() {
                lines.push(format!(
                    "{}. {}",
                    index + 1,
                    item.definition.as_deref().unwrap_or_default()
                ));
                for example in &item.examples {
                    lines.push(format!("   • {}", example));
                }
                if let Some(notes) = &item.notes {
                    lines.push(format!("   {}", style.muted(notes)));
                }
            }
        }
        Section::Quiz { items } => {
            title(&mut lines, "Міні‑тест");
            for (index, item) in items.iter().enumerate() {
                lines.push(format!(
                    "{}. {}",
                    index + 1,
                    item.question.as_deref().unwrap_or_default()
                ));
                for (option_index, option) in item.options.iter().enumerate() {
                    let bullet = if item.answer == Some(option_index) {
                        "✅"
                    } else {
                        "•"
                    };
                    lines.push(format!("   {} {}", bullet, option));
                }
            }
        }
        Section::RawAnswer { text } => {
            title(&mut lines, "Відповідь ШІ");
            lines.push(text.clone());
        }
    }
    lines.join("\n")
}

/// Renders the word panel as a standalone HTML page.
pub fn render_html(panel: &WordPanel<'_>) -> Result<String> {
    let sections = word_sections(panel);
    let mut context = TeraContext::new();
    context.insert("word", panel.word.trim());
    context.insert("sections", &sections);
    Tera::one_off(WORD_TEMPLATE, &context, true).with_context(|| "failed to render word page")
}
