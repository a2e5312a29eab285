use pulldown_cmark::{Event, Options, Parser, Tag};
use serde::Serialize;

const STRONG_MARKER: &str = "**";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Span {
    Plain(String),
    Strong(String),
}

/// Splits prose on `**` strong emphasis as CommonMark reads it. Everything
/// outside a strong run, list numbers included, is kept verbatim, so an
/// unmatched marker or an empty pair (`****`) stays literal.
pub fn parse_emphasis(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    let mut depth = 0usize;
    for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::Strong) => {
                depth += 1;
                if depth > 1 || !text[range.clone()].starts_with(STRONG_MARKER) {
                    continue;
                }
                let inner =
                    &text[range.start + STRONG_MARKER.len()..range.end - STRONG_MARKER.len()];
                if range.start > cursor {
                    spans.push(Span::Plain(text[cursor..range.start].to_string()));
                }
                spans.push(Span::Strong(inner.to_string()));
                cursor = range.end;
            }
            Event::End(Tag::Strong) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if cursor < text.len() {
        spans.push(Span::Plain(text[cursor..].to_string()));
    }
    spans
}
