//! Token tag decoding: per-token IOB/BILUO tags into entity spans.

use propnlu_core::Span;
use tracing::warn;

/// One entry of the model's entity tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Outside,
    Begin(String),
    Inside(String),
    Last(String),
    /// Single-token entity. Bare labels without a prefix parse as this.
    Unit(String),
}

impl Tag {
    pub fn parse(raw: &str) -> Self {
        if raw == "O" || raw.is_empty() {
            return Self::Outside;
        }
        match raw.split_once('-') {
            Some(("B", label)) => Self::Begin(label.to_string()),
            Some(("I", label)) => Self::Inside(label.to_string()),
            Some(("L" | "E", label)) => Self::Last(label.to_string()),
            Some(("U" | "S", label)) => Self::Unit(label.to_string()),
            _ => Self::Unit(raw.to_string()),
        }
    }

    /// The entity label a raw tag string refers to, or `None` for `O`.
    pub fn label_of(raw: &str) -> Option<&str> {
        if raw == "O" || raw.is_empty() {
            return None;
        }
        match raw.split_once('-') {
            Some(("B" | "I" | "L" | "E" | "U" | "S", label)) => Some(label),
            _ => Some(raw),
        }
    }
}

struct Open<'a> {
    label: &'a str,
    start: usize,
    end: usize,
}

/// Decode one tag per token into spans over `text`.
///
/// `offsets` are the tokens' byte ranges in `text`; zero-width ranges mark
/// special tokens and are skipped. A continuation tag (`I-`, `L-`) that does
/// not match the open span starts a new one. A `B-`/`U-` token that touches
/// the open span with the same label is treated as a sub-word and merged.
pub fn decode_tags(text: &str, tags: &[&Tag], offsets: &[(usize, usize)]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<Open<'_>> = None;

    for (&tag, &(start, end)) in tags.iter().zip(offsets) {
        if start >= end {
            continue;
        }

        match tag {
            Tag::Outside => close(text, open.take(), &mut spans),
            Tag::Begin(label) => {
                if !extend_subword(&mut open, label, start, end) {
                    close(text, open.take(), &mut spans);
                    open = Some(Open { label, start, end });
                }
            }
            Tag::Inside(label) => {
                if !extend_same(&mut open, label, end) {
                    close(text, open.take(), &mut spans);
                    open = Some(Open { label, start, end });
                }
            }
            Tag::Last(label) => {
                if !extend_same(&mut open, label, end) {
                    close(text, open.take(), &mut spans);
                    open = Some(Open { label, start, end });
                }
                close(text, open.take(), &mut spans);
            }
            Tag::Unit(label) => {
                if !extend_subword(&mut open, label, start, end) {
                    close(text, open.take(), &mut spans);
                    open = Some(Open { label, start, end });
                }
                close(text, open.take(), &mut spans);
            }
        }
    }
    close(text, open.take(), &mut spans);

    // A closed single-token span followed by a touching sub-word of the same
    // label (U + U, L + U) is one entity split by the tokenizer.
    merge_touching(text, spans)
}

fn extend_same(open: &mut Option<Open<'_>>, label: &str, end: usize) -> bool {
    match open {
        Some(o) if o.label == label => {
            o.end = end;
            true
        }
        _ => false,
    }
}

fn extend_subword(open: &mut Option<Open<'_>>, label: &str, start: usize, end: usize) -> bool {
    match open {
        Some(o) if o.label == label && o.end == start => {
            o.end = end;
            true
        }
        _ => false,
    }
}

fn close(text: &str, open: Option<Open<'_>>, spans: &mut Vec<Span>) {
    let Some(open) = open else {
        return;
    };
    if let Some(span) = make_span(text, open.label, open.start, open.end) {
        spans.push(span);
    }
}

/// Build a span, trimming whitespace the tokenizer left inside the offsets.
fn make_span(text: &str, label: &str, start: usize, end: usize) -> Option<Span> {
    let Some(raw) = text.get(start..end) else {
        warn!(start, end, len = text.len(), "token offsets outside text, dropping span");
        return None;
    };
    let lead = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = start + lead;
    Some(Span {
        text: trimmed.to_string(),
        label: label.to_string(),
        start,
        end: start + trimmed.len(),
    })
}

fn merge_touching(text: &str, spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(prev) = merged.last_mut()
            && prev.label == span.label
            && prev.end == span.start
            && let Some(joined) = make_span(text, &span.label, prev.start, span.end)
        {
            *prev = joined;
            continue;
        }
        merged.push(span);
    }
    merged
}
