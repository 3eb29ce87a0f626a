//! Highlight rendering for matched ranges
//!
//! The search service reports which byte ranges of a field matched. Text
//! outside and inside those ranges is HTML-escaped exactly once, and each
//! range is wrapped in the configured marker, so the markup never splits an
//! entity or a tag.

use crate::hit::{DisplayField, Hit, RawHit};
use std::borrow::Cow;
use std::ops::Range;

pub const DEFAULT_OPEN: &str = "<mark class=\"search-highlight\">";
pub const DEFAULT_CLOSE: &str = "</mark>";

/// Open/close pair wrapped around each matched range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub open: String,
    pub close: String,
}

impl Marker {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN, DEFAULT_CLOSE)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    marker: Marker,
    /// When false, text is copied into the markup verbatim
    raw_text: bool,
}

impl Highlighter {
    pub fn new(marker: Marker) -> Self {
        Self {
            marker,
            raw_text: false,
        }
    }

    /// Skip HTML escaping, for surfaces that do not interpret markup.
    pub fn without_escaping(mut self) -> Self {
        self.raw_text = true;
        self
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    pub fn highlight_field(&self, text: &str, spans: &[Range<usize>]) -> DisplayField {
        let spans = normalize_spans(text, spans);
        let mut markup = String::with_capacity(text.len() + spans.len() * 16);
        let mut cursor = 0;
        for span in &spans {
            markup.push_str(&self.escape(&text[cursor..span.start]));
            markup.push_str(&self.marker.open);
            markup.push_str(&self.escape(&text[span.clone()]));
            markup.push_str(&self.marker.close);
            cursor = span.end;
        }
        markup.push_str(&self.escape(&text[cursor..]));

        DisplayField {
            plain: text.to_string(),
            markup,
            spans,
        }
    }

    /// Shape a raw hit. With `apply` false (empty query) every field is
    /// rendered without markers.
    pub fn highlight_hit(&self, raw: &RawHit, apply: bool) -> Hit {
        let display_fields = raw
            .fields
            .iter()
            .map(|(name, value)| {
                let spans = match raw.matches.get(name) {
                    Some(spans) if apply => spans.as_slice(),
                    _ => &[],
                };
                (name.clone(), self.highlight_field(value, spans))
            })
            .collect();

        Hit {
            id: raw.id.clone(),
            display_fields,
        }
    }

    fn escape<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.raw_text {
            Cow::Borrowed(text)
        } else {
            escape_html(text)
        }
    }
}

/// Clamp ranges to `text`, widen them to char boundaries, sort them and merge
/// overlapping or touching ranges. Empty ranges are dropped.
pub fn normalize_spans(text: &str, spans: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut clamped: Vec<Range<usize>> = spans
        .iter()
        .filter_map(|span| {
            let mut start = span.start.min(text.len());
            let mut end = span.end.min(text.len());
            while !text.is_char_boundary(start) {
                start -= 1;
            }
            while !text.is_char_boundary(end) {
                end += 1;
            }
            (start < end).then_some(start..end)
        })
        .collect();
    clamped.sort_by_key(|span| (span.start, span.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(clamped.len());
    for span in clamped {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
