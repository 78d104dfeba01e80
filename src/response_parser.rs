//! Splits assistant replies into prose and recipe segments.
//!
//! The assistant embeds recipes inline with two marker forms:
//!
//! ```text
//! [RECIPE_CARD: Easy 15-Minute Tacos]
//! [RECIPE_DATA: {"title": "Pea & Mint Soup", "ingredients": ["2 cups peas"], ...}]
//! ```
//!
//! A `RECIPE_CARD` body runs to the first `]`. A `RECIPE_DATA` body is a JSON
//! object that routinely contains `]` itself (every array does), so its end is
//! found by counting braces outside of JSON strings; only a body that is not a
//! balanced object falls back to the first `]`. The object may be wrapped in
//! a markdown code fence, which is skipped on both sides.
//!
//! Parsing never fails as a whole. Unknown card titles and malformed payloads
//! are dropped from the output and scanning carries on after them.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;

use crate::catalog::{find_recipe_by_title, Recipe};

static MARKER_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:RECIPE_CARD|RECIPE_DATA):\s*").expect("marker head pattern is valid"));

const RECIPE_CARD_HEAD: &str = "[RECIPE_CARD";

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerSegment<'a> {
    PlainText(String),
    /// Borrowed for catalog recipes, owned for ones generated by the assistant.
    RecipeReference(Cow<'a, Recipe>),
}

impl MarkerSegment<'_> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MarkerSegment::PlainText(text) => Some(text),
            MarkerSegment::RecipeReference(_) => None,
        }
    }

    pub fn as_recipe(&self) -> Option<&Recipe> {
        match self {
            MarkerSegment::PlainText(_) => None,
            MarkerSegment::RecipeReference(recipe) => Some(recipe),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    RecipeCard,
    RecipeData,
}

#[derive(Debug, Error)]
pub enum MarkerParseError {
    #[error("RECIPE_DATA payload is not valid recipe JSON: {0}")]
    InvalidRecipeData(#[from] serde_json::Error),
    #[error("RECIPE_DATA payload has an empty title")]
    MissingTitle,
}

/// A located marker: byte span in the source plus its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerSpan<'t> {
    kind: MarkerKind,
    start: usize,
    end: usize,
    body: &'t str,
}

/// Splits `text` into ordered segments, resolving `RECIPE_CARD` titles
/// against `recipes`.
///
/// Text without any marker comes back as a single [`MarkerSegment::PlainText`]
/// equal to the input, including the empty string.
pub fn parse_message<'a>(text: &str, recipes: &'a [Recipe]) -> Vec<MarkerSegment<'a>> {
    let mut segments = Vec::new();
    let mut last_index = 0;
    let mut found_marker = false;

    for marker in MarkerScanner::new(text) {
        found_marker = true;
        if marker.start > last_index {
            segments.push(MarkerSegment::PlainText(text[last_index..marker.start].to_string()));
        }
        if let Some(recipe) = resolve_marker(&marker, recipes) {
            segments.push(MarkerSegment::RecipeReference(recipe));
        }
        last_index = marker.end;
    }

    if !found_marker {
        return vec![MarkerSegment::PlainText(text.to_string())];
    }
    if last_index < text.len() {
        segments.push(MarkerSegment::PlainText(text[last_index..].to_string()));
    }
    segments
}

fn resolve_marker<'a>(marker: &MarkerSpan<'_>, recipes: &'a [Recipe]) -> Option<Cow<'a, Recipe>> {
    match marker.kind {
        MarkerKind::RecipeCard => {
            let title = marker.body.trim();
            let recipe = find_recipe_by_title(recipes, title);
            if recipe.is_none() {
                tracing::debug!(title, "Dropping recipe card with unknown title");
            }
            recipe.map(Cow::Borrowed)
        }
        MarkerKind::RecipeData => match parse_recipe_data(marker.body) {
            Ok(recipe) => Some(Cow::Owned(recipe)),
            Err(e) => {
                tracing::warn!(error = %e, offset = marker.start, "Dropping malformed RECIPE_DATA marker");
                tracing::debug!(body = marker.body, "Malformed RECIPE_DATA body");
                None
            }
        },
    }
}

/// Deserializes a `RECIPE_DATA` body, tolerating a markdown code fence around it.
pub fn parse_recipe_data(body: &str) -> Result<Recipe, MarkerParseError> {
    let mut content = body.trim();
    if content.starts_with("```json") && content.ends_with("```") {
        content = content.trim_start_matches("```json").trim_end_matches("```").trim();
    } else if content.starts_with("```") && content.ends_with("```") {
        content = content.trim_start_matches("```").trim_end_matches("```").trim();
    }

    let recipe: Recipe = serde_json::from_str(content)?;
    if recipe.title.trim().is_empty() {
        return Err(MarkerParseError::MissingTitle);
    }
    Ok(recipe)
}

/// Returns the byte length of the JSON object at the start of `s`, through its
/// closing brace, or `None` if `s` does not open with a balanced object.
fn balanced_object_len(s: &str) -> Option<usize> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte length of a leading ```` ``` ```` or ```` ```json ```` fence and the
/// whitespace after it; 0 when `s` is not fenced.
fn fence_opener_len(s: &str) -> usize {
    let Some(after) = s.strip_prefix("```") else {
        return 0;
    };
    let after = after.strip_prefix("json").unwrap_or(after);
    s.len() - after.trim_start().len()
}

/// Iterates over complete markers in left-to-right order.
struct MarkerScanner<'t> {
    text: &'t str,
    search_from: usize,
}

impl<'t> MarkerScanner<'t> {
    fn new(text: &'t str) -> Self {
        Self { text, search_from: 0 }
    }

    /// Finds where the marker whose body starts at `body_start` closes.
    /// Returns (body end, index just past the closing `]`).
    fn close(&self, kind: MarkerKind, body_start: usize) -> Option<(usize, usize)> {
        let rest = &self.text[body_start..];

        if kind == MarkerKind::RecipeData {
            let opener = fence_opener_len(rest);
            if let Some(len) = balanced_object_len(&rest[opener..]) {
                let object_end = opener + len;
                let mut tail = rest[object_end..].trim_start();
                if opener > 0 {
                    tail = tail.strip_prefix("```").unwrap_or(tail).trim_start();
                }
                if tail.starts_with(']') {
                    let bracket = body_start + rest.len() - tail.len();
                    let body_end = if opener > 0 { bracket } else { body_start + object_end };
                    return Some((body_end, bracket + 1));
                }
            }
        }

        rest.find(']').map(|pos| (body_start + pos, body_start + pos + 1))
    }
}

impl<'t> Iterator for MarkerScanner<'t> {
    type Item = MarkerSpan<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.search_from < self.text.len() {
            let head = MARKER_HEAD.find_at(self.text, self.search_from)?;
            let kind = if self.text[head.start()..].starts_with(RECIPE_CARD_HEAD) {
                MarkerKind::RecipeCard
            } else {
                MarkerKind::RecipeData
            };

            match self.close(kind, head.end()) {
                Some((body_end, end)) => {
                    self.search_from = end;
                    return Some(MarkerSpan {
                        kind,
                        start: head.start(),
                        end,
                        body: &self.text[head.end()..body_end],
                    });
                }
                // Unterminated: leave it as text and keep looking after its '['
                None => self.search_from = head.start() + 1,
            }
        }
        None
    }
}
