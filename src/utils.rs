//! Utility functions for handling free-text model replies.
//!
//! Models asked for "JSON only" still wrap answers in Markdown fences or
//! surround them with prose. [`JsonIslandExtractor`] finds the first usable
//! JSON array or object in such a reply on a best-effort basis: it either
//! returns a parsed value or `None`, never an error.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Opening brackets tried by the fallback scan before giving up
const MAX_SCAN_ATTEMPTS: usize = 64;

/// Shape of the JSON value an extractor expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// `[...]`
    Array,
    /// `{...}`
    Object,
}

impl JsonShape {
    const fn open(self) -> char {
        match self {
            Self::Array => '[',
            Self::Object => '{',
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Best-effort locator for JSON embedded in model output
#[derive(Debug, Clone)]
pub struct JsonIslandExtractor {
    fence_regex: Regex,
    array_regex: Regex,
    object_regex: Regex,
    max_chars: usize,
}

impl JsonIslandExtractor {
    /// Create an extractor that looks at most at `max_chars` characters of a reply
    pub fn new(max_chars: usize) -> Result<Self> {
        let fence_regex = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```")
            .map_err(|e| PipelineError::Other(format!("Failed to compile fence regex: {e}")))?;
        let array_regex = Regex::new(r"(?s)\[.*\]")
            .map_err(|e| PipelineError::Other(format!("Failed to compile array regex: {e}")))?;
        let object_regex = Regex::new(r"(?s)\{.*\}")
            .map_err(|e| PipelineError::Other(format!("Failed to compile object regex: {e}")))?;

        Ok(Self {
            fence_regex,
            array_regex,
            object_regex,
            max_chars,
        })
    }

    /// Remove a surrounding Markdown code fence, if any
    #[must_use]
    pub fn strip_code_fences<'a>(&self, text: &'a str) -> &'a str {
        if let Some(inner) = self.fence_regex.captures(text).and_then(|c| c.get(1)) {
            return inner.as_str().trim();
        }

        // Unterminated fence: drop the opening line
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix("```") {
            return rest.split_once('\n').map_or("", |(_, body)| body).trim();
        }

        trimmed
    }

    /// Find the first well-formed JSON value of `shape` in `reply`.
    ///
    /// The first fenced block is tried first, then any later fenced blocks,
    /// then the whole reply.
    #[must_use]
    pub fn extract(&self, reply: &str, shape: JsonShape) -> Option<Value> {
        let bounded = truncate_chars(reply, self.max_chars);

        let later_fences = self
            .fence_regex
            .captures_iter(bounded)
            .skip(1)
            .filter_map(|c| c.get(1).map(|m| m.as_str().trim()));

        std::iter::once(self.strip_code_fences(bounded))
            .chain(later_fences)
            .chain(std::iter::once(bounded))
            .find_map(|body| self.find_in(body, shape))
    }

    fn find_in(&self, body: &str, shape: JsonShape) -> Option<Value> {
        // Greedy outermost match handles the common "prose + one value" case
        let greedy = match shape {
            JsonShape::Array => &self.array_regex,
            JsonShape::Object => &self.object_regex,
        };
        if let Some(found) = greedy.find(body) {
            if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
                if shape.matches(&value) {
                    return Some(value);
                }
            }
        }

        // Otherwise take the first value that parses from an opening bracket
        for (attempt, (index, _)) in body.match_indices(shape.open()).enumerate() {
            if attempt >= MAX_SCAN_ATTEMPTS {
                debug!(attempts = attempt, "JSON scan budget exhausted");
                break;
            }
            let mut stream = serde_json::Deserializer::from_str(&body[index..]).into_iter::<Value>();
            if let Some(Ok(value)) = stream.next() {
                if shape.matches(&value) {
                    return Some(value);
                }
            }
        }

        None
    }
}

/// Keep at most `max_chars` characters, cutting on a char boundary
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Shorten a reply for log output
#[must_use]
pub fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 500;
    let cut = truncate_chars(text, PREVIEW_CHARS);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}
