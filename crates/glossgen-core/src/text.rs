use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Separator marking a coarser topic in a label, e.g. `"Accuracy - overall"`.
pub const DEFAULT_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNormalizer {
    stripped: BTreeSet<char>,
}

impl TextNormalizer {
    #[must_use]
    pub fn new(stripped: impl IntoIterator<Item = char>) -> Self {
        Self {
            stripped: stripped.into_iter().collect(),
        }
    }

    /// Strips every ASCII punctuation character, `_` and `-` included.
    #[must_use]
    pub fn ascii_punctuation() -> Self {
        Self::new((0u8..=127).map(char::from).filter(char::is_ascii_punctuation))
    }

    #[must_use]
    pub fn strips(&self, c: char) -> bool {
        self.stripped.contains(&c)
    }

    /// Lower-cases, drops stripped punctuation, collapses whitespace runs to a
    /// single space and trims.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pending_space = false;

        for c in text.chars() {
            if self.strips(c) {
                continue;
            }
            if c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.extend(c.to_lowercase());
        }

        out
    }

    #[must_use]
    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    /// Normalized substring test. An empty needle never matches.
    #[must_use]
    pub fn contains(&self, haystack: &str, needle: &str) -> bool {
        let needle = self.normalize(needle);
        !needle.is_empty() && self.normalize(haystack).contains(&needle)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::ascii_punctuation()
    }
}

/// Formats a Turtle literal with a language tag.
///
/// The value is trimmed; backslashes and quotes are escaped. Multi-line values
/// use the long string form so paragraphs survive intact.
#[must_use]
pub fn format_literal(text: &str, language_tag: &str) -> String {
    let value = text.trim();
    let multiline = value.contains('\n');

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\r' if !multiline => escaped.push_str("\\r"),
            '\t' if !multiline => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }

    let quoted = if multiline {
        format!("\"\"\"{escaped}\"\"\"")
    } else {
        format!("\"{escaped}\"")
    };

    if language_tag.is_empty() {
        quoted
    } else {
        format!("{quoted}@{language_tag}")
    }
}

/// Splits on the first occurrence of `separator`.
///
/// Returns `None` when the separator is absent or the head is blank.
#[must_use]
pub fn split_by_separator<'a>(label: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    let pos = label.find(separator)?;
    let head = label[..pos].trim();
    if head.is_empty() {
        return None;
    }
    Some((head, label[pos + separator.len()..].trim()))
}

/// `timeCoverage` -> `TIME_COVERAGE`, `HTTPServer` -> `HTTP_SERVER`.
#[must_use]
pub fn camel_to_upper_snake(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let mut out = String::with_capacity(id.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && prev != '_' {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    /// Char offset of the first differing character.
    pub position: usize,
    pub left: String,
    pub right: String,
}

/// First point where two strings diverge, or `None` when they are equal.
///
/// When one string is a prefix of the other, the longer one's remainder is
/// reported and the other side is empty.
#[must_use]
pub fn first_difference(a: &str, b: &str) -> Option<Difference> {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    for (i, (x, y)) in a_chars.iter().zip(&b_chars).enumerate() {
        if x != y {
            return Some(Difference {
                position: i,
                left: x.to_string(),
                right: y.to_string(),
            });
        }
    }

    if a_chars.len() == b_chars.len() {
        return None;
    }

    let position = a_chars.len().min(b_chars.len());
    Some(Difference {
        position,
        left: a_chars[position..].iter().collect(),
        right: b_chars[position..].iter().collect(),
    })
}
