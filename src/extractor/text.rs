//! Title and field text cleanup.

use regex::{Regex, RegexBuilder};

/// A configured title-removal pattern, resolved once when the source is compiled.
#[derive(Debug, Clone)]
pub enum TitlePattern {
    Valid(Regex),
    Invalid { pattern: String, error: String },
}

impl TitlePattern {
    /// Compile `pattern` case-insensitively.
    pub fn compile(pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => TitlePattern::Valid(regex),
            Err(e) => TitlePattern::Invalid {
                pattern: pattern.to_string(),
                error: e.to_string(),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, TitlePattern::Valid(_))
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `value` at the earliest occurrence of any marker.
pub fn strip_after(value: &str, markers: &[String]) -> String {
    let cut = markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .filter_map(|marker| value.find(marker.as_str()))
        .min();
    match cut {
        Some(index) => value[..index].trim().to_string(),
        None => value.to_string(),
    }
}

/// Replace every match of every valid pattern with a space.
pub fn remove_patterns(value: &str, patterns: &[TitlePattern]) -> String {
    patterns.iter().fold(value.to_string(), |acc, pattern| match pattern {
        TitlePattern::Valid(regex) => regex.replace_all(&acc, " ").into_owned(),
        TitlePattern::Invalid { .. } => acc,
    })
}

/// ASCII `\w`: accented letters end a word, so "Café Café" is left alone.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split into maximal runs of word and non-word characters.
fn word_runs(value: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (index, c) in value.char_indices() {
        let word = is_word_char(c);
        match current {
            Some(kind) if kind == word => {}
            Some(kind) => {
                runs.push((kind, &value[start..index]));
                start = index;
                current = Some(word);
            }
            None => current = Some(word),
        }
    }
    if let Some(kind) = current {
        runs.push((kind, &value[start..]));
    }
    runs
}

/// Collapse a whole word repeated immediately after itself (separated only by
/// whitespace, compared case-insensitively) into its first occurrence:
/// "Senior Senior Engineer" becomes "Senior Engineer".
pub fn collapse_repeated_words(value: &str) -> String {
    let runs = word_runs(value);
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < runs.len() {
        let (is_word, text) = runs[i];
        out.push_str(text);
        i += 1;
        if !is_word {
            continue;
        }
        let lowered = text.to_lowercase();
        while i + 1 < runs.len() {
            let (gap_is_word, gap) = runs[i];
            let (next_is_word, next) = runs[i + 1];
            let gap_is_space = !gap_is_word && gap.chars().all(char::is_whitespace);
            if gap_is_space && next_is_word && next.to_lowercase() == lowered {
                i += 2;
            } else {
                break;
            }
        }
    }
    out
}

/// Full title cleanup: whitespace, markers, patterns, repeated words.
pub fn clean_title(raw: &str, strip_markers: &[String], patterns: &[TitlePattern]) -> String {
    let title = normalize_whitespace(raw);
    let title = strip_after(&title, strip_markers);
    let title = remove_patterns(&title, patterns);
    let title = normalize_whitespace(&title);
    let title = collapse_repeated_words(&title);
    normalize_whitespace(&title)
}
