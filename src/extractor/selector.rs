use scraper::{ElementRef, Selector};

use crate::{AppError, Result};

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Split a comma-separated selector list at top level only, so commas inside
/// `:is(a, b)` or `[data-x='a,b']` stay with their selector.
pub fn split_selector_list(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in list.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Text content of an element, trimmed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Attribute value if present and not blank.
pub fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .filter(|value| !value.trim().is_empty())
}

/// Ordered fallback list of CSS selectors; the first one that matches wins.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    entries: Vec<Selector>,
}

impl SelectorChain {
    pub fn parse(list: &str) -> Result<Self> {
        let entries = split_selector_list(list)
            .into_iter()
            .map(|raw| parse_selector(&raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Build a chain from selectors that are known to be valid.
    pub fn from_static(selectors: &[&str]) -> Self {
        let entries = selectors
            .iter()
            .filter_map(|raw| Selector::parse(raw).ok())
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First descendant matched by the first selector that matches anything.
    pub fn first_element<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.entries
            .iter()
            .find_map(|selector| root.select(selector).next())
    }

    /// First element matched by the primary selector only.
    pub fn primary_element<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.entries
            .first()
            .and_then(|selector| root.select(selector).next())
    }

    /// Trimmed text of the first match whose text is not empty. Each selector
    /// contributes only its first match, like `querySelector`.
    pub fn first_text(&self, root: ElementRef<'_>) -> Option<String> {
        self.entries.iter().find_map(|selector| {
            root.select(selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
        })
    }
}
