use serde::{Deserialize, Serialize};

/// One normalized listing as read from a source page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRecord {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub source: String,
}

impl RawRecord {
    /// True when neither a title nor a link could be resolved.
    pub fn is_blank(&self) -> bool {
        self.title.is_empty() && self.link.is_empty()
    }

    /// Lowercased `title company location`, used for substring filtering.
    pub fn haystack(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.company.as_deref().unwrap_or(""),
            self.location.as_deref().unwrap_or("")
        )
        .to_lowercase()
        .trim()
        .to_string()
    }

    /// Chat-friendly rendering of a single record.
    pub fn to_message_block(&self) -> String {
        let title = if self.title.is_empty() { "Untitled" } else { &self.title };
        let company = self
            .company
            .as_deref()
            .map(|c| format!(" at {}", c))
            .unwrap_or_default();
        let location = self
            .location
            .as_deref()
            .map(|l| format!(" ({})", l))
            .unwrap_or_default();
        let link = if self.link.is_empty() { "No link" } else { &self.link };
        format!("💼 {}{}{}\n🔗 {}", title, company, location, link)
    }
}
