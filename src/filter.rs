use crate::models::RawRecord;

/// Titles some boards emit for non-listing rows, compared case-insensitively.
const ARTIFACT_TITLES: &[&str] = &["view company profile"];

/// Free-text include/exclude predicates over title, company and location.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    include: Option<String>,
    exclude: Option<String>,
}

impl RecordFilter {
    /// Empty strings disable the corresponding predicate. Surrounding spaces
    /// are part of the term, so `" rust"` only matches at a word start.
    pub fn new(include: &str, exclude: &str) -> Self {
        let normalize = |term: &str| {
            let term = term.to_lowercase();
            (!term.is_empty()).then_some(term)
        };
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    pub fn accepts(&self, record: &RawRecord) -> bool {
        if record.is_blank() {
            return false;
        }
        let title = record.title.to_lowercase();
        if ARTIFACT_TITLES.iter().any(|artifact| title == *artifact) {
            return false;
        }

        let haystack = record.haystack();
        if let Some(include) = &self.include {
            if !haystack.contains(include.as_str()) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if haystack.contains(exclude.as_str()) {
                return false;
            }
        }
        true
    }

    /// Keep accepted records in their original order.
    pub fn apply(&self, records: Vec<RawRecord>) -> Vec<RawRecord> {
        let before = records.len();
        let kept: Vec<RawRecord> = records.into_iter().filter(|r| self.accepts(r)).collect();
        tracing::debug!(
            include = ?self.include,
            exclude = ?self.exclude,
            before,
            after = kept.len(),
            "Filtered records"
        );
        kept
    }
}
