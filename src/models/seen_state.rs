use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// On-disk shape of the seen-set: `{"urls": [...]}`, most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenState {
    #[serde(default)]
    pub urls: Vec<String>,
}

impl SeenState {
    pub fn new(urls: Vec<String>) -> Self {
        let mut state = Self { urls };
        state.dedup();
        state
    }

    /// Drop repeated identifiers, keeping the first (most recent) occurrence.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.urls.retain(|url| seen.insert(url.clone()));
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
