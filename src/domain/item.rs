use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized unit of fetched content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub url: String,
    pub content: String,
    /// Logical feed name from the configuration, not the feed URL.
    pub source: String,
    pub published_date: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Build an item, rejecting entries without a title or URL.
    ///
    /// Empty content falls back to the title.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        published_date: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let title = title.into().trim().to_string();
        let url = url.into().trim().to_string();
        if title.is_empty() || url.is_empty() {
            return None;
        }

        let mut content = content.into();
        if content.trim().is_empty() {
            content = title.clone();
        }

        Some(Self {
            title,
            url,
            content,
            source: source.into(),
            published_date,
        })
    }

    /// `YYYY-MM-DD`, or `Unknown` when the feed gave no usable date.
    pub fn display_date(&self) -> String {
        self.published_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
