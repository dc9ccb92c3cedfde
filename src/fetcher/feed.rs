use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::app::Result;
use crate::domain::ContentItem;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;

/// Pulls recent items from a fixed, ordered set of named feeds.
pub struct FeedFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    feeds: Vec<(String, String)>,
}

impl FeedFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, feeds: Vec<(String, String)>) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
            feeds,
        }
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Fetch every feed in order, keeping items from the last `lookback_days`.
    ///
    /// A feed that fails to download or parse is logged and skipped.
    pub async fn fetch(&self, lookback_days: u32) -> Vec<ContentItem> {
        self.fetch_since(Utc::now() - Duration::days(i64::from(lookback_days)))
            .await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit cutoff instant.
    pub async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Vec<ContentItem> {
        let mut all_items = Vec::new();

        for (name, url) in &self.feeds {
            tracing::info!(source = %name, "Fetching feed");

            match self.fetch_single_feed(name, url, cutoff).await {
                Ok(items) => {
                    tracing::info!("Retrieved {} articles from {}", items.len(), name);
                    all_items.extend(items);
                }
                Err(e) => {
                    tracing::error!(source = %name, url = %url, "Failed to fetch feed: {}", e);
                }
            }
        }

        tracing::info!("Total articles retrieved: {}", all_items.len());
        all_items
    }

    async fn fetch_single_feed(
        &self,
        name: &str,
        url: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>> {
        let body = self.fetcher.fetch(url).await?;
        let items = self.normalizer.normalize(name, &body)?;

        Ok(items
            .into_iter()
            .filter(|item| is_recent(item, cutoff))
            .collect())
    }
}

/// Unknown dates are kept; known dates must not precede the cutoff.
fn is_recent(item: &ContentItem, cutoff: DateTime<Utc>) -> bool {
    item.published_date.is_none_or(|date| date >= cutoff)
}
