pub mod feed;
pub mod http_fetcher;

pub use feed::FeedFetcher;
pub use http_fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::app::Result;

/// Retrieves the raw bytes of a feed document.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
