//! One digest run, start to finish.
//!
//! ```text
//! Init → Fetch → Summarize → Publish → Done
//! ```
//!
//! Each stage runs to completion before the next starts. A run that cannot
//! continue stops at the stage where it failed and says why in its
//! [`RunReport`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigError, DigestConfig};
use crate::domain::DigestResult;
use crate::fetcher::{FeedFetcher, Fetcher};
use crate::publisher::{Delivery, FileOptions, FileSystemPublisher};
use crate::summarizer::Summarizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Fetch,
    Summarize,
    Publish,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Fetch => "fetch",
            Self::Summarize => "summarize",
            Self::Publish => "publish",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted { stage: Stage, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the configuration's `days_lookback`.
    pub lookback_days: Option<u32>,
    /// Keep only the first N fetched items.
    pub limit: Option<usize>,
    /// Write the archive copy but skip every delivery.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    pub article_count: usize,
    pub date_range: String,
    pub total_tokens: u64,
    /// Archive file written by this run.
    pub artifact: Option<PathBuf>,
    pub digest: Option<DigestResult>,
}

impl RunReport {
    fn new(date_range: String) -> Self {
        Self {
            outcome: Outcome::Completed,
            article_count: 0,
            date_range,
            total_tokens: 0,
            artifact: None,
            digest: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Completed
    }

    /// Stage the run stopped at, if it did not complete.
    pub fn failed_stage(&self) -> Option<Stage> {
        match &self.outcome {
            Outcome::Completed => None,
            Outcome::Aborted { stage, .. } => Some(*stage),
        }
    }

    fn abort(mut self, stage: Stage, reason: impl Into<String>) -> Self {
        self.outcome = Outcome::Aborted {
            stage,
            reason: reason.into(),
        };
        self
    }
}

/// Drives fetch, summarize and publish for one configuration at a time.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    summarizer: Summarizer,
    archive: Option<FileSystemPublisher>,
    deliveries: Vec<Box<dyn Delivery>>,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, summarizer: Summarizer) -> Self {
        Self {
            fetcher,
            summarizer,
            archive: None,
            deliveries: Vec::new(),
        }
    }

    /// Local Markdown copy, written even on dry runs.
    #[must_use]
    pub fn with_archive(mut self, archive: FileSystemPublisher) -> Self {
        self.archive = Some(archive);
        self
    }

    #[must_use]
    pub fn with_delivery(mut self, delivery: Box<dyn Delivery>) -> Self {
        self.deliveries.push(delivery);
        self
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub async fn run(&mut self, config: &DigestConfig, options: RunOptions) -> RunReport {
        let lookback = options.lookback_days.unwrap_or(config.days_lookback);
        self.summarizer.set_lookback_days(lookback);

        let report = RunReport::new(self.summarizer.date_range());
        tracing::info!(
            config = %config.name,
            lookback_days = lookback,
            dry_run = options.dry_run,
            "Starting digest run"
        );

        let report = self.execute(config, &options, lookback, report).await;
        log_summary(&config.name, &report);
        report
    }

    async fn execute(
        &mut self,
        config: &DigestConfig,
        options: &RunOptions,
        lookback: u32,
        mut report: RunReport,
    ) -> RunReport {
        if config.prompt_template.trim().is_empty() {
            let err = ConfigError::MissingPrompt(config.name.clone());
            return report.abort(Stage::Init, err.to_string());
        }

        // Fetch
        let feeds = FeedFetcher::new(Arc::clone(&self.fetcher), config.feeds.clone());
        tracing::info!("Fetching articles from {} feeds", feeds.feed_count());
        let mut items = feeds.fetch(lookback).await;

        if items.is_empty() {
            return report.abort(Stage::Fetch, "no articles found");
        }
        if let Some(limit) = options.limit {
            if items.len() > limit {
                items.truncate(limit);
                tracing::info!("Limited to {} articles", limit);
            }
        }
        report.article_count = items.len();

        // Summarize
        let digest = match self
            .summarizer
            .summarize(&items, &config.prompt_template, &config.name)
            .await
        {
            Ok(digest) => digest,
            Err(e) => {
                report.total_tokens = self.summarizer.token_usage().total_tokens;
                return report.abort(Stage::Summarize, e.to_string());
            }
        };
        report.total_tokens = self.summarizer.token_usage().total_tokens;

        // Publish
        let mut failures = Vec::new();

        if let Some(archive) = &self.archive {
            match archive.write(&digest, &FileOptions::default()).await {
                Ok(path) => report.artifact = Some(path),
                Err(e) => {
                    tracing::error!("Failed to save digest: {}", e);
                    failures.push("archive".to_string());
                }
            }
        }

        if options.dry_run {
            if !self.deliveries.is_empty() {
                tracing::info!(
                    "Dry run: skipping {} delivery target(s)",
                    self.deliveries.len()
                );
            }
        } else {
            for delivery in &self.deliveries {
                tracing::info!(destination = delivery.name(), "Delivering digest");
                if !delivery.deliver(&digest).await {
                    failures.push(delivery.name().to_string());
                }
            }
        }

        report.digest = Some(digest);

        if !failures.is_empty() {
            return report.abort(
                Stage::Publish,
                format!("failed to publish to {}", failures.join(", ")),
            );
        }

        report
    }
}

fn log_summary(config_name: &str, report: &RunReport) {
    match &report.outcome {
        Outcome::Completed => tracing::info!(
            config = %config_name,
            stage = %Stage::Done,
            articles = report.article_count,
            tokens = report.total_tokens,
            date_range = %report.date_range,
            "Digest run completed"
        ),
        Outcome::Aborted { stage, reason } => tracing::warn!(
            config = %config_name,
            stage = %stage,
            articles = report.article_count,
            tokens = report.total_tokens,
            date_range = %report.date_range,
            "Digest run stopped: {}",
            reason
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::app::{EstuaryError, Result};
    use crate::publisher::{Bound, Publisher};
    use crate::summarizer::{Completion, CompletionClient, CompletionError, CompletionRequest};

    struct FixedFeed {
        body: Option<String>,
    }

    #[async_trait]
    impl Fetcher for FixedFeed {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.body
                .clone()
                .map(String::into_bytes)
                .ok_or_else(|| EstuaryError::Other(format!("unreachable: {}", url)))
        }
    }

    fn feed_with(n: usize) -> Arc<FixedFeed> {
        let mut xml = String::from(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>"#,
        );
        for i in 0..n {
            xml.push_str(&format!(
                "<item><title>Post {i}</title><link>https://example.com/{i}</link></item>"
            ));
        }
        xml.push_str("</channel></rss>");
        Arc::new(FixedFeed { body: Some(xml) })
    }

    struct EchoClient {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<Completion, CompletionError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if self.fail {
                return Err(CompletionError::Connection("refused".into()));
            }
            Ok(Completion {
                text: format!("<p>{}</p>", request.prompt),
                model: request.model.clone(),
                total_tokens: 42,
            })
        }
    }

    fn client(fail: bool) -> Arc<EchoClient> {
        Arc::new(EchoClient {
            prompts: Mutex::new(Vec::new()),
            fail,
        })
    }

    struct CountingDelivery {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Publisher for CountingDelivery {
        type Options = bool;

        async fn publish(&self, _digest: &DigestResult, succeed: &bool) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *succeed
        }
    }

    fn config() -> DigestConfig {
        DigestConfig {
            name: "Tech".into(),
            description: String::new(),
            schedule: "weekly".into(),
            feeds: vec![("Blog".into(), "https://example.com/feed".into())],
            days_lookback: 7,
            email_subject: "Tech Digest".into(),
            sender_name: "Tech".into(),
            prompt_template: "{article_count} articles".into(),
        }
    }

    #[tokio::test]
    async fn test_missing_prompt_stops_at_init() {
        let llm = client(false);
        let mut pipeline = Pipeline::new(feed_with(2), Summarizer::new(llm.clone(), "m"));
        let mut config = config();
        config.prompt_template = "  ".into();

        let report = pipeline.run(&config, RunOptions::default()).await;

        assert_eq!(report.failed_stage(), Some(Stage::Init));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_fetch_stops_before_summarize() {
        let llm = client(false);
        let mut pipeline = Pipeline::new(
            Arc::new(FixedFeed { body: None }),
            Summarizer::new(llm.clone(), "m"),
        );

        let report = pipeline.run(&config(), RunOptions::default()).await;

        assert_eq!(report.failed_stage(), Some(Stage::Fetch));
        assert_eq!(report.article_count, 0);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_failure_skips_publish() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(feed_with(3), Summarizer::new(client(true), "m"))
            .with_archive(FileSystemPublisher::new(dir.path()))
            .with_delivery(Bound::new("counter", CountingDelivery { calls: calls.clone() }, true).boxed());

        let report = pipeline.run(&config(), RunOptions::default()).await;

        assert_eq!(report.failed_stage(), Some(Stage::Summarize));
        assert_eq!(report.article_count, 3);
        assert!(report.artifact.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_completed_run() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(feed_with(3), Summarizer::new(client(false), "m"))
            .with_archive(FileSystemPublisher::new(dir.path()))
            .with_delivery(Bound::new("counter", CountingDelivery { calls: calls.clone() }, true).boxed());

        let report = pipeline.run(&config(), RunOptions::default()).await;

        assert!(report.is_success());
        assert_eq!(report.article_count, 3);
        assert_eq!(report.total_tokens, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let artifact = report.artifact.unwrap();
        assert!(artifact.starts_with(dir.path()));
        assert!(std::fs::read_to_string(artifact)
            .unwrap()
            .contains("sources_analyzed: 3"));
    }

    #[tokio::test]
    async fn test_limit_truncates_batch() {
        let llm = client(false);
        let mut pipeline = Pipeline::new(feed_with(8), Summarizer::new(llm.clone(), "m"));
        let options = RunOptions {
            limit: Some(5),
            ..RunOptions::default()
        };

        let report = pipeline.run(&config(), options).await;

        assert_eq!(report.article_count, 5);
        assert_eq!(llm.prompts.lock().unwrap()[0], "5 articles");
        assert_eq!(report.digest.unwrap().sources_analyzed, 5);
    }

    #[tokio::test]
    async fn test_dry_run_archives_without_delivery() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(feed_with(2), Summarizer::new(client(false), "m"))
            .with_archive(FileSystemPublisher::new(dir.path()))
            .with_delivery(Bound::new("counter", CountingDelivery { calls: calls.clone() }, true).boxed());
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let report = pipeline.run(&config(), options).await;

        assert!(report.is_success());
        assert!(report.artifact.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_fails_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(feed_with(2), Summarizer::new(client(false), "m"))
            .with_delivery(Bound::new("email", CountingDelivery { calls: calls.clone() }, false).boxed())
            .with_delivery(Bound::new("site", CountingDelivery { calls: calls.clone() }, true).boxed());

        let report = pipeline.run(&config(), RunOptions::default()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match report.outcome {
            Outcome::Aborted { stage, reason } => {
                assert_eq!(stage, Stage::Publish);
                assert!(reason.contains("email"));
                assert!(!reason.contains("site"));
            }
            Outcome::Completed => panic!("run should have failed"),
        }
    }

    #[tokio::test]
    async fn test_lookback_override_shapes_date_range() {
        let mut pipeline = Pipeline::new(feed_with(1), Summarizer::new(client(false), "m"));
        let options = RunOptions {
            lookback_days: Some(0),
            ..RunOptions::default()
        };

        let report = pipeline.run(&config(), options).await;

        let today = chrono::Utc::now().format("%b %d").to_string();
        assert!(report.date_range.starts_with(&today));
    }
}
