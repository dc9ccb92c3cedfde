//! # Estuary
//!
//! Turns a set of RSS/Atom feeds into a single LLM-written digest and
//! publishes it.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Summarizer → Publisher(s)
//! ```
//!
//! - [`fetcher`]: HTTP retrieval and the per-configuration feed fetcher
//! - [`normalizer`]: Converts RSS/Atom/JSON Feed entries to content items
//! - [`summarizer`]: Prompt rendering and the chat-completion call
//! - [`publisher`]: Markdown archive, SMTP email, static-site git repo
//! - [`pipeline`]: Runs the stages in order and reports the outcome
//!
//! ## Quick Start
//!
//! ```bash
//! # See what is configured
//! estuary configs
//!
//! # Generate configs/tech.toml's digest into content/digests
//! estuary generate --config tech
//!
//! # ...and email it
//! estuary generate --config tech --email
//!
//! # Re-send a saved digest
//! estuary publish email content/digests/2024-01-08-tech.md
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) snapshots the environment (after `.env`)
/// and builds the summarizer and publishers from it.
pub mod app;

/// Command-line interface using clap.
///
/// - `generate --config <name>` - Run the pipeline
/// - `publish email|site <file>` - Deliver a saved digest
/// - `configs` - List configurations
pub mod cli;

/// Digest configuration files (`configs/<name>.toml`).
pub mod config;

/// Core domain models.
///
/// - [`ContentItem`](domain::ContentItem): One fetched article
/// - [`DigestResult`](domain::DigestResult): The generated digest
pub mod domain;

/// Feed retrieval.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for raw document fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`FeedFetcher`](fetcher::FeedFetcher): Walks a configuration's feeds in order
pub mod fetcher;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into [`ContentItem`](domain::ContentItem)s.
pub mod normalizer;

pub mod pipeline;

pub mod publisher;

pub mod summarizer;
