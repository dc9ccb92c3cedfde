//! Digest destinations.
//!
//! Every destination implements [`Publisher`] with its own options type and
//! reports success as a plain `bool`; failures are logged where they happen
//! and never propagate to the caller.
//!
//! - [`FileSystemPublisher`]: Markdown file with a YAML header
//! - [`EmailPublisher`]: HTML email over SMTP
//! - [`SitePublisher`]: post committed to a static-site git repository
//!
//! [`Delivery`] erases the options type so destinations of different kinds
//! can be queued together behind `Box<dyn Delivery>`.

pub mod email;
pub mod filesystem;
pub mod frontmatter;
pub mod site;

pub use email::{EmailOptions, EmailPublisher};
pub use filesystem::{FileOptions, FileSystemPublisher};
pub use site::{SiteOptions, SitePublisher};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::DigestResult;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render digest header: {0}")]
    Header(#[from] serde_yaml::Error),

    #[error(transparent)]
    Mail(#[from] email::MailError),

    #[error(transparent)]
    Git(#[from] site::GitError),
}

#[async_trait]
pub trait Publisher: Send + Sync {
    type Options: Send + Sync;

    /// Deliver `digest`. Returns `false` on any failure.
    async fn publish(&self, digest: &DigestResult, options: &Self::Options) -> bool;
}

/// A publisher paired with the options it should be called with.
#[async_trait]
pub trait Delivery: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, digest: &DigestResult) -> bool;
}

pub struct Bound<P: Publisher> {
    name: String,
    publisher: P,
    options: P::Options,
}

impl<P: Publisher> Bound<P> {
    pub fn new(name: impl Into<String>, publisher: P, options: P::Options) -> Self {
        Self {
            name: name.into(),
            publisher,
            options,
        }
    }

    pub fn boxed(self) -> Box<dyn Delivery>
    where
        P: 'static,
    {
        Box::new(self)
    }
}

#[async_trait]
impl<P: Publisher> Delivery for Bound<P> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, digest: &DigestResult) -> bool {
        self.publisher.publish(digest, &self.options).await
    }
}

/// URL- and filename-safe form of `text`.
///
/// Every non-alphanumeric character becomes a separator; empty segments are
/// dropped.
pub fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
