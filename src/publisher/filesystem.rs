use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::frontmatter::render_document;
use super::{slugify, PublishError, Publisher};
use crate::domain::DigestResult;

pub const DEFAULT_OUTPUT_DIR: &str = "content/digests";

#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// Exact destination; replaces the dated file name under the output dir.
    pub output_path: Option<PathBuf>,
}

/// Writes digests as Markdown files with a YAML header.
#[derive(Debug, Clone)]
pub struct FileSystemPublisher {
    output_dir: PathBuf,
}

impl Default for FileSystemPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl FileSystemPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/<YYYY-MM-DD>-<config slug>.md`
    pub fn path_for(&self, digest: &DigestResult) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}.md",
            digest.date.format("%Y-%m-%d"),
            slugify(&digest.config_name)
        ))
    }

    /// Like [`Publisher::publish`] but reports the path written.
    pub async fn write(&self, digest: &DigestResult, options: &FileOptions) -> Result<PathBuf, PublishError> {
        let path = options
            .output_path
            .clone()
            .unwrap_or_else(|| self.path_for(digest));
        let content = render_document(digest, None)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PublishError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|source| PublishError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Digest saved");
        Ok(path)
    }
}

#[async_trait]
impl Publisher for FileSystemPublisher {
    type Options = FileOptions;

    async fn publish(&self, digest: &DigestResult, options: &FileOptions) -> bool {
        match self.write(digest, options).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to save digest: {}", e);
                false
            }
        }
    }
}
