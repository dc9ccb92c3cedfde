use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar metadata attached to a digest (model name, token counts, overrides).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

pub type Metadata = BTreeMap<String, MetadataValue>;

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Integer)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The artifact of one digest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestResult {
    pub title: String,
    /// Generation time, not content time.
    pub date: DateTime<Utc>,
    pub config_name: String,
    /// Number of items folded into `body`.
    pub sources_analyzed: usize,
    /// Markdown or HTML, depending on what the model returned.
    pub body: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DigestResult {
    pub fn new(
        title: impl Into<String>,
        date: DateTime<Utc>,
        config_name: impl Into<String>,
        sources_analyzed: usize,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            date,
            config_name: config_name.into(),
            sources_analyzed,
            body: body.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetadataValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_metadata_fits_integer() {
        assert_eq!(MetadataValue::from(1234u64), MetadataValue::Integer(1234));
    }

    #[test]
    fn test_metadata_display() {
        assert_eq!(MetadataValue::from("gpt-4o-mini").to_string(), "gpt-4o-mini");
        assert_eq!(MetadataValue::from(42i64).to_string(), "42");
        assert_eq!(MetadataValue::from(true).to_string(), "true");
    }

    #[test]
    fn test_with_metadata() {
        let digest = DigestResult::new("T", Utc::now(), "cfg", 2, "body")
            .with_metadata("model", "gpt-4o-mini")
            .with_metadata("total_tokens", 120i64);
        assert_eq!(digest.metadata_str("model"), Some("gpt-4o-mini"));
        assert_eq!(digest.metadata["total_tokens"].as_i64(), Some(120));
        assert_eq!(digest.metadata_str("total_tokens"), None);
    }
}
