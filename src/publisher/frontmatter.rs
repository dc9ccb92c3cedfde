//! Markdown documents with a YAML header block.
//!
//! ```text
//! ---
//! title: Tech Digest
//! date: 2024-01-08T09:00:00.123456Z
//! config: Tech
//! sources_analyzed: 12
//! model: gpt-4o-mini
//! ---
//!
//! <body>
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};

use crate::domain::{DigestResult, Metadata, MetadataValue};
use crate::normalizer::parse_timestamp;

const RESERVED_KEYS: &[&str] = &["layout", "title", "date", "config", "sources_analyzed"];

const DEFAULT_TITLE: &str = "Digest";

const DEFAULT_CONFIG: &str = "unknown";

/// Serialize `digest` as header + body. `layout` is emitted first when given.
pub fn render_document(digest: &DigestResult, layout: Option<&str>) -> Result<String, serde_yaml::Error> {
    let mut header = Mapping::new();
    if let Some(layout) = layout {
        header.insert("layout".into(), layout.into());
    }
    header.insert("title".into(), digest.title.as_str().into());
    header.insert(
        "date".into(),
        digest
            .date
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
            .into(),
    );
    header.insert("config".into(), digest.config_name.as_str().into());
    header.insert(
        "sources_analyzed".into(),
        Value::Number((digest.sources_analyzed as u64).into()),
    );

    for (key, value) in &digest.metadata {
        if RESERVED_KEYS.contains(&key.as_str()) {
            tracing::debug!(key = %key, "Metadata key shadows a header field, skipping");
            continue;
        }
        header.insert(key.as_str().into(), serde_yaml::to_value(value)?);
    }

    let yaml = serde_yaml::to_string(&header)?;
    Ok(format!("---\n{}---\n\n{}", yaml, digest.body))
}

/// Rebuild a digest from a saved document.
///
/// Missing header fields fall back to defaults; a document without a header
/// is all body.
pub fn parse_document(text: &str) -> Result<DigestResult, serde_yaml::Error> {
    let (header, body) = match split_header(text) {
        Some((header, body)) => (parse_header(header)?, body.trim()),
        None => {
            tracing::warn!("No header block found, treating the whole document as body");
            (Mapping::new(), text.trim())
        }
    };

    let mut digest = DigestResult::new(
        string_field(&header, "title").unwrap_or(DEFAULT_TITLE),
        header_date(&header),
        string_field(&header, "config").unwrap_or(DEFAULT_CONFIG),
        header
            .get("sources_analyzed")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize,
        body,
    );
    digest.metadata = extra_metadata(&header);

    Ok(digest)
}

fn split_header(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let newline = rest.find('\n')?;
    if !rest[..newline].trim().is_empty() {
        return None;
    }
    let rest = &rest[newline + 1..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.ends_with('\n') && line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_header(header: &str) -> Result<Mapping, serde_yaml::Error> {
    if header.trim().is_empty() {
        return Ok(Mapping::new());
    }
    serde_yaml::from_str(header)
}

fn string_field<'a>(header: &'a Mapping, key: &str) -> Option<&'a str> {
    header.get(key).and_then(Value::as_str)
}

fn header_date(header: &Mapping) -> DateTime<Utc> {
    match string_field(header, "date") {
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            tracing::warn!("Unparseable header date '{}', using current time", raw);
            Utc::now()
        }),
        None => Utc::now(),
    }
}

fn extra_metadata(header: &Mapping) -> Metadata {
    let mut metadata = Metadata::new();

    for (key, value) in header {
        let Some(key) = key.as_str() else {
            continue;
        };
        if RESERVED_KEYS.contains(&key) {
            continue;
        }

        let value = match value {
            Value::Bool(b) => MetadataValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetadataValue::Integer(i),
                None => MetadataValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => MetadataValue::Text(s.clone()),
            _ => {
                tracing::debug!(key = %key, "Skipping non-scalar header value");
                continue;
            }
        };
        metadata.insert(key.to_string(), value);
    }

    metadata
}
