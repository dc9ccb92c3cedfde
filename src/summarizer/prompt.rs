//! Prompt assembly for the digest request.

use std::fmt::Write;

use chrono::{DateTime, Duration, Utc};

use crate::domain::ContentItem;

/// Characters of each article's content shown to the model.
pub const CONTENT_PREVIEW_CHARS: usize = 500;

const ARTICLE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromptError {
    #[error("unknown placeholder '{{{0}}}' in prompt template")]
    UnknownPlaceholder(String),

    #[error("unmatched '{0}' at byte {1} of prompt template")]
    Unbalanced(char, usize),
}

/// Substitute `{name}` placeholders.
///
/// `{{` and `}}` produce literal braces. A format specifier after `:` or a
/// conversion after `!` is accepted and ignored.
pub fn render_template(template: &str, values: &[(&str, String)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    out.push('{');
                    continue;
                }

                let mut field = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    field.push(inner);
                }
                if !closed {
                    return Err(PromptError::Unbalanced('{', pos));
                }

                let name = field
                    .split([':', '!'])
                    .next()
                    .unwrap_or_default()
                    .trim();
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| PromptError::UnknownPlaceholder(name.to_string()))?;
                out.push_str(value);
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_none() {
                    return Err(PromptError::Unbalanced('}', pos));
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Numbered article blocks separated by `---` rules.
pub fn format_articles(items: &[ContentItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let content = if item.content.is_empty() {
                "No content available".to_string()
            } else {
                item.content.chars().take(CONTENT_PREVIEW_CHARS).collect()
            };

            let mut block = String::new();
            let _ = writeln!(block, "Article {}:", i + 1);
            let _ = writeln!(block, "Title: {}", item.title);
            let _ = writeln!(block, "URL: {}", item.url);
            let _ = writeln!(block, "Source: {}", item.source);
            let _ = writeln!(block, "Published: {}", item.display_date());
            let _ = write!(block, "Content: {}", content);
            block.trim().to_string()
        })
        .collect::<Vec<_>>()
        .join(ARTICLE_SEPARATOR)
}

/// `"Jan 01 - Jan 08, 2024"` for the window ending at `end`.
pub fn date_range(end: DateTime<Utc>, lookback_days: u32) -> String {
    let start = end - Duration::days(i64::from(lookback_days));
    format!("{} - {}", start.format("%b %d"), end.format("%b %d, %Y"))
}
