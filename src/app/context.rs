use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{EstuaryError, Result};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::publisher::email::{EmailPublisher, LettreConnector};
use crate::publisher::site::{GitCli, SitePublisher};
use crate::summarizer::{OpenAiClient, Summarizer, DEFAULT_MODEL};

/// Credentials and endpoint for the completion API.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
}

/// SMTP transport and addressing for the email publisher.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub starttls: bool,
    pub from_email: String,
    pub sender_name: Option<String>,
    pub recipient: String,
}

/// Static-site repository location.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub repo_url: Option<String>,
    pub checkout_dir: PathBuf,
}

/// Process-boundary settings, captured once at startup.
///
/// The context owns a snapshot of the environment (after `.env` is applied)
/// and wires the pipeline components from it.
pub struct AppContext {
    vars: BTreeMap<String, String>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl AppContext {
    /// Load `.env` (overriding the inherited environment) and snapshot the result.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv_override() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new()?);

        Ok(Self { vars, fetcher })
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn require<'a>(&'a self, keys: &[&str]) -> Result<Vec<&'a str>> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| self.var(k).is_none())
            .map(|k| k.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(EstuaryError::MissingEnv(missing));
        }

        Ok(keys.iter().filter_map(|k| self.var(k)).collect())
    }

    pub fn llm(&self) -> Result<LlmSettings> {
        let api_key = self.require(&["OPENAI_API_KEY"])?[0].to_string();

        Ok(LlmSettings {
            api_key,
            base_url: self.var("OPENAI_BASE_URL").map(String::from),
            model: self.var("LLM_MODEL").unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    pub fn smtp(&self) -> Result<SmtpSettings> {
        let required = self.require(&[
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USERNAME",
            "SMTP_PASSWORD",
            "RECIPIENT_EMAIL",
        ])?;
        let (host, port, username, password, recipient) = (
            required[0],
            required[1],
            required[2],
            required[3],
            required[4],
        );

        let port = port.trim().parse::<u16>().map_err(|_| EstuaryError::InvalidEnv {
            var: "SMTP_PORT".into(),
            reason: format!("'{}' is not a valid port number", port),
        })?;

        let starttls = self
            .var("SMTP_STARTTLS")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        Ok(SmtpSettings {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            starttls,
            from_email: self.var("FROM_EMAIL").unwrap_or(username).to_string(),
            sender_name: self.var("EMAIL_SENDER_NAME").map(String::from),
            recipient: recipient.to_string(),
        })
    }

    pub fn site(&self) -> SiteSettings {
        let checkout_dir = self
            .var("SITE_CHECKOUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_checkout_dir);

        SiteSettings {
            repo_url: self.var("BLOG_REPO_URL").map(String::from),
            checkout_dir,
        }
    }

    pub fn summarizer(&self) -> Result<Summarizer> {
        let settings = self.llm()?;
        let mut client = OpenAiClient::new(settings.api_key)?;
        if let Some(base_url) = settings.base_url {
            client = client.with_base_url(base_url);
        }
        tracing::info!(model = %settings.model, "Summarizer initialized");
        Ok(Summarizer::new(Arc::new(client), settings.model))
    }

    /// Build the email publisher; `fallback_sender` names the sender when
    /// `EMAIL_SENDER_NAME` is unset.
    pub fn email_publisher(&self, fallback_sender: &str) -> Result<EmailPublisher> {
        let settings = self.smtp()?;
        let sender_name = settings
            .sender_name
            .clone()
            .unwrap_or_else(|| fallback_sender.to_string());
        let connector = LettreConnector::new(&settings);

        Ok(EmailPublisher::new(
            Arc::new(connector),
            settings,
            sender_name,
        ))
    }

    /// Build the site publisher; an explicit `repo_url` wins over `BLOG_REPO_URL`.
    pub fn site_publisher(&self, repo_url: Option<String>) -> Result<SitePublisher> {
        let settings = self.site();
        let repo_url = repo_url.or(settings.repo_url).ok_or_else(|| {
            EstuaryError::MissingEnv(vec!["BLOG_REPO_URL".into()])
        })?;

        let git = GitCli::new().redacting_credentials_of(&repo_url);

        Ok(SitePublisher::new(
            Arc::new(git),
            repo_url,
            settings.checkout_dir,
        ))
    }

    fn default_checkout_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("estuary")
            .join("site")
    }
}
