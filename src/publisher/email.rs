//! HTML email delivery over SMTP.
//!
//! The SMTP conversation sits behind [`SmtpConnector`] / [`SmtpSession`] so
//! the publisher can be exercised without a mail server. [`LettreConnector`]
//! is the real implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::{Address, Message};
use pulldown_cmark::{html, Options, Parser};

use super::{PublishError, Publisher};
use crate::app::SmtpSettings;
use crate::domain::DigestResult;

pub const DEFAULT_TEMPLATE_PATH: &str = "templates/email_template.html";

const CONTENT_PLACEHOLDER: &str = "{{DIGEST_CONTENT}}";

const DATE_RANGE_PLACEHOLDER: &str = "{{DATE_RANGE}}";

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub const TEST_SUBJECT: &str = "Test Email - Estuary";

const FALLBACK_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Digest</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }
        .container { background-color: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        h1 { color: #e3120b; border-bottom: 3px solid #e3120b; padding-bottom: 10px; }
        h2 { color: #2c3e50; margin-top: 30px; }
        a { color: #e3120b; text-decoration: none; }
        .footer { margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; font-size: 0.9em; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Your Digest</h1>
        <p><strong>{{DATE_RANGE}}</strong></p>

        {{DIGEST_CONTENT}}

        <div class="footer">
            <p>This digest was automatically generated.</p>
        </div>
    </div>
</body>
</html>
"#;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("failed to connect to SMTP server: {0}")]
    Connect(String),

    #[error("STARTTLS negotiation failed: {0}")]
    Tls(String),

    #[error("SMTP authentication failed: {0}")]
    Auth(String),

    #[error("SMTP error: {0}")]
    Send(String),

    #[error("SMTP session aborted: {0}")]
    Aborted(String),
}

/// Opens one SMTP session per call.
pub trait SmtpConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn SmtpSession>, MailError>;
}

/// A live, blocking SMTP conversation.
pub trait SmtpSession: Send {
    fn starttls(&mut self) -> Result<(), MailError>;

    fn login(&mut self, username: &str, password: &str) -> Result<(), MailError>;

    fn send(&mut self, message: &Message) -> Result<(), MailError>;

    fn quit(&mut self) -> Result<(), MailError>;
}

/// [`SmtpConnector`] backed by lettre's low-level client.
pub struct LettreConnector {
    host: String,
    port: u16,
}

impl LettreConnector {
    pub fn new(settings: &SmtpSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
        }
    }
}

impl SmtpConnector for LettreConnector {
    fn connect(&self) -> Result<Box<dyn SmtpSession>, MailError> {
        let hello = ClientId::Domain("localhost".to_string());
        let connection = SmtpConnection::connect(
            (self.host.as_str(), self.port),
            Some(SMTP_TIMEOUT),
            &hello,
            None,
            None,
        )
        .map_err(|e| MailError::Connect(e.to_string()))?;

        Ok(Box::new(LettreSession {
            connection,
            host: self.host.clone(),
            hello,
        }))
    }
}

struct LettreSession {
    connection: SmtpConnection,
    host: String,
    hello: ClientId,
}

impl SmtpSession for LettreSession {
    fn starttls(&mut self) -> Result<(), MailError> {
        let params =
            TlsParameters::new(self.host.clone()).map_err(|e| MailError::Tls(e.to_string()))?;
        self.connection
            .starttls(&params, &self.hello)
            .map_err(|e| MailError::Tls(e.to_string()))
    }

    fn login(&mut self, username: &str, password: &str) -> Result<(), MailError> {
        let credentials = Credentials::new(username.to_string(), password.to_string());
        self.connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .map(|_| ())
            .map_err(|e| MailError::Auth(e.to_string()))
    }

    fn send(&mut self, message: &Message) -> Result<(), MailError> {
        self.connection
            .send(message.envelope(), &message.formatted())
            .map(|_| ())
            .map_err(|e| MailError::Send(e.to_string()))
    }

    fn quit(&mut self) -> Result<(), MailError> {
        self.connection
            .quit()
            .map(|_| ())
            .map_err(|e| MailError::Send(e.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailOptions {
    /// HTML template; [`DEFAULT_TEMPLATE_PATH`] when unset.
    pub template_path: Option<PathBuf>,
    /// Replaces the digest title at the front of the subject line.
    pub subject_override: Option<String>,
}

pub struct EmailPublisher {
    connector: Arc<dyn SmtpConnector>,
    settings: SmtpSettings,
    sender_name: String,
}

impl EmailPublisher {
    pub fn new(connector: Arc<dyn SmtpConnector>, settings: SmtpSettings, sender_name: impl Into<String>) -> Self {
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            "Email publisher initialized"
        );
        Self {
            connector,
            settings,
            sender_name: sender_name.into(),
        }
    }

    /// Render the full HTML message body for `digest`.
    pub async fn render_html(&self, digest: &DigestResult, template_path: Option<&Path>) -> String {
        let template = load_template(template_path).await;
        template
            .replace(CONTENT_PLACEHOLDER, &body_html(&digest.body))
            .replace(DATE_RANGE_PLACEHOLDER, &email_date_range(digest))
    }

    fn build_message(&self, recipient: &str, subject: String, html: String) -> Result<Message, MailError> {
        let from = Mailbox::new(
            Some(self.sender_name.clone()),
            parse_address(&self.settings.from_email)?,
        );
        let to = Mailbox::new(None, parse_address(recipient)?);

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| MailError::Build(e.to_string()))
    }

    async fn try_publish(&self, digest: &DigestResult, options: &EmailOptions) -> Result<(), PublishError> {
        let html = self
            .render_html(digest, Some(template_path(options)))
            .await;
        let subject = subject_line(digest, options.subject_override.as_deref());
        tracing::debug!(title = %digest.title, "Building email message");
        let message = self.build_message(&self.settings.recipient, subject, html)?;

        tracing::info!(recipient = %self.settings.recipient, "Sending digest");
        self.deliver(message).await
    }

    /// Send a fixed message to check the SMTP settings, to `recipient` or
    /// the configured recipient.
    pub async fn send_test(&self, recipient: Option<&str>) -> bool {
        let recipient = recipient.unwrap_or(&self.settings.recipient);
        tracing::info!(recipient = %recipient, "Sending test email");

        let html = self_check_html(Local::now());
        let result = match self.build_message(recipient, TEST_SUBJECT.to_string(), html) {
            Ok(message) => self.deliver(message).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => {
                tracing::info!("Test email sent successfully");
                true
            }
            Err(e) => {
                tracing::error!("Error sending test email: {}", e);
                false
            }
        }
    }

    async fn deliver(&self, message: Message) -> Result<(), PublishError> {
        let connector = Arc::clone(&self.connector);
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || run_session(connector.as_ref(), &settings, &message))
            .await
            .map_err(|e| MailError::Aborted(e.to_string()))??;

        Ok(())
    }
}

#[async_trait]
impl Publisher for EmailPublisher {
    type Options = EmailOptions;

    async fn publish(&self, digest: &DigestResult, options: &EmailOptions) -> bool {
        match self.try_publish(digest, options).await {
            Ok(()) => {
                tracing::info!("Email sent successfully");
                true
            }
            Err(e) => {
                tracing::error!("Error sending email: {}", e);
                false
            }
        }
    }
}

fn template_path(options: &EmailOptions) -> &Path {
    options
        .template_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_TEMPLATE_PATH))
}

/// Connect, optionally upgrade, authenticate, send. `quit` is always
/// attempted once connected and its outcome never replaces the result.
fn run_session(connector: &dyn SmtpConnector, settings: &SmtpSettings, message: &Message) -> Result<(), MailError> {
    let mut session = connector.connect()?;
    let result = converse(session.as_mut(), settings, message);

    if let Err(e) = session.quit() {
        tracing::debug!("Ignoring SMTP quit failure: {}", e);
    }

    result
}

fn converse(session: &mut dyn SmtpSession, settings: &SmtpSettings, message: &Message) -> Result<(), MailError> {
    if settings.starttls {
        session.starttls()?;
    }
    session.login(&settings.username, &settings.password)?;
    session.send(message)
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

async fn load_template(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return FALLBACK_TEMPLATE.to_string();
    };

    match tokio::fs::read_to_string(path).await {
        Ok(template) => template,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No email template, using built-in");
            FALLBACK_TEMPLATE.to_string()
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "Failed to load template: {}. Using built-in template.",
                e
            );
            FALLBACK_TEMPLATE.to_string()
        }
    }
}

/// HTML passes through untouched; anything else is treated as Markdown.
fn body_html(body: &str) -> String {
    if looks_like_html(body) {
        return body.to_string();
    }

    let parser = Parser::new_ext(body, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn looks_like_html(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

fn self_check_html(sent_at: DateTime<Local>) -> String {
    format!(
        "<h1>Test Email from Estuary</h1>\n\
         <p>This is a test email to verify your SMTP configuration.</p>\n\
         <p>If you received this, your email setup is working correctly!</p>\n\
         <p><small>Sent at: {}</small></p>\n",
        sent_at.format("%Y-%m-%d %H:%M:%S")
    )
}

fn email_date_range(digest: &DigestResult) -> String {
    digest.date.format("%b %d, %Y").to_string()
}

fn subject_line(digest: &DigestResult, subject_override: Option<&str>) -> String {
    format!(
        "{}: {} ({} articles)",
        subject_override.unwrap_or(&digest.title),
        email_date_range(digest),
        digest.sources_analyzed
    )
}
