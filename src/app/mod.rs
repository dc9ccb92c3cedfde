pub mod context;
pub mod error;

pub use context::{AppContext, LlmSettings, SiteSettings, SmtpSettings};
pub use error::{EstuaryError, Result};
