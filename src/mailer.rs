//! Outbound mail port and proof-message rendering.
//!
//! The registry core never talks SMTP. Deployments implement [`Mailer`]
//! over whatever transport they have; [`MemoryMailer`] captures sends for
//! tests and [`NullMailer`] discards them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::Error;

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivery transport for proof mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> Result<(), Error>;
}

/// Renders a one-time proof credential into a deliverable message.
///
/// Separate from [`Mailer`] so one transport can carry differently branded
/// messages.
pub trait ProofMessage: Send + Sync {
    fn render(&self, to: &str, credential: &str) -> OutboundMail;
}

/// Sign-in message carrying a clickable magic link.
#[derive(Debug, Clone)]
pub struct LinkMessage {
    service_name: String,
    root_url: String,
}

impl LinkMessage {
    /// `root_url` is the deployment origin; a trailing slash is tolerated.
    pub fn new(service_name: impl Into<String>, root_url: impl Into<String>) -> Self {
        let root_url = root_url.into();
        Self {
            service_name: service_name.into(),
            root_url: root_url.trim_end_matches('/').to_owned(),
        }
    }

    fn login_url(&self, credential: &str) -> String {
        format!("{}/login?token={}", self.root_url, credential)
    }
}

impl ProofMessage for LinkMessage {
    fn render(&self, to: &str, credential: &str) -> OutboundMail {
        let login_url = self.login_url(credential);
        let subject = format!("Sign in to {}", self.service_name);
        let text = format!(
            "Follow this link to sign in to {}:\n\n{}\n\nThe link works once and expires soon. \
             If you did not request it, ignore this message.\n",
            self.service_name, login_url
        );
        let html = format!(
            "<p>Follow this link to sign in to {}:</p>\n\
             <p><a href=\"{}\">{}</a></p>\n\
             <p>The link works once and expires soon. \
             If you did not request it, ignore this message.</p>\n",
            escape_html(&self.service_name),
            escape_html(&login_url),
            escape_html(&login_url),
        );

        OutboundMail {
            to: to.to_owned(),
            subject,
            text,
            html,
        }
    }
}

/// Escapes text for interpolation into an HTML body.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Discards every message. For deployments that deliver out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, _mail: OutboundMail) -> Result<(), Error> {
        Ok(())
    }
}

/// Captures sent mail in memory for assertions.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    pub sent: Arc<Mutex<Vec<OutboundMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), Error> {
        self.sent
            .lock()
            .map_err(|_| Error::Mail("lock poisoned".to_owned()))?
            .push(mail);
        Ok(())
    }
}
