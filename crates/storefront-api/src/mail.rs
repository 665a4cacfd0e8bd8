//! Outgoing mail seam
//!
//! Handlers hand messages to a [`Mailer`]; the default [`LogMailer`] records
//! them in the log instead of talking to an SMTP relay.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// A single outgoing HTML message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Mailer that writes each message to the log
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            "Sending email"
        );
        debug!(body = %email.html, "Email body");
        Ok(())
    }
}

/// Activation message for a pending registration
pub fn activation_email(from: &str, to: &str, name: &str, client_url: &str, token: &str) -> Email {
    Email {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Account Activation Email".to_string(),
        html: format!(
            "<h2>Hello {name}.</h2>\n<p>Please click here to <a href=\"{client_url}/api/users/activate/{token}\" target=\"_blank\">activate your account</a></p>"
        ),
    }
}

/// Confirmation message for a pending password reset
pub fn reset_email(from: &str, to: &str, name: &str, client_url: &str, token: &str) -> Email {
    Email {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Password Reset Email".to_string(),
        html: format!(
            "<h2>Hello {name}.</h2>\n<p>Please click here to <a href=\"{client_url}/api/users/reset-password/{token}\" target=\"_blank\">reset your password</a></p>"
        ),
    }
}
