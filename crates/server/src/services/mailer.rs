//! Transactional email delivery over SMTP.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. The payload
//! structs here double as the queue's stored payloads: fulfillment serializes
//! an [`OutboundEmail`] into the queue, and the queue worker deserializes it
//! back before rendering and sending.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::db::email_queue::EmailKind;

/// Payload for the welcome email sent after a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeEmail {
    /// Recipient address.
    pub to: String,
    /// Owner's display name.
    pub name: String,
    /// Salon name used throughout the copy.
    pub business_name: String,
    /// One-click auto-login URL (contains the short-lived token).
    pub login_url: String,
    /// How long the login link stays valid, for the copy.
    pub expires_minutes: i64,
}

/// Payload for the payment receipt email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptEmail {
    /// Recipient address.
    pub to: String,
    /// Owner's display name.
    pub name: String,
    /// Salon name.
    pub business_name: String,
    /// Formatted amount, e.g. `199.00 EUR`.
    pub amount: String,
    /// What was purchased.
    pub description: String,
}

/// A renderable outbound email, one variant per queue kind.
#[derive(Debug, Clone)]
pub enum OutboundEmail {
    Welcome(WelcomeEmail),
    Receipt(ReceiptEmail),
}

impl OutboundEmail {
    /// The queue kind this email is stored under.
    #[must_use]
    pub const fn kind(&self) -> EmailKind {
        match self {
            Self::Welcome(_) => EmailKind::Welcome,
            Self::Receipt(_) => EmailKind::Receipt,
        }
    }

    /// Recipient address.
    #[must_use]
    pub fn to(&self) -> &str {
        match self {
            Self::Welcome(email) => &email.to,
            Self::Receipt(email) => &email.to,
        }
    }

    /// Serialize for storage in the queue.
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be represented as JSON.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Welcome(email) => serde_json::to_value(email),
            Self::Receipt(email) => serde_json::to_value(email),
        }
    }

    /// Reconstruct from a stored queue row.
    ///
    /// # Errors
    ///
    /// Returns error if the stored payload does not match the kind's shape.
    pub fn from_parts(
        kind: EmailKind,
        payload: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        match kind {
            EmailKind::Welcome => WelcomeEmail::deserialize(payload).map(Self::Welcome),
            EmailKind::Receipt => ReceiptEmail::deserialize(payload).map(Self::Receipt),
        }
    }
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    business_name: &'a str,
    login_url: &'a str,
    expires_minutes: i64,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    business_name: &'a str,
    login_url: &'a str,
    expires_minutes: i64,
}

/// HTML template for the receipt email.
#[derive(Template)]
#[template(path = "email/receipt.html")]
struct ReceiptEmailHtml<'a> {
    name: &'a str,
    business_name: &'a str,
    amount: &'a str,
    description: &'a str,
}

/// Plain text template for the receipt email.
#[derive(Template)]
#[template(path = "email/receipt.txt")]
struct ReceiptEmailText<'a> {
    name: &'a str,
    business_name: &'a str,
    amount: &'a str,
    description: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailerError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Stored queue payload does not match its kind.
    #[error("Invalid stored payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// SMTP mailer for transactional email.
#[derive(Clone)]
pub struct Mailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    reply_to: Option<String>,
}

impl Mailer {
    /// Create a new mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            reply_to: config.reply_to.clone(),
        })
    }

    /// Render and send an outbound email.
    ///
    /// # Errors
    ///
    /// Returns error if rendering, message building, or SMTP delivery fails.
    pub async fn send(&self, email: &OutboundEmail) -> Result<(), MailerError> {
        match email {
            OutboundEmail::Welcome(welcome) => self.send_welcome(welcome).await,
            OutboundEmail::Receipt(receipt) => self.send_receipt(receipt).await,
        }
    }

    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError> {
        let html = WelcomeEmailHtml {
            name: &email.name,
            business_name: &email.business_name,
            login_url: &email.login_url,
            expires_minutes: email.expires_minutes,
        }
        .render()?;
        let text = WelcomeEmailText {
            name: &email.name,
            business_name: &email.business_name,
            login_url: &email.login_url,
            expires_minutes: email.expires_minutes,
        }
        .render()?;

        self.send_multipart_email(
            &email.to,
            "Welcome to Salonkit - your website is ready to set up",
            &text,
            &html,
        )
        .await
    }

    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), MailerError> {
        let html = ReceiptEmailHtml {
            name: &email.name,
            business_name: &email.business_name,
            amount: &email.amount,
            description: &email.description,
        }
        .render()?;
        let text = ReceiptEmailText {
            name: &email.name,
            business_name: &email.business_name,
            amount: &email.amount,
            description: &email.description,
        }
        .render()?;

        self.send_multipart_email(&email.to, "Your Salonkit payment receipt", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailerError> {
        let mut builder = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailerError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailerError::InvalidAddress(to.to_string()))?)
            .subject(subject);

        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(
                reply_to
                    .parse()
                    .map_err(|_| MailerError::InvalidAddress(reply_to.clone()))?,
            );
        }

        let email = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text_body.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.to_string()),
                ),
        )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn welcome() -> WelcomeEmail {
        WelcomeEmail {
            to: "anna@salon-muster.de".to_string(),
            name: "Anna Muster".to_string(),
            business_name: "Salon Muster".to_string(),
            login_url: "https://app.salonkit.dev/auth/auto-login?token=abc123".to_string(),
            expires_minutes: 15,
        }
    }

    fn receipt() -> ReceiptEmail {
        ReceiptEmail {
            to: "anna@salon-muster.de".to_string(),
            name: "Anna Muster".to_string(),
            business_name: "Salon Muster".to_string(),
            amount: "199.00 EUR".to_string(),
            description: "Website setup for Salon Muster".to_string(),
        }
    }

    #[test]
    fn test_welcome_templates_render_login_link() {
        let email = welcome();
        let html = WelcomeEmailHtml {
            name: &email.name,
            business_name: &email.business_name,
            login_url: &email.login_url,
            expires_minutes: email.expires_minutes,
        }
        .render()
        .unwrap();
        let text = WelcomeEmailText {
            name: &email.name,
            business_name: &email.business_name,
            login_url: &email.login_url,
            expires_minutes: email.expires_minutes,
        }
        .render()
        .unwrap();

        for body in [&html, &text] {
            assert!(body.contains("Anna Muster"));
            assert!(body.contains("Salon Muster"));
            assert!(body.contains("token=abc123"));
            assert!(body.contains("15"));
        }
    }

    #[test]
    fn test_receipt_templates_render_amount() {
        let email = receipt();
        let html = ReceiptEmailHtml {
            name: &email.name,
            business_name: &email.business_name,
            amount: &email.amount,
            description: &email.description,
        }
        .render()
        .unwrap();
        let text = ReceiptEmailText {
            name: &email.name,
            business_name: &email.business_name,
            amount: &email.amount,
            description: &email.description,
        }
        .render()
        .unwrap();

        for body in [&html, &text] {
            assert!(body.contains("199.00 EUR"));
            assert!(body.contains("Website setup for Salon Muster"));
        }
    }

    #[test]
    fn test_outbound_payload_roundtrip() {
        let original = OutboundEmail::Welcome(welcome());
        let payload = original.to_payload().unwrap();
        let restored = OutboundEmail::from_parts(EmailKind::Welcome, &payload).unwrap();

        assert_eq!(restored.kind(), EmailKind::Welcome);
        assert_eq!(restored.to(), "anna@salon-muster.de");
        let OutboundEmail::Welcome(restored) = restored else {
            panic!("wrong variant");
        };
        assert_eq!(restored.login_url, welcome().login_url);
    }

    #[test]
    fn test_mismatched_payload_kind_is_rejected() {
        let payload = OutboundEmail::Receipt(receipt()).to_payload().unwrap();
        // Receipt payloads lack the welcome shape's login_url
        assert!(OutboundEmail::from_parts(EmailKind::Welcome, &payload).is_err());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(OutboundEmail::Welcome(welcome()).kind(), EmailKind::Welcome);
        assert_eq!(OutboundEmail::Receipt(receipt()).kind(), EmailKind::Receipt);
    }
}
