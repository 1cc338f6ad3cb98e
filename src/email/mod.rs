pub mod templates;

use async_trait::async_trait;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// A rendered message with plain-text and HTML bodies.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn password_reset(to_email: &str, username: &str, reset_url: &str, valid_minutes: i64) -> Self {
        Self {
            to: to_email.to_string(),
            subject: "Password Reset - Shopfront".to_string(),
            text: templates::password_reset_text(username, reset_url, valid_minutes),
            html: templates::render_password_reset(username, reset_url, valid_minutes),
        }
    }
}

/// Outbound email. Delivery failures are reported, never retried.
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), String>;
}

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailChannel for SystemMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(email.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}
