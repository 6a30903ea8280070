//! Email dispatch over SMTP

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::errors::VolleyError;

/// Sends one email to one recipient.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), VolleyError>;
}

/// Production sender over the configured SMTP endpoint.
///
/// The SMTP user doubles as the From address.
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(smtp: &SmtpConfig) -> Result<Self, VolleyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| VolleyError::NotificationError(e.to_string()))?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.pass.clone()))
            .build();

        let from = smtp
            .user
            .parse()
            .map_err(|_| VolleyError::NotificationError(format!("invalid From address: {}", smtp.user)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), VolleyError> {
        let to: Mailbox = to
            .parse()
            .map_err(|_| VolleyError::NotificationError(format!("invalid recipient: {}", to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| VolleyError::NotificationError(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| VolleyError::NotificationError(e.to_string()))?;

        Ok(())
    }
}
