//! Notification fan-out
//!
//! One dispatch per enabled recipient and channel, all concurrent. A failed
//! dispatch is logged and never cancels its siblings or the pipeline step
//! that triggered it; the caller is only resumed once every dispatch has
//! completed.

pub mod chat;
pub mod email;

use std::sync::Arc;

use tracing::{error, info};

use crate::config::NotificationConfig;
use crate::errors::VolleyError;

pub use chat::{ChatPoster, WebhookPoster};
pub use email::{EmailSender, SmtpSender};

pub struct Notifier {
    config: NotificationConfig,
    email: Option<Arc<dyn EmailSender>>,
    chat: Arc<dyn ChatPoster>,
}

impl Notifier {
    /// Build the production notifier from the configuration document.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, VolleyError> {
        let email: Option<Arc<dyn EmailSender>> = match (&config.email.smtp, config.email.enable) {
            (Some(smtp), true) => Some(Arc::new(SmtpSender::new(smtp)?)),
            _ => None,
        };

        Ok(Self {
            config: config.clone(),
            email,
            chat: Arc::new(WebhookPoster::new()?),
        })
    }

    /// Construct with explicit senders. Test seam.
    pub fn with_senders(
        config: NotificationConfig,
        email: Option<Arc<dyn EmailSender>>,
        chat: Arc<dyn ChatPoster>,
    ) -> Self {
        Self {
            config,
            email,
            chat,
        }
    }

    /// Dispatch `message` to every enabled recipient and channel, once each,
    /// and wait for all dispatches to finish.
    pub async fn broadcast(&self, subject: &str, message: &str) {
        let mut handles = Vec::new();

        if self.config.email.enable {
            if let Some(sender) = &self.email {
                for recipient in &self.config.email.recipients {
                    let sender = Arc::clone(sender);
                    let recipient = recipient.clone();
                    let subject = subject.to_string();
                    let message = message.to_string();
                    handles.push(tokio::spawn(async move {
                        info!(recipient = %recipient, "sending mail");
                        if let Err(e) = sender.send(&recipient, &subject, &message).await {
                            error!(recipient = %recipient, error = %e, "cannot send mail");
                        }
                    }));
                }
            }
        }

        if self.config.chat.enable {
            for channel in &self.config.chat.channels {
                let poster = Arc::clone(&self.chat);
                let channel = channel.clone();
                let message = message.to_string();
                handles.push(tokio::spawn(async move {
                    info!(channel = %channel, "posting to chat channel");
                    if let Err(e) = poster.post(&channel, &message).await {
                        error!(channel = %channel, error = %e, "cannot post to chat channel");
                    }
                }));
            }
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}
