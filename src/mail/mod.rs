//! Outbound SMTP mail.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use crate::config::SmtpConfig;

/// Mail failure, logged by the bus worker.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// SMTP mailer configured once at startup.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build a mailer from config; `None` when no host is configured.
    pub fn from_config(config: &SmtpConfig) -> Result<Option<Mailer>, MailError> {
        if config.host.is_empty() {
            return Ok(None);
        }

        let mut builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Some(Mailer {
            transport: builder.build(),
            from: config.from.parse()?,
        }))
    }

    /// Send the post-registration greeting carrying the user's external ID.
    pub async fn send_verification(
        &self,
        to: &str,
        name: &str,
        user_uuid: Uuid,
    ) -> Result<(), MailError> {
        let html = format!(
            "<p>Hello, {name}!</p>\n<p>Welcome to the site! your user Id is : {user_uuid}</p>"
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject("Hello")
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        let response = self.transport.send(message).await?;
        tracing::debug!(code = %response.code(), "Message sent");
        Ok(())
    }
}
