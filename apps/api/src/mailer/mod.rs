//! Outbound notification delivery.
//!
//! `Mailer` is the seam handlers talk to; `SmtpMailer` is the lettre-backed
//! implementation built once at startup from `MailConfig`. Delivery is a
//! single attempt: no queue, no retries.

pub mod message;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::response::Code;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::MailConfig;
pub use message::Notification;

/// Coarse class of a delivery failure, used to pick the client-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    Connection,
    Other,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("SMTP server did not accept the connection")]
    Unreachable,

    #[error("SMTP error ({kind:?}): {message}")]
    Smtp { kind: FailureKind, message: String },
}

impl MailError {
    pub fn kind(&self) -> FailureKind {
        match self {
            MailError::Smtp { kind, .. } => *kind,
            MailError::Unreachable => FailureKind::Connection,
            _ => FailureKind::Other,
        }
    }

    fn from_smtp(err: lettre::transport::smtp::Error) -> Self {
        MailError::Smtp {
            kind: classify_reply(err.status().map(reply_code)),
            message: err.to_string(),
        }
    }
}

/// Three-digit reply number assembled from the code's digit enums.
fn reply_code(code: Code) -> u16 {
    code.severity as u16 * 100 + code.category as u16 * 10 + code.detail as u16
}

/// 530-535 are the SMTP authentication replies. No reply at all means the
/// failure happened below SMTP (DNS, TCP, TLS, timeout).
pub fn classify_reply(reply_code: Option<u16>) -> FailureKind {
    match reply_code {
        Some(530..=535) => FailureKind::Authentication,
        Some(_) => FailureKind::Other,
        None => FailureKind::Connection,
    }
}

/// Delivery seam. Carried in `AppState` as `Arc<dyn Mailer>`.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Checks the transport is reachable (and accepts our credentials).
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, notification: &Notification) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        if config.accept_invalid_certs {
            warn!(
                host = %config.smtp_host,
                "SMTP certificate validation is disabled"
            );
        }

        let tls_parameters = TlsParameters::builder(config.smtp_host.clone())
            .dangerous_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| MailError::Build(format!("TLS parameters: {e}")))?;
        // 465 is implicit TLS; everything else upgrades with STARTTLS when offered.
        let tls = if config.smtp_port == 465 {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
            config.smtp_host.as_str(),
        )
        .port(config.smtp_port)
        .tls(tls)
        .timeout(Some(config.timeout));

        if !config.smtp_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
            ));
        }

        let from = Mailbox::new(
            Some(config.from_name.clone()),
            parse_address(&config.from_email)?.email,
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn build_message(&self, notification: &Notification) -> Result<Message, MailError> {
        let attachment = &notification.attachment;
        let bytes = tokio::fs::read(&attachment.path).await?;
        let content_type = ContentType::parse(&attachment.mime_type)
            .map_err(|e| MailError::Build(format!("attachment content type: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(parse_address(&notification.to)?)
            .reply_to(parse_address(&notification.reply_to)?)
            .subject(notification.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(notification.html_body.clone()))
                    .singlepart(
                        Attachment::new(attachment.file_name.clone()).body(bytes, content_type),
                    ),
            )
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Unreachable),
            Err(e) => Err(MailError::from_smtp(e)),
        }
    }

    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let message = self.build_message(notification).await?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(MailError::from_smtp)?;
        debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}

fn parse_address(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// In-memory mailer for pipeline and router tests.
#[cfg(test)]
pub mod testing {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// What the recording mailer saw at the moment `send` was called.
    #[derive(Debug, Clone)]
    pub struct SentNotification {
        pub notification: Notification,
        pub attachment_path: PathBuf,
        pub attachment_bytes: Vec<u8>,
    }

    #[derive(Default, Clone)]
    pub struct RecordingMailer {
        sent: Arc<Mutex<Vec<SentNotification>>>,
        verify_calls: Arc<Mutex<usize>>,
        fail_verify: Option<FailureKind>,
        fail_send: Option<FailureKind>,
    }

    impl RecordingMailer {
        pub fn failing_verify(kind: FailureKind) -> Self {
            Self {
                fail_verify: Some(kind),
                ..Self::default()
            }
        }

        pub fn failing_send(kind: FailureKind) -> Self {
            Self {
                fail_send: Some(kind),
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<SentNotification> {
            self.sent.lock().expect("mailer mutex poisoned").clone()
        }

        pub fn verify_calls(&self) -> usize {
            *self.verify_calls.lock().expect("mailer mutex poisoned")
        }
    }

    fn failure(kind: FailureKind) -> MailError {
        MailError::Smtp {
            kind,
            message: format!("simulated {kind:?} failure"),
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn verify(&self) -> Result<(), MailError> {
            *self.verify_calls.lock().expect("mailer mutex poisoned") += 1;
            match self.fail_verify {
                Some(kind) => Err(failure(kind)),
                None => Ok(()),
            }
        }

        async fn send(&self, notification: &Notification) -> Result<(), MailError> {
            if let Some(kind) = self.fail_send {
                return Err(failure(kind));
            }
            let attachment_bytes = tokio::fs::read(&notification.attachment.path).await?;
            self.sent
                .lock()
                .expect("mailer mutex poisoned")
                .push(SentNotification {
                    notification: notification.clone(),
                    attachment_path: notification.attachment.path.clone(),
                    attachment_bytes,
                });
            Ok(())
        }
    }
}
