// ABOUTME: Contact form mail delivery over an authenticated STARTTLS SMTP session
// ABOUTME: Failures are reported as a boolean to the page; nothing is queued or retried

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::MailSettings;
use crate::forms::ContactForm;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("contact message has no sender email")]
    MissingEmail,

    #[error("SMTP credentials are not configured")]
    NotConfigured,

    #[error("invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl From<ContactForm> for ContactMessage {
    fn from(form: ContactForm) -> Self {
        Self {
            name: form.name,
            email: form.email,
            phone: form.phone,
            message: form.message,
        }
    }
}

impl ContactMessage {
    pub fn subject(&self) -> String {
        format!("Received message from {}", self.name)
    }

    pub fn body(&self) -> String {
        format!(
            "The message:\n\n{}\n\nContact info:\nEmail address: {}\nPhone number: {}",
            self.message, self.email, self.phone
        )
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<(), MailError>;
}

/// Delivers contact messages from the configured account to the fixed inbox.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    inbox: String,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let transport = if settings.is_configured() {
            let credentials =
                Credentials::new(settings.username.clone(), settings.password.clone());
            Some(
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
                    .port(settings.smtp_port)
                    .credentials(credentials)
                    .build(),
            )
        } else {
            tracing::warn!("SMTP credentials missing; contact form delivery is disabled");
            None
        };

        Ok(Self {
            transport,
            from: settings.username.clone(),
            inbox: settings.inbox.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &ContactMessage) -> Result<(), MailError> {
        let transport = self.transport.as_ref().ok_or(MailError::NotConfigured)?;

        let email = Message::builder()
            .from(self.from.parse::<Mailbox>()?)
            .to(self.inbox.parse::<Mailbox>()?)
            .subject(message.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body())?;

        transport.send(email).await?;
        Ok(())
    }
}

/// Sends the contact message, returning whether it went out.
pub async fn send_contact_message(mailer: &dyn Mailer, message: &ContactMessage) -> bool {
    if message.email.trim().is_empty() {
        tracing::info!("Contact message rejected: {}", MailError::MissingEmail);
        return false;
    }

    match mailer.send(message).await {
        Ok(()) => {
            tracing::info!(name = %message.name, "Contact message delivered");
            true
        }
        Err(err) => {
            tracing::warn!("Contact message failed: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMailer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for CountingMailer {
        async fn send(&self, _message: &ContactMessage) -> Result<(), MailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MailError::NotConfigured)
            } else {
                Ok(())
            }
        }
    }

    fn message(email: &str) -> ContactMessage {
        ContactMessage {
            name: "Grace".into(),
            email: email.into(),
            phone: "555-0100".into(),
            message: "Loved the compiler post".into(),
        }
    }

    #[tokio::test]
    async fn test_empty_email_never_sends() {
        let mailer = CountingMailer {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        assert!(!send_contact_message(&mailer, &message("")).await);
        assert!(!send_contact_message(&mailer, &message("   ")).await);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_result_reported() {
        let ok = CountingMailer {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        assert!(send_contact_message(&ok, &message("grace@example.com")).await);

        let failing = CountingMailer {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        assert!(!send_contact_message(&failing, &message("grace@example.com")).await);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_message_layout() {
        let msg = message("grace@example.com");
        assert_eq!(msg.subject(), "Received message from Grace");
        assert!(msg.body().contains("Loved the compiler post"));
        assert!(msg.body().contains("Email address: grace@example.com"));
        assert!(msg.body().contains("Phone number: 555-0100"));
    }

    #[tokio::test]
    async fn test_unconfigured_smtp_fails_softly() {
        let settings = MailSettings {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            inbox: String::new(),
        };
        let mailer = SmtpMailer::new(&settings).unwrap();

        assert!(!send_contact_message(&mailer, &message("grace@example.com")).await);
    }
}
