//! Delivery of human-readable error reports.

use chrono::Local;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials, Message, SmtpTransport,
    Transport as _,
};
use telecast_log::log;

use crate::config::MailConfig;

/// Routes human-readable error reports to the configured SMTP recipient,
/// or to the log sink when no recipient is configured.
///
/// Transport-level failures (socket errors, authentication) downgrade to
/// logging, so reporting never takes the playout down.
#[derive(Debug)]
pub struct Notifier {
    mail: MailConfig,

    /// Capture sink used by tests; [`None`] in production.
    sink: Option<std::sync::Arc<std::sync::Mutex<Vec<String>>>>,
}

impl Notifier {
    /// Creates a new [`Notifier`] delivering via the given [`MailConfig`].
    #[inline]
    #[must_use]
    pub fn new(mail: MailConfig) -> Self {
        Self { mail, sink: None }
    }

    /// Creates a [`Notifier`] that only captures reports, along with the
    /// handle holding them.
    #[cfg(test)]
    pub(crate) fn capturing(
    ) -> (Self, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let notifier = Self {
            mail: MailConfig::default(),
            sink: Some(std::sync::Arc::clone(&sink)),
        };
        (notifier, sink)
    }

    /// Reports the given `message` and its `detail`.
    pub fn send(&self, message: &str, detail: &str) {
        if let Some(sink) = &self.sink {
            if let Ok(mut reports) = sink.lock() {
                reports.push(format!("{} {}", message, detail));
            }
            return;
        }

        if self.mail.recipient.is_empty() {
            log::error!("{} {}", message, detail);
            return;
        }

        if let Err(e) = self.send_mail(message, detail) {
            log::error!("Could not send email: {}", e);
            log::error!("{} {}", message, detail);
        }
    }

    /// Composes and sends one notification mail (STARTTLS, authenticated).
    fn send_mail(&self, message: &str, detail: &str) -> anyhow::Result<()> {
        let time = Local::now().format("%H:%M:%S");
        let email = Message::builder()
            .from(self.mail.sender_addr.parse()?)
            .to(self.mail.recipient.parse()?)
            .subject(self.mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(format!("{} {}\n{}", time, message, detail))?;

        let credentials = Credentials::new(
            self.mail.sender_addr.clone(),
            self.mail.sender_pass.clone(),
        );
        let mailer = SmtpTransport::starttls_relay(&self.mail.smtp_server)?
            .port(self.mail.port)
            .credentials(credentials)
            .build();

        drop(mailer.send(&email)?);
        Ok(())
    }
}
