//! Outgoing mail.
//!
//! Mail is delivered by a background task fed through a bounded
//! channel. Enqueueing never blocks a request handler, and delivery
//! failures are logged rather than surfaced: losing a mail must not
//! fail the operation that triggered it.

use chirp_common::config::MailConfig;
use chirp_db::entities::user;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tokio::sync::mpsc;

/// Pending outgoing mails beyond this are dropped with a warning.
const MAIL_QUEUE_CAPACITY: usize = 64;

/// A plain-text mail waiting for delivery.
#[derive(Debug)]
pub struct OutgoingMail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

/// Handle for enqueueing outgoing mail.
#[derive(Clone)]
pub struct Mailer {
    tx: Option<mpsc::Sender<OutgoingMail>>,
    admin_address: Option<String>,
}

impl Mailer {
    /// Start the delivery task and return a handle to it.
    ///
    /// Without mail configuration the handle is inert: enqueued mail is
    /// dropped with a log line.
    #[must_use]
    pub fn spawn(config: Option<MailConfig>) -> Self {
        let Some(config) = config else {
            tracing::info!("Mail is not configured, outgoing mail disabled");
            return Self::disabled();
        };

        let transport = match build_transport(&config) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Invalid mail configuration, outgoing mail disabled");
                return Self::disabled();
            }
        };

        let from: Mailbox = match config.from_address.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "Invalid mail from address, outgoing mail disabled");
                return Self::disabled();
            }
        };

        let (tx, rx) = mpsc::channel(MAIL_QUEUE_CAPACITY);
        tokio::spawn(deliver_loop(rx, transport, from));

        Self {
            tx: Some(tx),
            admin_address: config.admin_address,
        }
    }

    /// Create a handle that drops all mail. For tests and tools.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            tx: None,
            admin_address: None,
        }
    }

    /// Whether a delivery task is running.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a mail for delivery. Never blocks; a full queue drops the
    /// mail with a warning.
    pub fn enqueue(&self, mail: OutgoingMail) {
        let Some(tx) = &self.tx else {
            tracing::debug!(to = %mail.to, "Mail disabled, dropping mail");
            return;
        };

        if let Err(e) = tx.try_send(mail) {
            tracing::warn!(error = %e, "Mail queue full, dropping mail");
        }
    }

    /// Queue a password-reset mail carrying a signed token link.
    pub fn send_password_reset(&self, user: &user::Model, token: &str, public_url: &str) {
        let (subject, body) = render_password_reset(&user.username, token, public_url);
        self.enqueue(OutgoingMail {
            to: user.email.clone(),
            subject,
            body,
        });
    }

    /// Queue a server-error notification to the admin address, if one
    /// is configured.
    pub fn send_error_report(&self, method: &str, path: &str, status: u16) {
        let Some(to) = &self.admin_address else {
            return;
        };

        let (subject, body) = render_error_report(method, path, status);
        self.enqueue(OutgoingMail {
            to: to.clone(),
            subject,
            body,
        });
    }
}

fn build_transport(
    config: &MailConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
    let mut builder = if config.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
    };

    builder = builder.port(config.port);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}

async fn deliver_loop(
    mut rx: mpsc::Receiver<OutgoingMail>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
) {
    while let Some(mail) = rx.recv().await {
        let to: Mailbox = match mail.to.parse() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(to = %mail.to, error = %e, "Invalid recipient address, dropping mail");
                continue;
            }
        };

        let message = Message::builder()
            .from(from.clone())
            .to(to)
            .subject(&mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body);

        match message {
            Ok(message) => {
                if let Err(e) = transport.send(message).await {
                    tracing::warn!(to = %mail.to, error = %e, "Failed to deliver mail");
                } else {
                    tracing::debug!(to = %mail.to, subject = %mail.subject, "Mail delivered");
                }
            }
            Err(e) => {
                tracing::warn!(to = %mail.to, error = %e, "Failed to build mail");
            }
        }
    }
}

/// Render the password-reset mail.
fn render_password_reset(username: &str, token: &str, public_url: &str) -> (String, String) {
    let link = format!("{public_url}/auth/reset_password/{token}");
    let subject = "[Chirp] Reset Your Password".to_string();
    let body = format!(
        "Dear {username},\n\n\
        To reset your password, follow this link:\n\n\
        {link}\n\n\
        If you have not requested a password reset, simply ignore this message.\n\n\
        Sincerely,\n\n\
        The Chirp Team"
    );
    (subject, body)
}

/// Render the admin notification for a failed request.
fn render_error_report(method: &str, path: &str, status: u16) -> (String, String) {
    let subject = "[Chirp] Server Error".to_string();
    let body = format!(
        "A request failed with status {status}.\n\n\
        Method: {method}\n\
        Path: {path}\n"
    );
    (subject, body)
}
