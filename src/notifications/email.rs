//! SMTP email delivery for magic links and invitations.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::EmailSender;
use crate::config::EmailConfig;

/// Sends email over SMTP using the configuration from the main config
/// file. When SMTP is not configured, sends become warn-and-skip no-ops
/// so local setups work without a mail server.
pub struct SmtpEmailSender {
    config: EmailConfig,
}

impl SmtpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping message to {}", to);
            return Ok(());
        }

        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from_mailbox = format!("{} <{}>", self.config.from_name, from_address);
        let from: Mailbox = from_mailbox.parse()?;
        let to_mailbox: Mailbox = to.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
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

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Sent email");
        Ok(())
    }
}

/// Render the magic-link login email: (subject, text body, html body)
pub fn render_magic_link_email(login_url: &str, ttl_hours: i64) -> (String, String, String) {
    let subject = "Your sign-in link".to_string();

    let text = format!(
        "Use the link below to sign in. It can be used once and expires in {} hours.\n\n{}\n\n\
         If you did not request this, you can ignore this email.",
        ttl_hours, login_url
    );

    let html = format!(
        "<p>Use the link below to sign in. It can be used once and expires in {} hours.</p>\
         <p><a href=\"{}\">Sign in</a></p>\
         <p>If you did not request this, you can ignore this email.</p>",
        ttl_hours, login_url
    );

    (subject, text, html)
}

/// Render the invitation email: (subject, text body, html body)
pub fn render_invitation_email(
    first_name: &str,
    accept_url: &str,
    expires_in_days: i64,
) -> (String, String, String) {
    let subject = "You've been invited to an assessment".to_string();

    let text = format!(
        "Hi {},\n\nYour manager has invited you to take part in an assessment. \
         Follow the link below to set up your account. The invitation expires in {} days.\n\n{}",
        first_name, expires_in_days, accept_url
    );

    let html = format!(
        "<p>Hi {},</p>\
         <p>Your manager has invited you to take part in an assessment. \
         Follow the link below to set up your account. The invitation expires in {} days.</p>\
         <p><a href=\"{}\">Accept invitation</a></p>",
        first_name, expires_in_days, accept_url
    );

    (subject, text, html)
}
