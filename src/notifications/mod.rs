//! Outbound email.

mod email;

pub use email::{render_invitation_email, render_magic_link_email, SmtpEmailSender};

use anyhow::Result;
use async_trait::async_trait;

/// Capability to deliver an email. Handlers call this seam; the SMTP
/// transport (or a test double) lives behind it.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> Result<()>;
}
