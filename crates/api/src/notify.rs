//! Fee notifications over SMTP.

use std::sync::Arc;

use sodalis_core::fee::Notifier;
use sodalis_shared::{EmailService, OutgoingEmail};
use tracing::warn;

/// Sends fee notifications through the configured SMTP relay.
///
/// Returns "not queued" when email is disabled or the relay refuses the
/// message; the fee operation itself has already committed by then.
#[derive(Clone)]
pub struct SmtpNotifier {
    email: Arc<EmailService>,
}

impl SmtpNotifier {
    /// Creates a notifier over an email service.
    #[must_use]
    pub const fn new(email: Arc<EmailService>) -> Self {
        Self { email }
    }
}

impl Notifier for SmtpNotifier {
    async fn queue_or_send(&self, email: OutgoingEmail) -> bool {
        match self.email.send(&email).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, to = %email.to, "Failed to send notification");
                false
            }
        }
    }
}
