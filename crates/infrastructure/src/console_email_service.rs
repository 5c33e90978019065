//! Console email adapter for development. Emails are logged, never sent.

use async_trait::async_trait;
use crewdeck_application::EmailService;
use crewdeck_core::AppResult;
use tracing::info;

/// Writes outgoing email to the tracing output instead of delivering it.
///
/// Selected with `EMAIL_PROVIDER=console`; the emailed invite links still
/// work because the full text body, accept link included, lands in the log.
#[derive(Clone, Default)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates the console adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(
            to,
            subject,
            has_html = html_body.is_some(),
            "outgoing email\n{text_body}"
        );
        Ok(())
    }
}
