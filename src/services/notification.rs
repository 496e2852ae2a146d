//! Outbound notifications for the verification workflow.
//!
//! Delivery is best effort: callers persist state first and report a failed
//! send without rolling anything back.

use thiserror::Error;

use crate::domain::VerifyCode;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Email service not configured. Please contact support.")]
    NotConfigured,

    #[error("Email provider rejected the message (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Email delivery failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A rendered email ready for a transactional provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Sends verification codes to users.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &VerifyCode,
    ) -> Result<(), NotificationError>;
}

/// Builds the verification email body.
#[must_use]
pub fn verification_email(
    email: &str,
    username: &str,
    code: &VerifyCode,
    subject: &str,
) -> OutgoingEmail {
    let text = format!(
        "Hello {username},\n\nThank you for registering. Please use the following verification code to complete your registration:\n\n{code}\n\nThe code expires in one hour. If you did not request this code, please ignore this email.\n"
    );

    let html = format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Verification Code</title></head>\
<body style=\"font-family: Roboto, Verdana, sans-serif\">\
<h2>Hello {name},</h2>\
<p>Thank you for registering. Please use the following verification code to complete your registration:</p>\
<p style=\"font-size: 24px; letter-spacing: 4px\"><strong>{code}</strong></p>\
<p>The code expires in one hour. If you did not request this code, please ignore this email.</p>\
</body></html>",
        name = html_escape::encode_text(username),
    );

    OutgoingEmail {
        to: email.to_string(),
        subject: subject.to_string(),
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_contains_code_and_escaped_username() {
        let code = VerifyCode::generate();
        let email = verification_email("a@example.com", "<bob>", &code, "Subject");

        assert_eq!(email.to, "a@example.com");
        assert!(email.html.contains(code.as_str()));
        assert!(email.text.contains(code.as_str()));
        assert!(email.html.contains("&lt;bob&gt;"));
        assert!(!email.html.contains("<bob>"));
    }
}
