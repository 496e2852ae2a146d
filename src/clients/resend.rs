use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EmailConfig;
use crate::domain::VerifyCode;
use crate::services::notification::{
    Mailer, NotificationError, OutgoingEmail, verification_email,
};

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Transactional email over the Resend HTTP API.
#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    config: EmailConfig,
}

impl ResendClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: EmailConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, NotificationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(NotificationError::NotConfigured)?;

        let body = SendEmailBody {
            from: &self.config.from_address,
            to: vec![&email.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        debug!("Sending email to {} from {}", email.to, self.config.from_address);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Resend rejected email: {}", body);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendEmailResponse = response.json().await?;
        Ok(sent.id)
    }
}

#[async_trait::async_trait]
impl Mailer for ResendClient {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &VerifyCode,
    ) -> Result<(), NotificationError> {
        let message = verification_email(email, username, code, &self.config.subject);
        let id = self.send(&message).await?;
        info!(
            email_id = id.as_deref().unwrap_or("unknown"),
            "Verification email sent to {}", email
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let client = ResendClient::with_shared_client(Client::new(), EmailConfig::default());
        let code = VerifyCode::generate();

        let err = client
            .send_verification_code("a@example.com", "alice", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::NotConfigured));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = EmailConfig {
            base_url: "https://api.resend.com/".to_string(),
            ..EmailConfig::default()
        };
        let client = ResendClient::with_shared_client(Client::new(), config);
        assert_eq!(client.endpoint(), "https://api.resend.com/emails");
    }

    #[test]
    fn body_serializes_recipient_list() {
        let body = SendEmailBody {
            from: "noreply@example.com",
            to: vec!["a@example.com"],
            subject: "s",
            html: "<p>h</p>",
            text: "t",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["from"], "noreply@example.com");
    }
}
