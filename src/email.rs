use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

/// Thin client for the transactional email API. Used for checkout
/// fulfillment and lead-capture confirmations.
pub struct EmailClient {
    client: reqwest::Client,
    api_key: String,
    sender: String,
}

impl EmailClient {
    const API_URL: &'static str = "https://api.resend.com/emails";

    pub fn new(api_key: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sender,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(Self::API_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.sender,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("email API unreachable")?;

        let status = response.status();

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(anyhow!("email delivery failed ({}): {}", status, body));
        }

        Ok(())
    }
}
