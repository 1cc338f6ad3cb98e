//! Posting store announcements to a social network.
//!
//! Nothing here is global. Authorization is an explicit two-step exchange
//! ([`Authorizer::begin_authorization`] then [`Authorizer::complete_authorization`])
//! that yields an owned [`SocialClient`] for callers to pass around.

pub mod oauth;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub use oauth::{AuthorizationChallenge, Authorizer};

pub const MAX_STATUS_CHARS: usize = 280;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("API rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("status text is empty")]
    EmptyStatus,
    #[error("status text exceeds {MAX_STATUS_CHARS} characters")]
    StatusTooLong,
    #[error("authorization state does not match")]
    StateMismatch,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostedStatus {
    pub id: String,
    pub text: String,
}

#[derive(Deserialize)]
struct PostEnvelope {
    data: PostedStatus,
}

pub fn http_client() -> Result<reqwest::Client, SocialError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?)
}

/// An authorized API client. Cheap to clone.
#[derive(Clone)]
pub struct SocialClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl fmt::Debug for SocialClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialClient")
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl SocialClient {
    pub fn with_access_token(
        http: reqwest::Client,
        api_base: &str,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub async fn post_status(&self, text: &str) -> Result<PostedStatus, SocialError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SocialError::EmptyStatus);
        }
        if text.chars().count() > MAX_STATUS_CHARS {
            return Err(SocialError::StatusTooLong);
        }

        let resp = self
            .http
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(rejected(status.as_u16(), resp).await);
        }

        let envelope: PostEnvelope = resp.json().await?;
        tracing::info!(status_id = %envelope.data.id, "Status posted");
        Ok(envelope.data)
    }
}

async fn rejected(status: u16, resp: reqwest::Response) -> SocialError {
    let body = resp
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(1024)
        .collect::<String>();
    SocialError::Rejected { status, body }
}

/// Announcement text for a newly listed product, clipped to the status limit.
pub fn product_announcement(name: &str, price: &str) -> String {
    let text = format!("New in store: {name} for {price}");
    if text.chars().count() <= MAX_STATUS_CHARS {
        return text;
    }
    let mut clipped: String = text.chars().take(MAX_STATUS_CHARS - 1).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcement_is_clipped() {
        assert_eq!(
            product_announcement("Mug", "4.50"),
            "New in store: Mug for 4.50"
        );
        let long = "x".repeat(400);
        let text = product_announcement(&long, "1.00");
        assert_eq!(text.chars().count(), MAX_STATUS_CHARS);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn debug_hides_access_token() {
        let client = SocialClient::with_access_token(
            reqwest::Client::new(),
            "http://localhost/",
            "secret-token",
        );
        let printed = format!("{client:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("http://localhost"));
    }

    #[tokio::test]
    async fn empty_and_oversized_statuses_are_rejected_locally() {
        let client =
            SocialClient::with_access_token(reqwest::Client::new(), "http://127.0.0.1:9", "t");
        assert!(matches!(
            client.post_status("   ").await,
            Err(SocialError::EmptyStatus)
        ));
        assert!(matches!(
            client.post_status(&"y".repeat(MAX_STATUS_CHARS + 1)).await,
            Err(SocialError::StatusTooLong)
        ));
    }
}
