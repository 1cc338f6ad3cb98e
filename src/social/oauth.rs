use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use super::{SocialClient, SocialError, http_client, rejected};
use crate::config::SocialConfig;

const SCOPES: &str = "tweet.read tweet.write users.read";

/// Authorization-code flow with PKCE (RFC 7636).
pub struct Authorizer {
    http: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

/// Outcome of the first phase. Carry it to [`Authorizer::complete_authorization`].
pub struct AuthorizationChallenge {
    /// Where the account owner approves access.
    pub authorization_url: String,
    pub state: String,
    code_verifier: String,
}

impl AuthorizationChallenge {
    pub fn state_matches(&self, returned_state: &str) -> bool {
        self.state == returned_state
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Authorizer {
    pub fn new(config: &SocialConfig) -> Result<Self, SocialError> {
        Ok(Self {
            http: http_client()?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            api_base: config.api_base.clone(),
        })
    }

    pub fn begin_authorization(&self) -> Result<AuthorizationChallenge, SocialError> {
        let code_verifier = random_urlsafe();
        let state = random_urlsafe();

        let url = Url::parse_with_params(
            &self.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPES),
                ("state", state.as_str()),
                ("code_challenge", code_challenge(&code_verifier).as_str()),
                ("code_challenge_method", "S256"),
            ],
        )?;

        Ok(AuthorizationChallenge {
            authorization_url: url.into(),
            state,
            code_verifier,
        })
    }

    /// Trade the code the account owner received for an access token.
    pub async fn complete_authorization(
        &self,
        challenge: AuthorizationChallenge,
        code: &str,
    ) -> Result<SocialClient, SocialError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", challenge.code_verifier.as_str()),
            ("client_id", self.client_id.as_str()),
        ];

        let mut req = self.http.post(&self.token_url).form(&form);
        if let Some(secret) = &self.client_secret {
            req = req.basic_auth(&self.client_id, Some(secret));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(rejected(status.as_u16(), resp).await);
        }

        let token: TokenResponse = resp.json().await?;
        tracing::info!("Social API authorization complete");

        Ok(SocialClient::with_access_token(
            self.http.clone(),
            &self.api_base,
            token.access_token,
        ))
    }

    /// As [`Self::complete_authorization`], first checking the `state` echoed back by the redirect.
    pub async fn complete_with_state(
        &self,
        challenge: AuthorizationChallenge,
        returned_state: &str,
        code: &str,
    ) -> Result<SocialClient, SocialError> {
        if !challenge.state_matches(returned_state) {
            return Err(SocialError::StateMismatch);
        }
        self.complete_authorization(challenge, code).await
    }
}

fn random_urlsafe() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
