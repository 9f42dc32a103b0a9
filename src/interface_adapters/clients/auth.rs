use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entities::Identity;
use crate::domain::ports::IdentityProvider;

// Verified caller as reported by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: i64,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyTokenError {
    InvalidToken,
    SessionExpired,
    UpstreamUnavailable,
}

// Thin reqwest client for auth token verification.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, VerifyTokenError> {
        let url = format!("{}/auth/verify-token", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&VerifyTokenRequest { token })
            .send()
            .await
            .map_err(|_| VerifyTokenError::UpstreamUnavailable)?;

        if response.status().is_success() {
            return response
                .json::<VerifiedIdentity>()
                .await
                .map_err(|_| VerifyTokenError::UpstreamUnavailable);
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            let error = response
                .json::<ErrorResponse>()
                .await
                .map_err(|_| VerifyTokenError::UpstreamUnavailable)?;

            if error.message == "session expired" {
                return Err(VerifyTokenError::SessionExpired);
            }
            return Err(VerifyTokenError::InvalidToken);
        }

        Err(VerifyTokenError::UpstreamUnavailable)
    }
}

#[async_trait]
impl IdentityProvider for AuthClient {
    // Rejected tokens resolve to an anonymous caller; only transport failures are errors.
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, String> {
        match self.verify_token(token).await {
            Ok(verified) => Ok(Some(Identity {
                user_id: verified.user_id,
                display_name: verified.display_name,
            })),
            Err(VerifyTokenError::InvalidToken | VerifyTokenError::SessionExpired) => Ok(None),
            Err(VerifyTokenError::UpstreamUnavailable) => {
                Err("auth service unavailable".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_auth_service_is_unreachable_then_resolve_reports_an_error() {
        let client = AuthClient::new("http://127.0.0.1:9/", Duration::from_millis(200))
            .expect("expected client to build");

        let result = client.resolve("token").await;

        assert_eq!(result, Err("auth service unavailable".to_string()));
    }
}
