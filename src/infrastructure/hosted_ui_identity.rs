// Hosted-UI identity provider (OAuth2 authorization-code flow, Cognito-style endpoints)
use crate::application::identity_provider::IdentityProvider;
use crate::domain::session::{Tokens, UserInfo};
use crate::infrastructure::config::IdentitySettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct HostedUiIdentity {
    client: reqwest::Client,
    domain: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    logout_uri: String,
    scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl HostedUiIdentity {
    pub fn new(settings: IdentitySettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            domain: settings.domain.trim_end_matches('/').to_string(),
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            redirect_uri: settings.redirect_uri,
            logout_uri: settings.logout_uri,
            scopes: settings.scopes,
        }
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.domain, path);
        let mut request = self.client.post(&url).form(form);
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret));
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", path, status, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for HostedUiIdentity {
    fn login_url(&self, state: &str) -> String {
        format!(
            "{}/oauth2/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    fn logout_url(&self) -> String {
        format!(
            "{}/logout?client_id={}&logout_uri={}",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.logout_uri),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        let response = self
            .post_form(
                "/oauth2/token",
                &[
                    ("grant_type", "authorization_code"),
                    ("client_id", self.client_id.as_str()),
                    ("code", code),
                    ("redirect_uri", self.redirect_uri.as_str()),
                ],
            )
            .await?;

        let tokens = response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")?;

        Ok(Tokens {
            id_token: tokens.id_token,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    async fn fetch_user(&self, tokens: &Tokens) -> Result<UserInfo> {
        let url = format!("{}/oauth2/userInfo", self.domain);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&tokens.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send userInfo request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("userInfo failed with status {}: {}", status, body);
        }

        let claims = response
            .json::<BTreeMap<String, Value>>()
            .await
            .context("Failed to parse userInfo response")?;
        Ok(user_from_claims(claims))
    }

    async fn sign_out(&self, tokens: &Tokens) -> Result<()> {
        // Revoking the refresh token invalidates every token issued from it
        let Some(refresh_token) = &tokens.refresh_token else {
            tracing::debug!("No refresh token to revoke");
            return Ok(());
        };
        self.post_form(
            "/oauth2/revoke",
            &[("token", refresh_token.as_str()), ("client_id", self.client_id.as_str())],
        )
        .await?;
        Ok(())
    }
}

/// Keep scalar claims as strings; nested values are dropped.
fn user_from_claims(claims: BTreeMap<String, Value>) -> UserInfo {
    let attributes: BTreeMap<String, String> = claims
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect();

    let username = ["username", "cognito:username", "preferred_username", "sub"]
        .iter()
        .find_map(|key| attributes.get(*key).cloned())
        .unwrap_or_default();

    UserInfo {
        username,
        attributes,
    }
}
