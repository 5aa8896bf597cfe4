// Port for the hosted identity provider (OAuth2 / OIDC authorization-code flow)
use crate::domain::session::{Tokens, UserInfo};
use async_trait::async_trait;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Hosted login page the browser is redirected to when there is no session.
    /// `state` is echoed back on the callback.
    fn login_url(&self, state: &str) -> String;

    /// Hosted logout page that clears the provider's own session cookie.
    fn logout_url(&self) -> String;

    /// Exchange the authorization code from the login callback for tokens.
    async fn exchange_code(&self, code: &str) -> anyhow::Result<Tokens>;

    /// Fetch the signed-in user's name and attributes.
    async fn fetch_user(&self, tokens: &Tokens) -> anyhow::Result<UserInfo>;

    /// Invalidate the session globally at the provider.
    async fn sign_out(&self, tokens: &Tokens) -> anyhow::Result<()>;
}
