// Session bootstrap - hosted login redirect, callback exchange, logout
use crate::application::identity_provider::IdentityProvider;
use crate::domain::session::Session;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Login attempts whose callback may still arrive.
const MAX_PENDING_LOGINS: usize = 8;

/// Query parameters the identity provider appends when redirecting back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// What the browser presented: its session id and the state of the login it
/// started, both carried in cookies.
#[derive(Debug, Clone, Default)]
pub struct BrowserCredentials {
    pub session_id: Option<String>,
    pub login_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// The browser already holds the session.
    Active(Session),
    /// A session was just obtained from the login callback. `session_id`
    /// identifies it to the browser from now on.
    Established { session: Session, session_id: String },
    /// No session and no callback: send the user to the hosted login. The
    /// browser must keep `state` to complete the login.
    RedirectToLogin { url: String, state: String },
    /// The provider came back but no session could be obtained. Do not
    /// redirect again or the browser loops between us and the provider.
    Failed(String),
}

struct ActiveSession {
    id: String,
    session: Session,
}

pub struct SessionService {
    identity: Arc<dyn IdentityProvider>,
    session: RwLock<Option<ActiveSession>>,
    pending_logins: Mutex<VecDeque<String>>,
}

impl SessionService {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            session: RwLock::new(None),
            pending_logins: Mutex::new(VecDeque::new()),
        }
    }

    /// The signed-in session, whoever holds it.
    pub async fn current(&self) -> Option<Session> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|active| active.session.clone())
    }

    /// The session, only if `session_id` is the one issued for it.
    pub async fn authenticate(&self, session_id: Option<&str>) -> Option<Session> {
        let session_id = session_id?;
        let guard = self.session.read().await;
        guard
            .as_ref()
            .filter(|active| active.id == session_id)
            .map(|active| active.session.clone())
    }

    pub async fn bootstrap(
        &self,
        params: &CallbackParams,
        credentials: &BrowserCredentials,
    ) -> BootstrapOutcome {
        if let Some(session) = self.authenticate(credentials.session_id.as_deref()).await {
            return BootstrapOutcome::Active(session);
        }

        if let Some(error) = &params.error {
            let detail = params.error_description.as_deref().unwrap_or(error);
            tracing::error!("Identity provider returned an error: {}", detail);
            return BootstrapOutcome::Failed(format!("Sign-in failed: {}", detail));
        }

        let Some(code) = &params.code else {
            let state = Uuid::new_v4().to_string();
            self.remember_login(state.clone()).await;
            tracing::info!("No session, redirecting to hosted login");
            return BootstrapOutcome::RedirectToLogin {
                url: self.identity.login_url(&state),
                state,
            };
        };

        if !self.claim_login(params.state.as_deref(), credentials.login_state.as_deref()).await {
            tracing::warn!("Rejecting login callback with an unknown state");
            return BootstrapOutcome::Failed(
                "Sign-in response does not match a login started from this browser.".to_string(),
            );
        }

        match self.establish(code).await {
            Ok(session) => {
                tracing::info!("Signed in as {}", session.user.username);
                let session_id = Uuid::new_v4().to_string();
                *self.session.write().await = Some(ActiveSession {
                    id: session_id.clone(),
                    session: session.clone(),
                });
                BootstrapOutcome::Established {
                    session,
                    session_id,
                }
            }
            Err(e) => {
                tracing::error!("Could not obtain a session from the callback: {:#}", e);
                BootstrapOutcome::Failed(
                    "Could not retrieve a token from the identity provider. \
                     Check the app client and token endpoint configuration."
                        .to_string(),
                )
            }
        }
    }

    async fn remember_login(&self, state: String) {
        let mut pending = self.pending_logins.lock().await;
        if pending.len() == MAX_PENDING_LOGINS {
            pending.pop_front();
        }
        pending.push_back(state);
    }

    /// A callback is accepted once, and only from the browser that started it.
    async fn claim_login(&self, returned: Option<&str>, expected: Option<&str>) -> bool {
        let (Some(returned), Some(expected)) = (returned, expected) else {
            return false;
        };
        if returned != expected {
            return false;
        }
        let mut pending = self.pending_logins.lock().await;
        match pending.iter().position(|state| state == returned) {
            Some(index) => {
                pending.remove(index);
                true
            }
            None => false,
        }
    }

    async fn establish(&self, code: &str) -> anyhow::Result<Session> {
        let tokens = self.identity.exchange_code(code).await?;
        let user = self.identity.fetch_user(&tokens).await?;
        Ok(Session { tokens, user })
    }

    /// Sign out globally. The in-memory session is discarded even when the
    /// provider call fails. Returns the provider's logout page.
    pub async fn logout(&self) -> String {
        let active = self.session.write().await.take();
        if let Some(ActiveSession { session, .. }) = active {
            if let Err(e) = self.identity.sign_out(&session.tokens).await {
                tracing::warn!("Global sign-out failed: {:#}", e);
            }
            tracing::info!("Signed out {}", session.user.username);
        }
        self.identity.logout_url()
    }
}
