// Identity session held in memory for the lifetime of the process
use super::preferences::{Label, Locale};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub attributes: BTreeMap<String, String>,
}

impl UserInfo {
    pub fn email(&self) -> Option<&str> {
        self.attributes.get("email").map(String::as_str)
    }

    pub fn display_email(&self, locale: Locale) -> String {
        self.email()
            .map(str::to_string)
            .unwrap_or_else(|| locale.label(Label::NoEmail).to_string())
    }

    /// First letter of the username, then of the email, upper-cased.
    pub fn avatar_initial(&self) -> char {
        self.username
            .chars()
            .next()
            .or_else(|| self.email().and_then(|e| e.chars().next()))
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('U')
    }
}

/// Tokens returned by the identity provider's code exchange.
#[derive(Clone, PartialEq)]
pub struct Tokens {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("id_token", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub tokens: Tokens,
    pub user: UserInfo,
}

impl Session {
    /// Bearer token used to authorize graph subscriptions.
    pub fn bearer(&self) -> &str {
        &self.tokens.id_token
    }
}
