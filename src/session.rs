//! Navigation guard for the dashboard shell.
//!
//! The admin dashboard is a single-page client holding the access token in
//! local storage. Before every navigation it has to decide, from the token
//! alone, whether to proceed, bounce to the login view, or skip login entirely.
//! That decision procedure lives here as a pure state machine so the shell and
//! the tests share one implementation.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

/// The client-side route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Admin,
}

impl View {
    pub fn requires_auth(self) -> bool {
        matches!(self, View::Admin)
    }
}

/// Where a navigation attempt should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    RedirectToLogin,
    RedirectToAdmin,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// is_token_expired
///
/// Reads the token's `exp` claim without verifying the signature; the client
/// holds no signing secret. A token that cannot be decoded at all counts as
/// expired.
pub fn is_token_expired(token: &str, now_ts: i64) -> bool {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    // The comparison below is against the caller's clock, not the validator's.
    validation.validate_exp = false;

    match decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims.exp < now_ts,
        Err(_) => true,
    }
}

/// SessionStore
///
/// Facade over the client's token storage slot, plus the guard run before each
/// navigation. Transitions, in order: an expired stored token is purged; an
/// auth-required view without a token redirects to login; the login view with a
/// live token redirects to the admin view; anything else proceeds.
#[derive(Debug, Default)]
pub struct SessionStore {
    token: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    /// The guard, evaluated against the wall clock.
    pub fn navigate(&mut self, to: View) -> Navigation {
        self.navigate_at(to, Utc::now().timestamp())
    }

    /// The guard with an injectable clock.
    pub fn navigate_at(&mut self, to: View, now_ts: i64) -> Navigation {
        if let Some(token) = &self.token {
            if is_token_expired(token, now_ts) {
                self.token = None;
            }
        }

        if to.requires_auth() && self.token.is_none() {
            return Navigation::RedirectToLogin;
        }

        if to == View::Login && self.token.is_some() {
            return Navigation::RedirectToAdmin;
        }

        Navigation::Proceed
    }
}
