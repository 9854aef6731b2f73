//! Shared-password gate
//!
//! Exact comparison against the configured secret. There is no rate limiting
//! or lockout; an empty submission is only reported as missing.

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use super::session::SessionCookie;
use crate::types::{FormError, Result};

/// Default cookie lifetime in days
pub const DEFAULT_SESSION_DAYS: i64 = 30;

/// Longest cookie lifetime accepted from configuration
pub const MAX_SESSION_DAYS: i64 = 3650;

/// Password gate built once from configuration
#[derive(Clone)]
pub struct PasswordGate {
    secret: Option<Zeroizing<String>>,
    session_days: i64,
}

impl std::fmt::Debug for PasswordGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGate")
            .field("configured", &self.is_configured())
            .field("session_days", &self.session_days)
            .finish()
    }
}

impl PasswordGate {
    /// An empty secret counts as not configured
    pub fn new(secret: Option<String>, session_days: i64) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(Zeroizing::new),
            session_days,
        }
    }

    /// Whether a secret is configured at all
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check a submitted password
    ///
    /// Presence is checked before configuration so an empty submission is a
    /// validation error even on a misconfigured server.
    pub fn verify(&self, submitted: Option<&str>, now: DateTime<Utc>) -> Result<SessionCookie> {
        let submitted = match submitted {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Err(FormError::Validation("Password is required".into())),
        };

        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| FormError::Configuration("FORM_PASSWORD is not set".into()))?;

        if submitted == secret.as_str() {
            Ok(SessionCookie::issue(now, self.session_days))
        } else {
            Err(FormError::Authentication)
        }
    }
}
