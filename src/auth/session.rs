//! Session cookie handling
//!
//! The cookie value is the whole session: `form_authenticated=true` means the
//! caller passed the gate. Nothing is stored server-side.

use chrono::{DateTime, Duration, Utc};
use hyper::header::{HeaderMap, COOKIE};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "form_authenticated";

/// The only value that counts as authenticated
const AUTHENTICATED_VALUE: &str = "true";

/// A session cookie ready to be sent in `Set-Cookie`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub expires: DateTime<Utc>,
}

impl SessionCookie {
    /// Cookie expiring `days` from `now`
    pub fn issue(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            expires: now + Duration::days(days),
        }
    }

    /// `Set-Cookie` header value
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Path=/; Expires={}; HttpOnly; Secure; SameSite=Strict",
            SESSION_COOKIE,
            AUTHENTICATED_VALUE,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT")
        )
    }
}

/// Look up a cookie value across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

/// Whether the request carries an authenticated session
pub fn is_authenticated(headers: &HeaderMap) -> bool {
    cookie_value(headers, SESSION_COOKIE) == Some(AUTHENTICATED_VALUE)
}
