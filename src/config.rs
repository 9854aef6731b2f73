//! Configuration for the declaration service
//!
//! CLI arguments and environment variable handling using clap. Parsed once at
//! startup; handlers receive the derived `PasswordGate` and `PageOptions`
//! instead of reading the environment themselves.

use clap::Parser;
use std::net::SocketAddr;

use crate::auth::{PasswordGate, MAX_SESSION_DAYS};
use crate::form::PageOptions;

/// Self-declaration form service
#[derive(Parser, Debug, Clone)]
#[command(name = "declaration-desk")]
#[command(about = "Fill, preview, sign and export the HoF self-declaration form")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Shared password that unlocks the form
    #[arg(long, env = "FORM_PASSWORD", hide_env_values = true)]
    pub form_password: Option<String>,

    /// Comma-separated origins allowed to call the API during development
    #[arg(long, env = "ALLOWED_DEV_ORIGINS")]
    pub allowed_dev_origins: Option<String>,

    /// Hosting platform domain list; the first entry is used when
    /// ALLOWED_DEV_ORIGINS is not set
    #[arg(long, env = "REPLIT_DOMAINS")]
    pub replit_domains: Option<String>,

    /// Require the password gate before the form is shown
    #[arg(long, env = "REQUIRE_AUTH", default_value = "true", action = clap::ArgAction::Set)]
    pub require_auth: bool,

    /// Offer signature image upload next to the drawing pad
    #[arg(long, env = "ALLOW_SIGNATURE_UPLOAD", default_value = "true", action = clap::ArgAction::Set)]
    pub allow_signature_upload: bool,

    /// Largest accepted signature upload in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "5242880")]
    pub max_upload_bytes: usize,

    /// Lifetime of the session cookie in days
    #[arg(long, env = "SESSION_DAYS", default_value = "30")]
    pub session_days: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Args {
    /// Origins echoed back in CORS headers
    ///
    /// Prefers ALLOWED_DEV_ORIGINS; otherwise the first REPLIT_DOMAINS entry.
    pub fn dev_origin_list(&self) -> Vec<String> {
        if let Some(ref origins) = self.allowed_dev_origins {
            return split_list(origins);
        }
        self.replit_domains
            .as_deref()
            .map(split_list)
            .and_then(|domains| domains.into_iter().next())
            .map(|domain| vec![domain])
            .unwrap_or_default()
    }

    /// Gate built from the configured secret
    pub fn password_gate(&self) -> PasswordGate {
        PasswordGate::new(self.form_password.clone(), self.session_days)
    }

    /// Page flags for the single form implementation
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            require_auth: self.require_auth,
            allow_signature_upload: self.allow_signature_upload,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.session_days <= 0 {
            return Err("SESSION_DAYS must be positive".to_string());
        }
        if self.session_days > MAX_SESSION_DAYS {
            return Err(format!("SESSION_DAYS must be at most {MAX_SESSION_DAYS}"));
        }

        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than zero".to_string());
        }

        match self.log_format.as_str() {
            "text" | "json" => {}
            other => return Err(format!("LOG_FORMAT must be text or json, got {other}")),
        }

        Ok(())
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
