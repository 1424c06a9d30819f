use serde::{Deserialize, Serialize};

use crate::email::EmailError;

pub const DEFAULT_API_URL: &str = "https://mandrillapp.com/api/";
pub const DEFAULT_API_VERSION: &str = "1.0";
pub const API_KEY_ENV: &str = "MANDRILL_API_KEY";
pub const DRY_RUN_API_KEY: &str = "dry-run";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
    /// Logs requests instead of sending them.
    Null,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MandrillConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for MandrillConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            api_version: default_api_version(),
            timeout_seconds: None,
            transport: TransportKind::Http,
            from_address: None,
            from_name: None,
            reply_to: None,
        }
    }
}

impl MandrillConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Switches to the null transport. A dry run sends nothing, so a blank
    /// key is replaced with a placeholder instead of failing the send.
    pub fn into_dry_run(mut self) -> Self {
        self.transport = TransportKind::Null;
        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            self.api_key = Some(DRY_RUN_API_KEY.to_string());
        }
        self
    }

    /// Looks the key up at call time: the configured value first, then
    /// `MANDRILL_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String, EmailError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }

        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(EmailError::ConfigError(format!(
                "no Mandrill API key configured; set mandrill.api_key or {}",
                API_KEY_ENV
            ))),
        }
    }

    pub fn format_from(&self) -> Option<String> {
        let address = self.from_address.as_ref()?;
        Some(match &self.from_name {
            Some(name) => format!("{} <{}>", name, address),
            None => address.clone(),
        })
    }
}
