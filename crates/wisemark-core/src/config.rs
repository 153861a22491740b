//! Runtime configuration.
//!
//! Built once at startup from the environment and passed to every component
//! that needs credentials. No other module reads process-wide environment
//! state; that keeps the scanner, normalizer, and codec testable in
//! isolation.

use std::env;

use crate::error::ConfigError;

/// Default API host. Override with `WISE_API_BASE`.
pub const DEFAULT_API_BASE: &str = "https://na-api.wiseapp.live";

/// Identity and endpoint configuration for the Wise API.
#[derive(Clone, Debug)]
pub struct WiseConfig {
    pub api_base: String,
    pub namespace: String,
    pub api_key: String,
    pub institute_id: String,
    pub basic_user: String,
    pub basic_pass: String,
    pub user_agent: String,
}

fn required(name: &'static str, missing: &mut Vec<String>) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

impl WiseConfig {
    /// Load configuration from the environment. Every missing required
    /// variable is reported in one error so the user fixes the `.env`
    /// file in a single pass.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();

        let api_key = required("WISE_API_KEY", &mut missing);
        let namespace = required("WISE_NAMESPACE", &mut missing);
        let institute_id = required("WISE_INSTITUTE_ID", &mut missing);
        let basic_user = required("WISE_BASIC_USER", &mut missing);
        let basic_pass = required("WISE_BASIC_PASS", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        Ok(Self {
            api_base: env::var("WISE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            namespace,
            api_key,
            institute_id,
            basic_user,
            basic_pass,
            user_agent: format!("wisemark/{}", env!("CARGO_PKG_VERSION")),
        })
    }
}
