//! Error types for the core crate.

/// Startup configuration failures. Fatal: the caller reports once and
/// exits before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),
}
