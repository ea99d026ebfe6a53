use thiserror::Error;

/// Errors raised while configuring or constructing the client
#[derive(Error, Debug)]
pub enum AzdoError {
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
