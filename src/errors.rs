#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("Configuration overrides must be a JSON object")]
    OverridesNotAnObject,

    #[error("Invalid modal position: {0} (expected \"left\" or \"right\")")]
    InvalidPosition(String),

    #[error("Cookie storage error: {0}")]
    Storage(#[source] anyhow::Error),
}
