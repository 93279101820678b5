use thiserror::Error;

/// Reasons a run refuses to start. No run state is touched when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unsupported URL scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme { scheme: String },
    #[error("Concurrency must be between 1 and {max}, got {value}")]
    InvalidConcurrency { value: u32, max: u32 },
    #[error("A run is already in progress")]
    AlreadyRunning,
    #[error("Failed to create HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}
