use reqwest::StatusCode;

/// Why a single attempt against one server did not succeed.
#[derive(thiserror::Error, Debug)]
pub enum AttemptFailure {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The server answered, but the fail predicate classified the response as a failure.
    #[error("response rejected with status {0}")]
    Rejected(StatusCode),
}

#[derive(thiserror::Error, Debug)]
pub enum ResilientError {
    #[error("no live servers for service {0}")]
    NoServersAvailable(String),

    #[error("retries exhausted after {attempts} attempts, last failure: {last}")]
    RetriesExhausted { attempts: u32, last: AttemptFailure },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ResilientError {
    /// True when the last attempt reached a server that answered with a rejected response.
    pub fn is_application_failure(&self) -> bool {
        matches!(
            self,
            ResilientError::RetriesExhausted {
                last: AttemptFailure::Rejected(_),
                ..
            }
        )
    }
}
