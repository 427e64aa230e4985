use resilient::ResilientError;

use crate::cache::CacheError;
use crate::config::ValidationError;
use crate::types::CourierId;

/// Why the users service could not provide profiles. Always recovered from by
/// reading the cache.
#[derive(thiserror::Error, Debug)]
pub enum RemoteFailure {
    #[error("no live servers for the users service")]
    NoServersAvailable,

    #[error("users service unreachable: {0}")]
    RemoteTransportFailure(#[source] ResilientError),

    #[error("users service answered with an error: {0}")]
    RemoteApplicationFailure(#[source] ResilientError),
}

impl From<ResilientError> for RemoteFailure {
    fn from(err: ResilientError) -> Self {
        match err {
            ResilientError::NoServersAvailable(_) => RemoteFailure::NoServersAvailable,
            err if err.is_application_failure() => RemoteFailure::RemoteApplicationFailure(err),
            // The body arrived but is not a list of profiles
            err @ ResilientError::Decode(_) => RemoteFailure::RemoteApplicationFailure(err),
            err => RemoteFailure::RemoteTransportFailure(err),
        }
    }
}

/// Why the cache could not stand in for the users service.
#[derive(thiserror::Error, Debug)]
pub enum FallbackFailure {
    #[error("no cached profile for couriers {missing:?}")]
    CacheMiss { missing: Vec<CourierId> },

    #[error("cached profile of courier {id} could not be decoded: {source}")]
    CacheDecodeFailure {
        id: CourierId,
        source: serde_json::Error,
    },

    #[error("cached profile under the key of courier {expected} belongs to courier {found}")]
    CacheEntryMismatch { expected: CourierId, found: CourierId },

    #[error("cache store failure: {0}")]
    CacheStoreFailure(#[from] CacheError),
}

/// Terminal outcome of an enrichment. The display text is deliberately the same
/// for every cause; the causes are kept for diagnostics.
#[derive(thiserror::Error, Debug)]
pub enum EnrichError {
    #[error("enrichment unavailable")]
    EnrichmentUnavailable {
        remote: RemoteFailure,
        #[source]
        fallback: FallbackFailure,
    },
}

/// Errors that stop the enrichment service from running.
#[derive(thiserror::Error, Debug)]
pub enum EnrichmentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),

    #[error("client error: {0}")]
    Client(#[from] ResilientError),
}
