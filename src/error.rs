use crate::store::StoreHandle;
use thiserror::Error;

/// Failures raised by the caching layer itself. Errors coming from a wrapped store are never
/// translated into this type, they are handed back to the caller as the store produced them.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("store {handle} is already cached with a value type other than {expected}")]
    ValueTypeMismatch {
        handle: StoreHandle,
        expected: &'static str,
    },

    #[error("unsupported cache key type: {type_name}")]
    UnsupportedKey { type_name: &'static str },

    #[error("failed to create store {handle}: {source}")]
    CreateStore {
        handle: StoreHandle,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid memory caching configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the bundled file-backed store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
