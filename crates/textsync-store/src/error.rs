use textsync_core::StoreFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("no active project configured")]
    NoActiveProject,

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid stored status: {0}")]
    Status(#[from] textsync_core::UnknownStatus),

    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for StoreFailure {
    fn from(e: StoreError) -> Self {
        StoreFailure(e.to_string())
    }
}
