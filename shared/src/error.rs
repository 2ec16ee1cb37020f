use thiserror::Error;

/// Error kinds shared by every store implementation in `core-kernel`.
/// Deliberately store-agnostic: collaborators match on the variant, not on
/// the underlying `sqlx::Error`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("submission queue is full")]
    QueueFull,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
