use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry exists for the presented identifier.
    #[error("session not found")]
    NotFound,
    /// The backend observed cancellation mid-operation instead of
    /// unwinding with the dropped future.
    #[error("store operation cancelled")]
    Cancelled,
    #[error("store backend failure")]
    Backend(#[from] BoxError),
}

/// Everything a [`SessionService`](crate::SessionService) operation can
/// fail with. Store and generator failures are never swallowed and never
/// retried; each is wrapped with the failing operation and returned.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The identifier resolves to no live session.
    #[error("no session for the presented identifier")]
    NotFound,
    #[error("failed to generate session id")]
    Generation(#[source] BoxError),
    #[error("failed to write session to the store")]
    StoreWrite(#[source] StoreError),
    #[error("failed to read session from the store")]
    StoreRead(#[source] StoreError),
    #[error("failed to delete session from the store")]
    StoreDelete(#[source] StoreError),
    #[error("failed to encode or decode session payload")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// The one failure callers are expected to branch on: "no session
    /// yet" as opposed to a backend problem.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound)
    }
}
