mod memory;

pub use memory::MemoryStore;

use crate::{error::StoreError, id::SessionId};

/// Persistence backend for serialized session payloads, keyed by session
/// identifier.
///
/// The store never sees the payload type: the service hands it
/// JSON-encoded bytes and decodes what [`load`](SessionStore::load)
/// returns, so one store handle can back services with different payload
/// types. Implementations must be safe under concurrent access on their
/// own — the service's lock orders its read-modify-write sequences, it
/// does not protect the store's internals.
///
/// Operations are futures and dropping one is the cancellation signal.
/// A backend that detects cancellation mid-I/O should surface
/// [`StoreError::Cancelled`] rather than block.
pub trait SessionStore: Send + Sync + 'static {
    /// Creates the entry for `id`.
    ///
    /// Whether an existing entry is overwritten or rejected is
    /// implementation-defined and must be documented. [`MemoryStore`]
    /// overwrites unconditionally.
    fn create(
        &self,
        id: &SessionId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the serialized payload for `id`, or
    /// [`StoreError::NotFound`] when no entry exists.
    fn load(&self, id: &SessionId) -> impl Future<Output = Result<Vec<u8>, StoreError>> + Send;

    /// Replaces the entry for `id`, creating it when absent. An upsert:
    /// unlike [`load`](SessionStore::load), absence is not an error
    /// here.
    fn save(
        &self,
        id: &SessionId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the entry for `id`. Removing an absent entry succeeds.
    fn delete(&self, id: &SessionId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
