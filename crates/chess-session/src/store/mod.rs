//! [`CheckpointStore`](crate::CheckpointStore) implementations.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::checkpoint::CheckpointError;

/// Accepts ids made of ASCII letters, digits, `-` and `_`.
///
/// File and database stores use the id as a key, so anything else is
/// refused before it reaches the backend.
pub(crate) fn check_id(id: &str) -> Result<(), CheckpointError> {
    let valid = !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(CheckpointError::InvalidId(id.to_string()))
    }
}
