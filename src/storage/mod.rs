//! # Key-value storage abstraction
//!
//! The session store persists unacknowledged messages through a minimal
//! byte-keyed contract, [`KeyValueStore`]. Backing technology is up to the
//! implementor: flash pages, an embedded database or, with the `std` feature,
//! one file per record ([`FileStore`]).
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────┐
//! │ Delivery Engine │
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐    records: crc32 | sequence | encoded frame
//! │  Session Store  │
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────────┐
//! │               KeyValueStore                 │
//! │  ┌─────────────┐          ┌──────────────┐  │
//! │  │ MemoryStore │          │  FileStore   │  │
//! │  └─────────────┘          └──────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage Examples
//!
//! ```rust
//! use libmqtt::storage::{KeyValueStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! store.put(b"client/1", b"record").unwrap();
//! assert_eq!(store.get(b"client/1").unwrap().as_deref(), Some(&b"record"[..]));
//! assert_eq!(store.keys(b"client/").unwrap().len(), 1);
//! store.remove(b"client/1").unwrap();
//! assert!(store.get(b"client/1").unwrap().is_none());
//! ```

/// Common error types for storage operations
pub mod error;

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "std")]
mod file;
#[cfg(feature = "std")]
pub use file::FileStore;

pub use error::Error;

use alloc::vec::Vec;

/// Durable byte-keyed storage.
///
/// Implementations must make a completed `put` or `remove` visible to every
/// later call, and durable no later than the next [`flush`](Self::flush).
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` - Key present
    /// * `Ok(None)` - Key absent
    /// * `Err(error)` - The store could not be read
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Insert or replace the value under `key`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error>;

    /// Delete `key`. Deleting an absent key succeeds.
    fn remove(&mut self, key: &[u8]) -> Result<(), Error>;

    /// Every key starting with `prefix`, in ascending byte order.
    fn keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, Error>;

    /// Block until every completed write is durable.
    fn flush(&mut self) -> Result<(), Error>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        (**self).get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        (**self).put(key, value)
    }

    fn remove(&mut self, key: &[u8]) -> Result<(), Error> {
        (**self).remove(key)
    }

    fn keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        (**self).keys(prefix)
    }

    fn flush(&mut self) -> Result<(), Error> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests;
