//! Content-addressed payload storage for the PoD commitment core.
//!
//! Bulky payloads (message bodies, profile metadata) live here instead of on
//! the ledger. Every payload is keyed by its content digest; the ledger only
//! ever sees the digest.
//!
//! # Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - [`HttpContentStore`] -- client for the `/objects` + `/pins` HTTP service,
//!   with bounded retries and a verified-only response cache
//!
//! # Design Rules
//!
//! 1. Records are immutable; a change is a new digest and a new record.
//! 2. `put` is idempotent and dedupes by digest, so identical bytes are
//!    stored and billed once.
//! 3. Nothing is reclaimed unless it was explicitly unpinned.
//! 4. Transport failures are retried inside the client; `NotFound` is not.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod record;
pub mod traits;

pub use config::{RetryPolicy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use http::HttpContentStore;
pub use memory::{InMemoryContentStore, PinState};
pub use record::{ContentRecord, MessageContent, ParticipantMetadata};
pub use traits::{ContentStore, ContentStoreExt};
