//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the orchestrator expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No HTTP, audio or storage-engine types in any signature
//! - Providers must be callable concurrently (`Send + Sync`)
//! - Values crossing the persistence port are opaque bytes

pub mod kv_store;
pub mod news_source;
pub mod speech;

pub use kv_store::{KeyValueStore, StorageError};
pub use news_source::{FetchError, NewsSourcePort};
pub use speech::{SpeechEvent, SpeechPortError, SpeechSynthesisPort, Utterance, UtteranceControl};
