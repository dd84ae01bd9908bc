//! Key-value persistence adapters implementing
//! [`newscast_core::KeyValueStore`].
//!
//! - [`InMemoryKvStore`] for tests and ephemeral sessions.
//! - [`JsonFileKvStore`] for a single JSON document on disk.

#![deny(unused_crate_dependencies)]

mod json_file;
mod memory;

pub use json_file::JsonFileKvStore;
pub use memory::InMemoryKvStore;
