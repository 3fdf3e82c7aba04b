//! Core type definitions for schoolbase.
//!
//! This crate defines the record-shape-agnostic types shared by the storage
//! and sync layers:
//! - [`Record`]: an opaque JSON object with a required string `id`
//! - [`CollectionSpec`] / [`CollectionRegistry`]: the named collections the
//!   school tracks, with their remote table names and local storage keys
//!
//! Domain shapes (students, marks, fee payments, ...) are owned by the UI
//! layer and never interpreted here.

mod collection;
mod record;

pub use collection::{CollectionRegistry, CollectionSpec, LOCAL_KEY_PREFIX};
pub use record::Record;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no `id` attribute")]
    MissingId,

    #[error("record id must be a non-empty string, got {0}")]
    InvalidId(String),

    #[error("collection registered twice: {0}")]
    DuplicateCollection(String),
}
