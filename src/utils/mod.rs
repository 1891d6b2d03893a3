//! Utility modules for the connector.

pub mod serialization;

// Re-export commonly used types
pub use serialization::{ndjson, SerializationError};
