//! Record types flowing from the Intercom API to the sink.
//!
//! This module holds the raw result shape returned by an API session, the tagged
//! Intercom object variants, and the normalized mapping every record becomes.

mod intercom_object;
mod raw_result;

// Re-export record types
pub use intercom_object::{IntercomObject, ObjectKind};
pub use raw_result::{NormalizedRecord, RawResult, ToMapping};
