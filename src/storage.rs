//! Object-storage sinks.
//!
//! - `S3Sink`: uploads through `aws-sdk-s3`, configured from an S3 connection

mod s3;

pub use s3::{S3ConnectionSettings, S3Sink};
