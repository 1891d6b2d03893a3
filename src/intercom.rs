//! Intercom API session.
//!
//! - `Resource` / `Method`: the resources and methods the session can invoke
//! - `IntercomSession`: authenticated HTTP session implementing [`ApiSession`](crate::ApiSession)

mod resource;
mod session;

pub use resource::{Method, Resource};
pub use session::IntercomSession;
