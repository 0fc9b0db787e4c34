//! Data models for the network inspector
//!
//! These models are shared with the instrumented client (wire format) and
//! with persisted sessions, so field names follow the client's camelCase.

pub mod protobuf;
pub mod request;
pub mod route;
pub mod view;

pub use protobuf::*;
pub use request::*;
pub use route::*;
pub use view::*;
