//! HTTP bridge between a stateless game client and the external game worker.
pub mod gateway_http;
pub mod session_coordinator;

pub use gateway_http::*;
pub use session_coordinator::*;
