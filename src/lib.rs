//! An HTTP/1.1 server built directly on TCP streams.
//!
//! Requests are parsed incrementally by [`http::parser`] as bytes arrive,
//! handed to a [`handler::Handler`], and answered through the ordered
//! [`http::response::ResponseWriter`]. Each connection carries exactly one
//! request and is closed afterwards.

pub mod config;
pub mod handler;
pub mod http;
pub mod net;

pub use config::ServerConfig;
pub use handler::{Handler, HandlerError};
pub use net::Server;
