//! The seam between the connection machinery and application logic.
//!
//! A [`Handler`] receives the parsed request and a buffer to write the
//! response body into. Returning `Ok(())` sends that buffer as a `200 OK`
//! response; returning a [`HandlerError`] discards it and sends the error's
//! status and message instead.

pub mod router;

use std::fmt;

use crate::http::request::Request;
use crate::http::status::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: impl Into<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for HandlerError {}

pub trait Handler: Send + Sync + 'static {
    fn handle(&self, body: &mut Vec<u8>, req: &Request) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&mut Vec<u8>, &Request) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, body: &mut Vec<u8>, req: &Request) -> Result<(), HandlerError> {
        self(body, req)
    }
}
