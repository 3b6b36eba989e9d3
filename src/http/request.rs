use crate::http::headers::Headers;
use crate::http::parser::ParserState;

/// The first line of a request: `<METHOD> <TARGET> HTTP/1.1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub request_target: String,
    /// Numeric version token, always `1.1` once parsed.
    pub http_version: String,
}

/// A request being read from, or fully read from, a connection.
///
/// The request is filled in incrementally by the
/// [`parser`](crate::http::parser) as bytes arrive and should be treated as
/// read-only once [`is_done`](Request::is_done) returns true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub(crate) state: ParserState,
}

impl Request {
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
            state: ParserState::Initialized,
        }
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.request_target
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
