//! Incremental HTTP/1.1 request parser.
//!
//! Parsing is split in two layers:
//!
//! - [`Request::parse`] is a pure state machine over byte slices. Each step
//!   either consumes a complete syntactic unit (request line, one header
//!   line, body bytes) or reports that it needs more data by consuming
//!   nothing.
//! - [`Request::from_reader`] drives that state machine from an async byte
//!   source, growing and compacting a [`ReadBuffer`] as data arrives.
//!
//! Because nothing is consumed until a whole unit is available, the result
//! does not depend on how the source fragments its reads.

use std::io;

use async_std::io::Read;
use async_std::prelude::*;
use log::trace;
use thiserror::Error;

use crate::http::headers::find_crlf;
use crate::http::request::{Request, RequestLine};
use crate::http::{CRLF, HTTP_NAME, HTTP_VERSION};

/// Errors produced while reading a request off the wire.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line: {0}")]
    MalformedRequestLine(&'static str),

    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    #[error("malformed Content-Length: {0:?}")]
    MalformedContentLength(String),

    #[error("body longer than Content-Length of {declared} bytes")]
    BodyTooLong { declared: usize },

    #[error("incomplete or malformed request")]
    IncompleteRequest,

    #[error("trying to read data in a done state")]
    InvalidState,

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ParserState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

impl Request {
    /// Reads one request from `reader`.
    ///
    /// `initial_capacity` is the starting size of the read buffer; it doubles
    /// whenever it fills up before the request could make progress.
    pub async fn from_reader<R>(
        reader: &mut R,
        initial_capacity: usize,
    ) -> Result<Request, ParseError>
    where
        R: Read + Unpin,
    {
        let mut buf = ReadBuffer::with_capacity(initial_capacity);
        let mut req = Request::new();

        while !req.is_done() {
            if buf.is_full() {
                buf.grow();
                trace!("read buffer grown to {} bytes", buf.capacity());
            }

            let n = match reader.read(buf.spare_mut()).await {
                Ok(0) => return Err(ParseError::IncompleteRequest),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ParseError::Io(e)),
            };
            buf.advance(n);

            let consumed = req.parse(buf.filled())?;
            buf.consume(consumed);
        }

        Ok(req)
    }

    /// Feeds `data` to the state machine until it stalls or the request is
    /// complete. Returns the number of bytes consumed from the front of
    /// `data`; the caller must keep the rest and present it again with more
    /// data appended.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut total = 0;
        while self.state != ParserState::Done {
            let n = self.parse_single(&data[total..])?;
            total += n;
            if n == 0 {
                break;
            }
        }
        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParserState::Initialized => {
                let Some((request_line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                trace!(
                    "request line: {} {}",
                    request_line.method, request_line.request_target
                );
                self.request_line = request_line;
                self.state = ParserState::ParsingHeaders;
                Ok(n)
            }
            ParserState::ParsingHeaders => {
                let (n, done) = self.headers.parse_line(data)?;
                if done {
                    self.state = ParserState::ParsingBody;
                }
                Ok(n)
            }
            ParserState::ParsingBody => self.parse_body(data),
            ParserState::Done => Err(ParseError::InvalidState),
        }
    }

    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        // Without a declared length the request is treated as bodiless and
        // anything left in the buffer is dropped.
        let Some(content_length) = self.headers.get("Content-Length") else {
            self.state = ParserState::Done;
            return Ok(data.len());
        };

        let declared = content_length
            .parse::<usize>()
            .map_err(|_| ParseError::MalformedContentLength(content_length.to_string()))?;

        self.body.extend_from_slice(data);
        if self.body.len() > declared {
            return Err(ParseError::BodyTooLong { declared });
        }
        if self.body.len() == declared {
            self.state = ParserState::Done;
        }

        Ok(data.len())
    }
}

/// Parses `<METHOD> <TARGET> HTTP/1.1\r\n` from the start of `data`.
///
/// Returns `None` while the line is not yet terminated.
fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(end) = find_crlf(data) else {
        return Ok(None);
    };

    let parts: Vec<&[u8]> = data[..end].split(|&b| b == b' ').collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::MalformedRequestLine("expected 3 parts"));
    };

    if method.is_empty() || !method.iter().all(|b| b.is_ascii_uppercase()) {
        return Err(ParseError::MalformedRequestLine(
            "method must contain only uppercase letters",
        ));
    }

    let version_parts: Vec<&[u8]> = version.split(|&b| b == b'/').collect();
    let [name, number] = version_parts[..] else {
        return Err(ParseError::MalformedRequestLine("invalid HTTP version format"));
    };
    if name != HTTP_NAME.as_bytes() {
        return Err(ParseError::MalformedRequestLine("invalid HTTP version prefix"));
    }
    if number != HTTP_VERSION.as_bytes() {
        return Err(ParseError::UnsupportedVersion(
            String::from_utf8_lossy(number).into_owned(),
        ));
    }

    // The method is ASCII by now; the target may carry raw non-UTF-8 bytes.
    let request_line = RequestLine {
        method: String::from_utf8_lossy(method).into_owned(),
        request_target: String::from_utf8_lossy(target).into_owned(),
        http_version: HTTP_VERSION.to_string(),
    };

    Ok(Some((request_line, end + CRLF.len())))
}

/// Growable read buffer with an explicit fill cursor.
///
/// Bytes in `buf[..len]` have been read but not yet consumed by the parser.
/// Consumed bytes are shifted out from the front; the storage only ever
/// grows, by doubling.
struct ReadBuffer {
    buf: Box<[u8]>,
    len: usize,
}

impl ReadBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    fn grow(&mut self) {
        let mut bigger = vec![0; self.buf.len() * 2].into_boxed_slice();
        bigger[..self.len].copy_from_slice(&self.buf[..self.len]);
        self.buf = bigger;
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    fn advance(&mut self, n: usize) {
        self.len += n;
    }

    fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn consume(&mut self, n: usize) {
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }
}
