//! Response serialization.
//!
//! [`ResponseWriter`] wraps any async byte sink and only lets a response be
//! written in wire order:
//!
//! ```text
//! AwaitingStatusLine -> AwaitingHeaders -> WritingBody -> ChunkedBodyClosed -> Finished
//! ```
//!
//! The body is written either verbatim ([`ResponseWriter::write_body`]) or as
//! a sequence of chunks ([`ResponseWriter::write_chunk`]); whichever is used
//! first locks the writer into that mode. A chunked body is closed with
//! [`ResponseWriter::write_chunked_terminator`] and then completed with
//! [`ResponseWriter::write_trailers`].

use std::fmt;
use std::io;

use async_std::io::Write;
use async_std::prelude::*;
use thiserror::Error;

use crate::http::headers::Headers;
use crate::http::status::StatusCode;
use crate::http::{CRLF, HTTP_NAME, HTTP_VERSION};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot {op} in state {state}")]
    OutOfOrderWrite { op: &'static str, state: WriterState },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    Plain,
    Chunked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    AwaitingStatusLine,
    AwaitingHeaders,
    /// Headers are out; `None` until the first body write picks a mode.
    WritingBody(Option<BodyMode>),
    ChunkedBodyClosed,
    Finished,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::AwaitingStatusLine => "awaiting status line",
            WriterState::AwaitingHeaders => "awaiting headers",
            WriterState::WritingBody(None) => "writing body",
            WriterState::WritingBody(Some(BodyMode::Plain)) => "writing plain body",
            WriterState::WritingBody(Some(BodyMode::Chunked)) => "writing chunked body",
            WriterState::ChunkedBodyClosed => "chunked body closed",
            WriterState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Headers for a simple, non-streamed response carrying `content_len` bytes.
///
/// Callers adjust the returned set before passing it to
/// [`ResponseWriter::write_headers`], e.g. swapping `Content-Length` for
/// `Transfer-Encoding: chunked`.
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", &content_len.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

pub struct ResponseWriter<W> {
    inner: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: Write + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriterState::AwaitingStatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingStatusLine, "write status line")?;

        // HTTP/1.1 <code> <reason>\r\n
        let line = format!(
            "{}/{} {} {}\r\n",
            HTTP_NAME,
            HTTP_VERSION,
            status.as_u16(),
            status.reason()
        );
        self.inner.write_all(line.as_bytes()).await?;

        self.state = WriterState::AwaitingHeaders;
        Ok(())
    }

    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingHeaders, "write headers")?;

        self.inner.write_all(&serialize_fields(headers)).await?;

        self.state = WriterState::WritingBody(None);
        Ok(())
    }

    /// Writes `data` verbatim, without any framing.
    pub async fn write_body(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.enter_body_mode(BodyMode::Plain, "write body")?;
        self.inner.write_all(data).await?;
        Ok(data.len())
    }

    /// Writes `data` as one chunk of a chunked body.
    ///
    /// A zero-length chunk is encoded like any other; use
    /// [`write_chunked_terminator`](Self::write_chunked_terminator) to end
    /// the body.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.enter_body_mode(BodyMode::Chunked, "write chunk")?;

        let mut frame = Vec::with_capacity(data.len() + 16);
        frame.extend_from_slice(format!("{:x}", data.len()).as_bytes());
        frame.extend_from_slice(CRLF);
        frame.extend_from_slice(data);
        frame.extend_from_slice(CRLF);
        self.inner.write_all(&frame).await?;

        Ok(data.len())
    }

    /// Writes the terminal `0\r\n` chunk. Trailers must follow.
    pub async fn write_chunked_terminator(&mut self) -> Result<usize, WriteError> {
        self.enter_body_mode(BodyMode::Chunked, "write chunked terminator")?;

        let terminator = b"0\r\n";
        self.inner.write_all(terminator).await?;

        self.state = WriterState::ChunkedBodyClosed;
        Ok(terminator.len())
    }

    /// Writes trailer fields and the blank line completing a chunked body.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        self.expect(WriterState::ChunkedBodyClosed, "write trailers")?;

        self.inner.write_all(&serialize_fields(trailers)).await?;

        self.state = WriterState::Finished;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.inner.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn expect(&self, state: WriterState, op: &'static str) -> Result<(), WriteError> {
        if self.state != state {
            return Err(self.out_of_order(op));
        }
        Ok(())
    }

    fn enter_body_mode(&mut self, mode: BodyMode, op: &'static str) -> Result<(), WriteError> {
        match self.state {
            WriterState::WritingBody(None) => {
                self.state = WriterState::WritingBody(Some(mode));
                Ok(())
            }
            WriterState::WritingBody(Some(current)) if current == mode => Ok(()),
            _ => Err(self.out_of_order(op)),
        }
    }

    fn out_of_order(&self, op: &'static str) -> WriteError {
        WriteError::OutOfOrderWrite {
            op,
            state: self.state,
        }
    }
}

// <name>: <value>\r\n
// ...
// \r\n
fn serialize_fields(fields: &Headers) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in fields.iter() {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(CRLF);
    out
}
