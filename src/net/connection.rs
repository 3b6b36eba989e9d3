//! Per-connection request/response cycle.
//!
//! Every accepted connection carries exactly one exchange:
//!
//! 1. Read and parse the request
//!    (delegated to [`Request::from_reader`](crate::http::request::Request::from_reader))
//! 2. Run the [`Handler`] against a fresh body buffer
//! 3. Write exactly one response through a [`ResponseWriter`]
//! 4. Shut the connection down
//!
//! A request that fails to parse is answered with `400 Bad Request` and the
//! parse error as its body. Nothing is retried.

use std::net::Shutdown;
use std::sync::Arc;

use async_std::io::{Read, Write};
use async_std::net::TcpStream;
use log::{debug, error, warn};
use sha2::{Digest, Sha256};

use crate::config::ServerConfig;
use crate::handler::{Handler, HandlerError};
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{ResponseWriter, WriteError, default_headers};
use crate::http::status::StatusCode;

/// Serves one request on `stream` and closes it.
pub async fn handle(mut stream: TcpStream, handler: Arc<dyn Handler>, config: Arc<ServerConfig>) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown peer".to_string());
    debug!("connection from {}", peer);

    if let Err(err) = serve(&mut stream, handler.as_ref(), &config).await {
        error!("failed to write response to {}: {}", peer, err);
    }

    if let Err(err) = stream.shutdown(Shutdown::Both) {
        debug!("shutdown of connection from {} failed: {}", peer, err);
    }
}

/// Runs one request/response exchange over any duplex byte stream.
pub async fn serve<S>(
    stream: &mut S,
    handler: &dyn Handler,
    config: &ServerConfig,
) -> Result<(), WriteError>
where
    S: Read + Write + Unpin,
{
    let outcome = match Request::from_reader(stream, config.read_buffer_size).await {
        Ok(req) => {
            debug!(
                "{} {} ({} body bytes)",
                req.method(),
                req.target(),
                req.body.len()
            );
            let mut body = Vec::new();
            handler.handle(&mut body, &req).map(|()| body)
        }
        Err(err) => {
            warn!("rejecting request: {}", err);
            Err(HandlerError::new(StatusCode::BAD_REQUEST, err.to_string()))
        }
    };

    let mut writer = ResponseWriter::new(&mut *stream);
    match outcome {
        Ok(body) => match config.chunk_size {
            Some(chunk_size) => write_chunked(&mut writer, &body, chunk_size).await?,
            None => write_plain(&mut writer, StatusCode::OK, &body).await?,
        },
        Err(err) => write_handler_error(&mut writer, &err).await?,
    }
    writer.flush().await
}

/// Writes `err` as a complete `text/plain` response.
pub async fn write_handler_error<W>(
    writer: &mut ResponseWriter<W>,
    err: &HandlerError,
) -> Result<(), WriteError>
where
    W: Write + Unpin,
{
    write_plain(writer, err.status, err.message.as_bytes()).await
}

async fn write_plain<W>(
    writer: &mut ResponseWriter<W>,
    status: StatusCode,
    body: &[u8],
) -> Result<(), WriteError>
where
    W: Write + Unpin,
{
    writer.write_status_line(status).await?;
    writer.write_headers(&default_headers(body.len())).await?;
    writer.write_body(body).await?;
    Ok(())
}

async fn write_chunked<W>(
    writer: &mut ResponseWriter<W>,
    body: &[u8],
    chunk_size: usize,
) -> Result<(), WriteError>
where
    W: Write + Unpin,
{
    let mut headers = default_headers(0);
    headers.remove("Content-Length");
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", "X-Content-SHA256, X-Content-Length");

    writer.write_status_line(StatusCode::OK).await?;
    writer.write_headers(&headers).await?;
    for chunk in body.chunks(chunk_size.max(1)) {
        writer.write_chunk(chunk).await?;
    }
    writer.write_chunked_terminator().await?;

    let mut trailers = Headers::new();
    trailers.set("X-Content-SHA256", &hex::encode(Sha256::digest(body)));
    trailers.set("X-Content-Length", &body.len().to_string());
    writer.write_trailers(&trailers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// In-memory connection: reads from a fixed input, records all writes.
    struct MockStream {
        input: Vec<u8>,
        pos: usize,
        output: Vec<u8>,
    }

    impl MockStream {
        fn new(input: &[u8]) -> Self {
            Self {
                input: input.to_vec(),
                pos: 0,
                output: Vec::new(),
            }
        }

        fn output(&self) -> &str {
            std::str::from_utf8(&self.output).unwrap()
        }
    }

    impl Read for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            let start = self.pos;
            let n = (self.input.len() - start).min(buf.len());
            buf[..n].copy_from_slice(&self.input[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(n))
        }
    }

    impl Write for MockStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.output.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn echo_target(body: &mut Vec<u8>, req: &Request) -> Result<(), HandlerError> {
        body.extend_from_slice(req.target().as_bytes());
        Ok(())
    }

    fn always_fails(body: &mut Vec<u8>, _req: &Request) -> Result<(), HandlerError> {
        body.extend_from_slice(b"partial output");
        Err(HandlerError::new(StatusCode::INTERNAL_SERVER_ERROR, "boom"))
    }

    #[async_std::test]
    async fn writes_handler_output() {
        let mut stream = MockStream::new(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
        serve(&mut stream, &echo_target, &ServerConfig::default())
            .await
            .unwrap();

        assert_eq!(
            stream.output(),
            "HTTP/1.1 200 OK\r\n\
             Content-Length: 6\r\n\
             Connection: close\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             /hello"
        );
    }

    #[async_std::test]
    async fn handler_error_replaces_partial_output() {
        let mut stream = MockStream::new(b"GET / HTTP/1.1\r\n\r\n");
        serve(&mut stream, &always_fails, &ServerConfig::default())
            .await
            .unwrap();

        let out = stream.output();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(out.contains("Content-Length: 4\r\n"));
        assert!(out.ends_with("\r\n\r\nboom"));
        assert!(!out.contains("partial output"));
    }

    #[async_std::test]
    async fn malformed_request_gets_bad_request() {
        let mut stream = MockStream::new(b"get / HTTP/1.1\r\n\r\n");
        serve(&mut stream, &echo_target, &ServerConfig::default())
            .await
            .unwrap();

        let out = stream.output();
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.ends_with("malformed request line: method must contain only uppercase letters"));
    }

    #[async_std::test]
    async fn truncated_request_gets_bad_request() {
        let mut stream = MockStream::new(b"GET / HTTP/1.1\r\nHost: x\r\n");
        serve(&mut stream, &echo_target, &ServerConfig::default())
            .await
            .unwrap();

        let out = stream.output();
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.ends_with("incomplete or malformed request"));
    }

    #[async_std::test]
    async fn streams_chunked_body_when_configured() {
        let config = ServerConfig {
            chunk_size: Some(4),
            ..ServerConfig::default()
        };
        let mut stream = MockStream::new(b"GET /abcdefghij HTTP/1.1\r\n\r\n");
        serve(&mut stream, &echo_target, &config).await.unwrap();

        assert_eq!(
            stream.output(),
            "HTTP/1.1 200 OK\r\n\
             Connection: close\r\n\
             Content-Type: text/plain\r\n\
             Transfer-Encoding: chunked\r\n\
             Trailer: X-Content-SHA256, X-Content-Length\r\n\
             \r\n\
             4\r\n/abc\r\n\
             4\r\ndefg\r\n\
             3\r\nhij\r\n\
             0\r\n\
             X-Content-SHA256: 27560c2b9336c5f2232d74b32ca9c21aa8932d8ebc9259e02743c93af8d406f4\r\n\
             X-Content-Length: 11\r\n\
             \r\n"
        );
    }
}
