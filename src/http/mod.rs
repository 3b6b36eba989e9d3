pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;

/// Line terminator used throughout HTTP/1.1 framing.
pub const CRLF: &[u8] = b"\r\n";

/// Protocol name expected before the `/` of the request line's version.
pub const HTTP_NAME: &str = "HTTP";

/// The only HTTP version this engine speaks.
pub const HTTP_VERSION: &str = "1.1";

pub use headers::Headers;
pub use parser::ParseError;
pub use request::{Request, RequestLine};
pub use response::{ResponseWriter, WriteError, default_headers};
pub use status::StatusCode;
