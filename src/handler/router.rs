//! Routes served by the `tcphttp` binary.

use crate::handler::HandlerError;
use crate::http::request::Request;
use crate::http::status::StatusCode;

pub fn route(body: &mut Vec<u8>, req: &Request) -> Result<(), HandlerError> {
    match req.target() {
        "/yourproblem" => Err(HandlerError::new(
            StatusCode::BAD_REQUEST,
            "Your problem is not my problem\n",
        )),
        "/myproblem" => Err(HandlerError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Woopsie, my bad\n",
        )),
        _ => {
            body.extend_from_slice(b"All good, frfr\n");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: &str) -> Request {
        let mut req = Request::new();
        let raw = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target);
        req.parse(raw.as_bytes()).unwrap();
        req
    }

    #[test]
    fn routes_by_target() {
        let mut body = Vec::new();
        assert!(route(&mut body, &request("/")).is_ok());
        assert_eq!(body, b"All good, frfr\n");

        let err = route(&mut Vec::new(), &request("/yourproblem")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = route(&mut Vec::new(), &request("/myproblem")).unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
