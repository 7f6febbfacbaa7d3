//! HTTP request decoder
//!
//! Decodes a complete HTTP/1.x request, head and body, from a byte stream.
//!
//! The decoder works in two phases:
//!
//! 1. Head parsing: `httparse` parses the request line and headers, which are
//!    copied into an [`http::request::Parts`]
//! 2. Body buffering: the `Content-Length` bytes following the head are split
//!    off the buffer once they have all arrived
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 8KB
//! - Maximum body size: 1MB
//! - `Transfer-Encoding` bodies are rejected; clients must send `Content-Length`
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use lattice_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /users/42?tab=posts HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.uri().path(), "/users/42");
//! ```

use bytes::{Buf, Bytes, BytesMut};
use http::request::Parts;
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version, header};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::ParseError;

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the request line plus headers
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Maximum size in bytes allowed for a request body
const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// A decoder producing one fully buffered [`Request`] per HTTP request
///
/// # State Machine
///
/// The decoder keeps its state in the `pending` field:
/// - `None`: waiting for a complete request head
/// - `Some((parts, length))`: head decoded, waiting for `length` body bytes
#[derive(Debug, Default)]
pub struct RequestDecoder {
    pending: Option<(Parts, usize)>,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<Bytes>;
    type Error = ParseError;

    /// Attempts to decode an HTTP request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: a complete request with its body
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the request is malformed or exceeds a limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (parts, length) = match self.pending.take() {
            Some(pending) => pending,
            None => match decode_head(src)? {
                Some(head) => head,
                None => return Ok(None),
            },
        };

        if src.len() < length {
            src.reserve(length - src.len());
            self.pending = Some((parts, length));
            return Ok(None);
        }

        let body = src.split_to(length).freeze();
        Ok(Some(Request::from_parts(parts, body)))
    }
}

/// Parses the request head, advancing `src` past it on success.
fn decode_head(src: &mut BytesMut) -> Result<Option<(Parts, usize)>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut req = httparse::Request::new(&mut headers);

    let parsed = req.parse(src).map_err(|e| match e {
        httparse::Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e.to_string()),
    })?;

    let head_size = match parsed {
        Status::Complete(head_size) => head_size,
        Status::Partial => {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            return Ok(None);
        }
    };

    trace!(head_size, "parsed request head");
    ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

    let version = match req.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        v => return Err(ParseError::InvalidVersion(v)),
    };

    let method = req.method.ok_or(ParseError::InvalidMethod)?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod)?;
    let uri = req.path.ok_or(ParseError::InvalidUri)?;
    let uri = Uri::try_from(uri).map_err(|_e| ParseError::InvalidUri)?;

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;

    let header_map = request.headers_mut();
    header_map.reserve(req.headers.len());
    for h in req.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(h.value).map_err(ParseError::invalid_header)?;
        header_map.append(name, value);
    }

    let (parts, ()) = request.into_parts();
    let length = body_length(&parts)?;

    src.advance(head_size);
    Ok(Some((parts, length)))
}

/// Determines how many body bytes follow the head.
///
/// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
fn body_length(parts: &Parts) -> Result<usize, ParseError> {
    let te_header = parts.headers.get(header::TRANSFER_ENCODING);
    let cl_header = parts.headers.get(header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(0),
        (Some(_), None) => Err(ParseError::UnsupportedTransferEncoding),
        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }
        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;
            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_e| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            ensure!(length <= MAX_BODY_BYTES, ParseError::too_large_body(length, MAX_BODY_BYTES));
            usize::try_from(length).map_err(|_e| ParseError::too_large_body(length, MAX_BODY_BYTES))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut buf = BytesMut::from(str);
        let request = RequestDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.uri().path(), "/index.html");
        assert_eq!(request.uri().query(), None);
        assert_eq!(request.headers().len(), 3);
        assert_eq!(request.headers().get(header::USER_AGENT), Some(&HeaderValue::from_static("curl/7.79.1")));
        assert!(request.body().is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn keeps_query_string_in_uri() {
        let mut buf = BytesMut::from("GET /?page=2 HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let request = RequestDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.uri().path(), "/");
        assert_eq!(request.uri().query(), Some("page=2"));
    }

    #[test]
    fn waits_for_complete_body() {
        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::from("POST /login HTTP/1.1\r\nContent-Length: 11\r\n\r\nemail=");

        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"a@b.c");
        let request = decoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(&request.body()[..], b"email=a@b.c");
        assert!(buf.is_empty());
    }

    #[test]
    fn decodes_pipelined_requests() {
        let mut decoder = RequestDecoder::new();
        let mut buf = BytesMut::from("GET /a HTTP/1.1\r\n\r\nDELETE /b HTTP/1.1\r\nContent-Length: 1\r\n\r\nx");

        let first = decoder.decode(&mut buf).unwrap().unwrap();
        let second = decoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(first.uri().path(), "/a");
        assert_eq!(second.method(), &Method::DELETE);
        assert_eq!(&second.body()[..], b"x");
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn partial_head_needs_more_data() {
        let mut buf = BytesMut::from("GET /users/42 HTTP/1.1\r\nHost: loc");
        assert!(RequestDecoder::new().decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn rejects_chunked_body() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
        let result = RequestDecoder::new().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::UnsupportedTransferEncoding)));
    }

    #[test]
    fn rejects_invalid_content_length() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n");
        let result = RequestDecoder::new().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn rejects_oversized_body() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 2097152\r\n\r\n");
        let result = RequestDecoder::new().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeBody { .. })));
    }

    #[test]
    fn rejects_oversized_head() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n");
        buf.extend_from_slice(format!("X-Filler: {}\r\n", "a".repeat(MAX_HEADER_BYTES)).as_bytes());
        let result = RequestDecoder::new().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { .. })));
    }
}
