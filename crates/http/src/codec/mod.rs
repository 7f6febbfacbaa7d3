//! HTTP codec module for encoding and decoding HTTP messages
//!
//! - [`RequestDecoder`]: decodes incoming HTTP/1.x requests, head and body
//! - [`ResponseEncoder`]: encodes outgoing HTTP/1.1 responses
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use http::Response;
//! use lattice_http::codec::{RequestDecoder, ResponseEncoder};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::from("GET / HTTP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut request_buffer).unwrap();
//! assert!(request.is_some());
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut response_buffer = BytesMut::new();
//! encoder.encode(Response::new(Bytes::from_static(b"hello")), &mut response_buffer).unwrap();
//! ```

mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
