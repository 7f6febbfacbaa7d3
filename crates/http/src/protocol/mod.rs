//! Protocol types shared by the codec and connection layers.
//!
//! Requests and responses travel as plain `http::Request<Bytes>` and
//! `http::Response<Bytes>` values: bodies are buffered in full, so there is no
//! separate header/payload message type.
//!
//! - [`ConnectionError`]: top-level error of a connection
//! - [`ParseError`]: request decoding errors
//! - [`SendError`]: response encoding and writing errors

mod error;
pub use error::ConnectionError;
pub use error::ParseError;
pub use error::SendError;
