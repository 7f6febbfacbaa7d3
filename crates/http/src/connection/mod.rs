//! HTTP connection handling module
//!
//! - [`HttpConnection`]: drives one client connection, decoding requests,
//!   calling the handler and writing responses, with keep-alive support

mod http_connection;

pub use http_connection::HttpConnection;
