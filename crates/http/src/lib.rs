//! The HTTP/1.1 connection layer of lattice
//!
//! This crate turns a byte stream into fully buffered `http::Request<Bytes>`
//! values, hands each one to a [`handler::Handler`], and writes the returned
//! `http::Response<Bytes>` back. Requests on a connection are served strictly
//! one after another.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use lattice_http::connection::HttpConnection;
//! use lattice_http::handler::make_handler;
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler).await {
//!                 error!("service has error, cause {}, connection shutdown", e);
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<Bytes>, Box<dyn Error + Send + Sync>> {
//!     info!(path = request.uri().path(), body_len = request.body().len(), "receive request");
//!     let response = Response::builder().status(StatusCode::OK).body(Bytes::from_static(b"Hello World!\r\n"))?;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: connection lifecycle and keep-alive
//! - [`codec`]: request decoding and response encoding
//! - [`handler`]: the trait an application implements to serve requests
//! - [`protocol`]: error types
//!
//! # Limitations
//!
//! - HTTP/1.x only, no TLS
//! - Bodies must be sent with `Content-Length`; chunked requests are rejected
//! - Maximum header size: 8KB, maximum number of headers: 64, maximum body: 1MB

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
