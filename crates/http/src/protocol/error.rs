//! Errors raised while reading requests from and writing responses to a connection.

use std::io;
use thiserror::Error;

/// Ends a connection; the request side and the response side fail differently.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// A request that can't be decoded. The connection answers it with a 400 and closes.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request head of {current_size} bytes exceeds the limit of {max_size} bytes")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("more than {max_num} headers in one request")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("request body of {current_size} bytes exceeds the limit of {max_size} bytes")]
    TooLargeBody { current_size: u64, max_size: u64 },

    #[error("transfer-encoding is not supported, send a content-length body instead")]
    UnsupportedTransferEncoding,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn too_large_body(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }
}

/// A response that can't be written.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}
