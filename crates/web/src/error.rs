//! Error types of the web layer.
//!
//! [`HttpError`] is the status-carrying taxonomy handlers and middleware raise;
//! [`DispatchError`] is what a failed dispatch hands to the layer above the
//! dispatcher, which turns it into a rendered error page.

use crate::response::ErrorPage;
use http::StatusCode;
use std::collections::BTreeMap;
use std::error::Error;
use thiserror::Error;

/// The error type crossing the handler and middleware seam.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// An error that maps onto an HTTP status.
///
/// Messages and field errors are sanitized on construction, so they can be
/// placed into a page without further escaping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("bad request: {message}")]
    BadRequest { message: String, field_errors: Option<BTreeMap<String, String>> },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("internal server error: {message}")]
    InternalServerError { message: String },
}

impl HttpError {
    pub fn bad_request(message: impl AsRef<str>) -> Self {
        Self::BadRequest { message: sanitize(message.as_ref()), field_errors: None }
    }

    /// A 400 carrying one message per invalid form field.
    pub fn bad_request_with_fields<I, K, V>(message: impl AsRef<str>, field_errors: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let field_errors =
            field_errors.into_iter().map(|(field, error)| (field.into(), sanitize(error.as_ref()))).collect();
        Self::BadRequest { message: sanitize(message.as_ref()), field_errors: Some(field_errors) }
    }

    pub fn unauthorized(message: impl AsRef<str>) -> Self {
        Self::Unauthorized { message: sanitize(message.as_ref()) }
    }

    pub fn forbidden(message: impl AsRef<str>) -> Self {
        Self::Forbidden { message: sanitize(message.as_ref()) }
    }

    pub fn not_found(message: impl AsRef<str>) -> Self {
        Self::NotFound { message: sanitize(message.as_ref()) }
    }

    pub fn conflict(message: impl AsRef<str>) -> Self {
        Self::Conflict { message: sanitize(message.as_ref()) }
    }

    pub fn internal_server_error(message: impl AsRef<str>) -> Self {
        Self::InternalServerError { message: sanitize(message.as_ref()) }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Conflict { message }
            | Self::InternalServerError { message } => message,
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::BadRequest { field_errors, .. } => field_errors.as_ref(),
            _ => None,
        }
    }

    /// The page shown to the client for this error.
    pub fn to_error_page(&self) -> ErrorPage {
        let status = self.status();
        let mut page = ErrorPage::new(status, status.canonical_reason().unwrap_or("Error"), self.message());
        page.field_errors = self.field_errors().cloned();
        page
    }
}

/// Neutralizes markup and control characters in text destined for a page.
///
/// `& < > " '` become HTML entities; control characters other than newline
/// and tab are dropped.
pub fn sanitize(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#039;"),
            '\n' | '\t' => output.push(c),
            c if c.is_control() => {}
            c => output.push(c),
        }
    }
    output
}

/// Errors produced while writing to a [`ResponseSink`](crate::ResponseSink).
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("a response has already been written for this request")]
    AlreadyCommitted,

    #[error("serialize response body error: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid response: {source}")]
    Build {
        #[from]
        source: http::Error,
    },
}

/// A fatal failure of one dispatch.
///
/// The dispatcher never converts these into responses itself; the layer above
/// it decides which status to show.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("middleware #{index} of route '{pattern}' failed: {source}")]
    Middleware { pattern: String, index: usize, source: BoxError },

    #[error("handler of route '{pattern}' failed: {source}")]
    Handler { pattern: String, source: BoxError },

    #[error("route '{pattern}' finished without writing a response")]
    MissingResponse { pattern: String },

    #[error("can't write response: {source}")]
    Response {
        #[from]
        source: ResponseError,
    },
}

impl DispatchError {
    /// The [`HttpError`] a middleware or handler failed with, if that is what it raised.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::Middleware { source, .. } | Self::Handler { source, .. } => source.downcast_ref::<HttpError>(),
            Self::MissingResponse { .. } | Self::Response { .. } => None,
        }
    }
}
