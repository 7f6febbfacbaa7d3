//! The per-dispatch response sink and the error page payload.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::ResponseError;
use crate::HttpError;

/// Collects the single terminal response of one dispatch.
///
/// The first write commits the sink; any later write fails with
/// [`ResponseError::AlreadyCommitted`] and leaves the committed response as it was.
#[derive(Debug, Default)]
pub struct ResponseSink {
    response: Option<Response<Bytes>>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a response has been written
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.response.is_some()
    }

    /// Commits `response` as the answer to this request
    pub fn send(&mut self, response: Response<Bytes>) -> Result<(), ResponseError> {
        if let Some(committed) = &self.response {
            warn!(
                committed_status = %committed.status(),
                rejected_status = %response.status(),
                "response already committed"
            );
            return Err(ResponseError::AlreadyCommitted);
        }

        self.response = Some(response);
        Ok(())
    }

    /// Writes a `text/plain` response
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) -> Result<(), ResponseError> {
        self.send_with_type(status, mime::TEXT_PLAIN_UTF_8.as_ref(), Bytes::from(body.into()))
    }

    /// Writes a `text/html` response
    pub fn html(&mut self, status: StatusCode, body: impl Into<String>) -> Result<(), ResponseError> {
        self.send_with_type(status, mime::TEXT_HTML_UTF_8.as_ref(), Bytes::from(body.into()))
    }

    /// Writes `value` as an `application/json` response
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), ResponseError> {
        let body = serde_json::to_vec(value)?;
        self.send_with_type(status, mime::APPLICATION_JSON.as_ref(), Bytes::from(body))
    }

    /// Writes a `303 See Other` redirect to `location`
    pub fn redirect(&mut self, location: &str) -> Result<(), ResponseError> {
        let response =
            Response::builder().status(StatusCode::SEE_OTHER).header(header::LOCATION, location).body(Bytes::new())?;
        self.send(response)
    }

    /// Writes `page` as the response, with the page's status
    pub fn render_error(&mut self, page: &ErrorPage) -> Result<(), ResponseError> {
        self.send(page.to_response())
    }

    /// Returns the committed response, if any
    pub fn response(&self) -> Option<&Response<Bytes>> {
        self.response.as_ref()
    }

    pub fn into_response(self) -> Option<Response<Bytes>> {
        self.response
    }

    fn send_with_type(&mut self, status: StatusCode, content_type: &str, body: Bytes) -> Result<(), ResponseError> {
        let response = Response::builder().status(status).header(header::CONTENT_TYPE, content_type).body(body)?;
        self.send(response)
    }
}

/// The payload rendered for an error: a status, a short heading and a message.
///
/// Serialized with camelCase keys, e.g.
/// `{"statusCode":404,"subHeading":"Page Not Found","message":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPage {
    pub status_code: u16,
    pub sub_heading: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, String>>,
}

impl ErrorPage {
    pub fn new(status: StatusCode, sub_heading: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            sub_heading: sub_heading.into(),
            message: message.into(),
            field_errors: None,
        }
    }

    /// The page emitted when no route matches a request
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Page Not Found", "Sorry, the page you are looking for doesnt exist")
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn to_response(&self) -> Response<Bytes> {
        let body = serde_json::to_vec(self).map(Bytes::from).unwrap_or_else(|e| {
            error!(cause = %e, "serialize error page failed");
            Bytes::from(self.message.clone())
        });

        let mut response = Response::new(body);
        *response.status_mut() = self.status();
        response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<&HttpError> for ErrorPage {
    fn from(error: &HttpError) -> Self {
        error.to_error_page()
    }
}
