//! Per-dispatch request data handed to middleware and handlers.
//!
//! - `RequestContext`: the matched route's pattern plus the inbound request's method, uri,
//!   headers and body, with typed accessors for query, form and json data
//! - `PathParams`: the values captured by the pattern's `[name]` segments

use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};
use serde::de::DeserializeOwned;

use crate::HttpError;
use crate::router::matcher;

/// Represents the context of one dispatched request.
///
/// A fresh context is built for every matched request and is owned by that
/// dispatch alone, so middleware may freely modify it before the handler runs.
#[derive(Debug)]
pub struct RequestContext {
    pattern: String,
    parts: Parts,
    body: Bytes,
    path_params: PathParams,
}

impl RequestContext {
    /// Creates a context for `request` bound to the route `pattern` it matched
    pub fn new(pattern: impl Into<String>, request: Request<Bytes>) -> Self {
        let pattern = pattern.into();
        let (parts, body) = request.into_parts();
        let path_params = matcher::capture(&pattern, parts.uri.path()).unwrap_or_default();
        Self { pattern, parts, body, path_params }
    }

    /// Returns the declared pattern of the matched route, e.g. `/users/[id]`
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the path of the request, without the query string
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the HTTP headers of the request for modification
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Returns the raw request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a header value, if present and valid visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the value of the named cookie, looking through every `cookie` header
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Returns the path parameters extracted with the route's pattern
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Gets the value of the path parameter `[name]`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Deserializes the query string; a missing query string reads as empty
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        let query = self.parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query).map_err(|e| HttpError::bad_request(format!("invalid query string: {e}")))
    }

    /// Deserializes an `application/x-www-form-urlencoded` body
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_urlencoded::from_bytes(&self.body).map_err(|e| HttpError::bad_request(format!("invalid form body: {e}")))
    }

    /// Deserializes an `application/json` body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::bad_request(format!("invalid json body: {e}")))
    }

    /// Returns one field of a form body, or `None` when the body is not a form or lacks it
    pub fn form_value(&self, name: &str) -> Option<String> {
        self.form::<HashMap<String, String>>().ok().and_then(|mut fields| fields.remove(name))
    }
}

/// Represents path parameters extracted from the URL path of a request.
///
/// For the pattern `/users/[id]` and the path `/users/42`, `id` is `"42"`.
/// Parameters keep the order in which they appear in the pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.params.push((name.to_owned(), value.to_owned()));
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in pattern order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
