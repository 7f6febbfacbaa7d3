use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::warn;

use crate::middleware::{Flow, Middleware};
use crate::session::UserSession;
use crate::{BoxError, ErrorPage, RequestContext, ResponseSink};

/// Header a client may carry the CSRF token in
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field a client may carry the CSRF token in
pub const CSRF_FORM_FIELD: &str = "_csrf_token";

/// Rejects state-changing requests whose CSRF token does not match the session's.
///
/// `POST`, `PUT` and `DELETE` requests must present the token issued to their
/// session, in the [`CSRF_HEADER`] header or the [`CSRF_FORM_FIELD`] form
/// field; other methods pass through untouched.
pub struct CsrfProtection {
    session: Arc<dyn UserSession>,
}

impl CsrfProtection {
    pub fn new(session: Arc<dyn UserSession>) -> Self {
        Self { session }
    }

    fn submitted_token(req: &RequestContext) -> Option<String> {
        req.header(CSRF_HEADER).map(str::to_owned).or_else(|| req.form_value(CSRF_FORM_FIELD))
    }
}

impl Middleware for CsrfProtection {
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<Flow, BoxError> {
        if !matches!(*req.method(), Method::POST | Method::PUT | Method::DELETE) {
            return Ok(Flow::Continue);
        }

        let valid = match (Self::submitted_token(req), self.session.csrf_token(req)) {
            (Some(submitted), Some(expected)) if !submitted.is_empty() => {
                constant_time_eq(submitted.as_bytes(), expected.as_bytes())
            }
            _ => false,
        };

        if valid {
            return Ok(Flow::Continue);
        }

        warn!(method = %req.method(), path = req.path(), "csrf token validation failed");
        let page = ErrorPage::new(StatusCode::FORBIDDEN, "Invalid CSRF Token", "CSRF token validation failed");
        resp.render_error(&page)?;
        Ok(Flow::Stop)
    }
}

/// A middleware factory building a [`CsrfProtection`] per request
pub fn csrf_protection(session: Arc<dyn UserSession>) -> impl Fn() -> CsrfProtection + Send + Sync + 'static {
    move || CsrfProtection::new(Arc::clone(&session))
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MockUserSession;
    use bytes::Bytes;
    use http::Request;

    const TOKEN: &str = "0123456789abcdef";

    fn middleware() -> CsrfProtection {
        let mut session = MockUserSession::new();
        session.expect_csrf_token().return_const(Some(TOKEN.to_owned()));
        CsrfProtection::new(Arc::new(session))
    }

    fn run(request: Request<Bytes>) -> (Flow, ResponseSink) {
        let mut req = RequestContext::new("/posts", request);
        let mut resp = ResponseSink::new();
        let flow = middleware().handle(&mut req, &mut resp).unwrap();
        (flow, resp)
    }

    #[test]
    fn safe_methods_pass_without_token() {
        let mut session = MockUserSession::new();
        session.expect_csrf_token().never();
        let middleware = CsrfProtection::new(Arc::new(session));

        let mut req = RequestContext::new("/posts", Request::get("/posts").body(Bytes::new()).unwrap());
        assert_eq!(middleware.handle(&mut req, &mut ResponseSink::new()).unwrap(), Flow::Continue);
    }

    #[test]
    fn accepts_token_from_header() {
        let (flow, resp) = run(Request::post("/posts").header(CSRF_HEADER, TOKEN).body(Bytes::new()).unwrap());
        assert_eq!(flow, Flow::Continue);
        assert!(!resp.is_committed());
    }

    #[test]
    fn accepts_token_from_form_field() {
        let body = format!("title=hi&{CSRF_FORM_FIELD}={TOKEN}");
        let (flow, _) = run(Request::delete("/posts").body(Bytes::from(body)).unwrap());
        assert_eq!(flow, Flow::Continue);
    }

    #[test]
    fn rejects_missing_or_wrong_token() {
        for request in [
            Request::post("/posts").body(Bytes::new()).unwrap(),
            Request::put("/posts").header(CSRF_HEADER, "wrong").body(Bytes::new()).unwrap(),
            Request::post("/posts").header(CSRF_HEADER, "").body(Bytes::new()).unwrap(),
        ] {
            let (flow, resp) = run(request);
            assert_eq!(flow, Flow::Stop);

            let response = resp.into_response().unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
            assert_eq!(body["subHeading"], "Invalid CSRF Token");
            assert_eq!(body["message"], "CSRF token validation failed");
        }
    }

    #[test]
    fn constant_time_eq_compares_whole_input() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
