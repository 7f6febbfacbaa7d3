use std::sync::Arc;

use tracing::debug;

use crate::middleware::{Flow, Middleware};
use crate::session::{UserRole, UserSession};
use crate::{BoxError, HttpError, RequestContext, ResponseSink};

/// Stops the dispatch with a 401 page unless the session has a logged-in user.
pub struct RequireUser {
    session: Arc<dyn UserSession>,
}

impl RequireUser {
    pub fn new(session: Arc<dyn UserSession>) -> Self {
        Self { session }
    }
}

impl Middleware for RequireUser {
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<Flow, BoxError> {
        if self.session.current_user(req).is_some() {
            return Ok(Flow::Continue);
        }

        debug!(path = req.path(), "no user logged in, stop dispatch");
        resp.render_error(&HttpError::unauthorized("You must be logged in to access this page").to_error_page())?;
        Ok(Flow::Stop)
    }
}

/// Like [`RequireUser`], and additionally stops with a 403 page when the user's role differs.
pub struct RequireRole {
    session: Arc<dyn UserSession>,
    role: UserRole,
}

impl RequireRole {
    pub fn new(session: Arc<dyn UserSession>, role: UserRole) -> Self {
        Self { session, role }
    }
}

impl Middleware for RequireRole {
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<Flow, BoxError> {
        let error = match self.session.current_user(req) {
            Some(user) if user.role == self.role => return Ok(Flow::Continue),
            Some(user) => {
                debug!(user_id = user.id, required = ?self.role, actual = ?user.role, "role mismatch, stop dispatch");
                HttpError::forbidden("You are not allowed to access this page")
            }
            None => HttpError::unauthorized("You must be logged in to access this page"),
        };

        resp.render_error(&error.to_error_page())?;
        Ok(Flow::Stop)
    }
}

/// A middleware factory building a [`RequireUser`] per request
pub fn require_user(session: Arc<dyn UserSession>) -> impl Fn() -> RequireUser + Send + Sync + 'static {
    move || RequireUser::new(Arc::clone(&session))
}

/// A middleware factory building a [`RequireRole`] per request
pub fn require_role(session: Arc<dyn UserSession>, role: UserRole) -> impl Fn() -> RequireRole + Send + Sync + 'static {
    move || RequireRole::new(Arc::clone(&session), role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MockUserSession, UserIdentity};
    use bytes::Bytes;
    use http::{Request, StatusCode};

    fn request() -> RequestContext {
        RequestContext::new("/dashboard", Request::get("/dashboard").body(Bytes::new()).unwrap())
    }

    fn session_with(user: Option<UserIdentity>) -> Arc<dyn UserSession> {
        let mut session = MockUserSession::new();
        session.expect_current_user().times(1).return_const(user);
        Arc::new(session)
    }

    fn member() -> UserIdentity {
        UserIdentity { id: 7, email: "bob@example.com".into(), role: UserRole::User }
    }

    #[test]
    fn require_user_continues_for_logged_in_user() {
        let middleware = require_user(session_with(Some(member())))();
        let mut resp = ResponseSink::new();

        let flow = middleware.handle(&mut request(), &mut resp).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(!resp.is_committed());
    }

    #[test]
    fn require_user_stops_with_401() {
        let middleware = RequireUser::new(session_with(None));
        let mut resp = ResponseSink::new();

        let flow = middleware.handle(&mut request(), &mut resp).unwrap();

        assert_eq!(flow, Flow::Stop);
        assert_eq!(resp.response().unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn require_role_stops_with_403_on_wrong_role() {
        let middleware = require_role(session_with(Some(member())), UserRole::Admin)();
        let mut resp = ResponseSink::new();

        let flow = middleware.handle(&mut request(), &mut resp).unwrap();

        assert_eq!(flow, Flow::Stop);
        assert_eq!(resp.response().unwrap().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn require_role_continues_on_matching_role() {
        let middleware = RequireRole::new(session_with(Some(member())), UserRole::User);
        let flow = middleware.handle(&mut request(), &mut ResponseSink::new()).unwrap();
        assert_eq!(flow, Flow::Continue);
    }

    #[test]
    fn require_role_stops_with_401_without_user() {
        let middleware = RequireRole::new(session_with(None), UserRole::User);
        let mut resp = ResponseSink::new();

        assert_eq!(middleware.handle(&mut request(), &mut resp).unwrap(), Flow::Stop);
        assert_eq!(resp.response().unwrap().status(), StatusCode::UNAUTHORIZED);
    }
}
