//! Per-route middleware run before the handler.
//!
//! Middleware run strictly in the order they were attached to a route. Each
//! one either lets the dispatch continue or stops it; a middleware that stops
//! must have written the response itself, and neither later middleware nor
//! the handler run afterwards.
//!
//! # Example
//!
//! ```
//! use lattice_web::middleware::{middleware_fn, Flow};
//! use lattice_web::router::{post, Router};
//! use lattice_web::handler::handler_fn;
//! use http::StatusCode;
//!
//! let router = Router::builder()
//!     .route(
//!         "/login",
//!         post(|| handler_fn(|_req, resp| Ok(resp.text(StatusCode::OK, "welcome")?)))
//!             .with(|| middleware_fn(|req, resp| {
//!                 if req.header("x-auth-token").is_some() {
//!                     return Ok(Flow::Continue);
//!                 }
//!                 resp.text(StatusCode::UNAUTHORIZED, "missing token")?;
//!                 Ok(Flow::Stop)
//!             })),
//!     )
//!     .build();
//! assert_eq!(router.len(), 1);
//! ```

mod auth;
mod csrf;

pub use auth::{RequireRole, RequireUser, require_role, require_user};
pub use csrf::{CSRF_FORM_FIELD, CSRF_HEADER, CsrfProtection, csrf_protection};

use crate::{BoxError, RequestContext, ResponseSink};

/// Tells the dispatcher whether to go on with the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next middleware, or the handler after the last one
    Continue,
    /// The dispatch is complete; the middleware has written the response
    Stop,
}

/// A synchronous pre-handler step of a route.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<Flow, BoxError>;
}

impl<M: Middleware + ?Sized> Middleware for Box<M> {
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<Flow, BoxError> {
        (**self).handle(req, resp)
    }
}

/// A middleware backed by a closure
pub struct FnMiddleware<F> {
    f: F,
}

pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> Result<Flow, BoxError> + Send + Sync,
{
    FnMiddleware { f }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> Result<Flow, BoxError> + Send + Sync,
{
    fn handle(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<Flow, BoxError> {
        (self.f)(req, resp)
    }
}
