//! Request handlers: the last step of a dispatch.
//!
//! A route stores a factory rather than a handler, so a fresh handler is
//! built for every matched request. The usual handler is a
//! [`ControllerMethod`], pairing a controller instance with one of its methods.

use crate::{BoxError, RequestContext, ResponseSink};

/// Handles a matched request by writing exactly one response into the sink.
pub trait RequestHandler: Send + Sync {
    fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError>;
}

impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        (**self).invoke(req, resp)
    }
}

/// The signature of a controller method usable as a handler.
pub type ControllerAction<C> = fn(&C, &mut RequestContext, &mut ResponseSink) -> Result<(), BoxError>;

/// A controller instance together with the method to call on it
pub struct ControllerMethod<C> {
    controller: C,
    method: ControllerAction<C>,
}

/// Pairs `controller` with `method`.
///
/// # Example
/// ```
/// use lattice_web::handler::controller_method;
/// use lattice_web::router::{get, Router};
/// use lattice_web::{BoxError, RequestContext, ResponseSink};
/// use http::StatusCode;
///
/// struct UserController;
///
/// impl UserController {
///     fn show(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
///         let id = req.param("id").unwrap_or_default();
///         resp.text(StatusCode::OK, format!("user {id}"))?;
///         Ok(())
///     }
/// }
///
/// let router = Router::builder()
///     .route("/users/[id]", get(|| controller_method(UserController, UserController::show)))
///     .build();
/// assert_eq!(router.len(), 1);
/// ```
pub fn controller_method<C>(controller: C, method: ControllerAction<C>) -> ControllerMethod<C> {
    ControllerMethod { controller, method }
}

impl<C> ControllerMethod<C> {
    pub fn controller(&self) -> &C {
        &self.controller
    }
}

impl<C: Send + Sync> RequestHandler for ControllerMethod<C> {
    fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        (self.method)(&self.controller, req, resp)
    }
}

/// A handler backed by a closure
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> Result<(), BoxError> + Send + Sync,
{
    FnHandler { f }
}

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> Result<(), BoxError> + Send + Sync,
{
    fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseSink) -> Result<(), BoxError> {
        (self.f)(req, resp)
    }
}
