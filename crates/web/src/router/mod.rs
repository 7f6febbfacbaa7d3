//! The route table and its registration API.
//!
//! Routes are kept in registration order and scanned in that order; the first
//! route whose method and pattern both match a request wins. There is no
//! ranking by specificity: with `/a/[x]` registered before `/a/b`, a request
//! for `/a/b` goes to `/a/[x]`.
//!
//! Routes hold factories instead of handler and middleware instances. The
//! factories run at dispatch time, once per matched request, never at
//! registration.

pub mod matcher;

use http::Method;
use tracing::debug;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Builds a fresh handler for one matched request
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn RequestHandler> + Send + Sync>;

/// Builds a fresh middleware for one matched request
pub type MiddlewareFactory = Box<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;

/// The route table: an ordered, immutable list of routes
pub struct Router {
    routes: Vec<Route>,
}

/// One registered route
pub struct Route {
    method: Method,
    pattern: String,
    handler_factory: HandlerFactory,
    middleware_factories: Vec<MiddlewareFactory>,
}

impl Router {
    /// Creates a new, empty router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Iterates over the routes in registration order
    pub fn routes(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the first route, in registration order, matching `method` and `path`
    pub fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(method, path))
    }
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the number of middleware attached to this route
    pub fn middleware_count(&self) -> usize {
        self.middleware_factories.len()
    }

    /// Returns true if this route serves `method` requests for `path`
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && matcher::matches(&self.pattern, path)
    }

    pub(crate) fn create_handler(&self) -> Box<dyn RequestHandler> {
        (self.handler_factory)()
    }

    /// Lazily builds this route's middleware; a middleware is only constructed when iterated to.
    pub(crate) fn create_middlewares(&self) -> impl Iterator<Item = Box<dyn Middleware>> + '_ {
        self.middleware_factories.iter().map(|factory| factory())
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("middleware_count", &self.middleware_factories.len())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish()
    }
}

/// Accumulates routes during application startup
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Appends a route for `pattern`; patterns are not validated, a malformed one simply never matches
    pub fn route(mut self, pattern: impl Into<String>, route: RouteBuilder) -> Self {
        let RouteBuilder { method, handler_factory, middleware_factories } = route;
        self.routes.push(Route { method, pattern: pattern.into(), handler_factory, middleware_factories });
        self
    }

    /// Freezes the route table
    pub fn build(self) -> Router {
        for route in &self.routes {
            debug!(
                method = %route.method,
                pattern = route.pattern,
                middlewares = route.middleware_factories.len(),
                "register route"
            );
        }
        Router { routes: self.routes }
    }
}

/// A route awaiting its pattern: the method, the handler factory and the middleware factories
pub struct RouteBuilder {
    method: Method,
    handler_factory: HandlerFactory,
    middleware_factories: Vec<MiddlewareFactory>,
}

impl RouteBuilder {
    fn new<F, H>(method: Method, handler_factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: RequestHandler + 'static,
    {
        let handler_factory: HandlerFactory = Box::new(move || Box::new(handler_factory()));
        Self { method, handler_factory, middleware_factories: Vec::new() }
    }

    /// Appends a middleware factory; middleware run in the order they were added
    pub fn with<F, M>(mut self, middleware_factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        self.middleware_factories.push(Box::new(move || Box::new(middleware_factory())));
        self
    }
}

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!(
            "Starts a route serving HTTP ",
            stringify!($upper_case_method),
            " requests with handlers built by `handler_factory`."
        )]
        pub fn $method<F, H>(handler_factory: F) -> RouteBuilder
        where
            F: Fn() -> H + Send + Sync + 'static,
            H: RequestHandler + 'static,
        {
            RouteBuilder::new(Method::$upper_case_method, handler_factory)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);

#[cfg(test)]
mod tests {
    use super::{delete, get, post, put, Router};
    use crate::handler::{handler_fn, RequestHandler};
    use crate::middleware::{middleware_fn, Flow};
    use http::{Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ok_handler(body: &'static str) -> impl Fn() -> Box<dyn RequestHandler> + Send + Sync + 'static {
        move || -> Box<dyn RequestHandler> {
            Box::new(handler_fn(move |_req, resp| {
                resp.text(StatusCode::OK, body)?;
                Ok(())
            }))
        }
    }

    fn router() -> Router {
        Router::builder()
            .route("/", get(ok_handler("home")))
            .route("/users/[id]", get(ok_handler("show")))
            .route("/users/[id]", put(ok_handler("update")))
            .route("/users/[id]", delete(ok_handler("destroy")))
            .route("/login", post(ok_handler("login")).with(|| middleware_fn(|_req, _resp| Ok(Flow::Continue))))
            .build()
    }

    #[test]
    fn routes_keep_registration_order() {
        let router = router();
        let registered = router.routes().map(|route| (route.method().clone(), route.pattern())).collect::<Vec<_>>();

        assert_eq!(
            registered,
            vec![
                (Method::GET, "/"),
                (Method::GET, "/users/[id]"),
                (Method::PUT, "/users/[id]"),
                (Method::DELETE, "/users/[id]"),
                (Method::POST, "/login"),
            ]
        );
        assert_eq!(router.len(), 5);
        assert!(!router.is_empty());
    }

    #[test]
    fn find_requires_method_and_path() {
        let router = router();

        assert_eq!(router.find(&Method::PUT, "/users/42").map(|route| route.method()), Some(&Method::PUT));
        assert_eq!(router.find(&Method::POST, "/login").map(|route| route.middleware_count()), Some(1));
        assert!(router.find(&Method::POST, "/users/42").is_none());
        assert!(router.find(&Method::GET, "/users/42/extra").is_none());
    }

    #[test]
    fn first_registered_route_wins() {
        let router = Router::builder()
            .route("/a/[x]", get(ok_handler("param")))
            .route("/a/b", get(ok_handler("literal")))
            .build();

        assert_eq!(router.find(&Method::GET, "/a/b").map(|route| route.pattern()), Some("/a/[x]"));
    }

    #[test]
    fn factories_are_not_called_at_registration() {
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let middleware_calls = Arc::new(AtomicUsize::new(0));

        let router = {
            let handler_calls = Arc::clone(&handler_calls);
            let middleware_calls = Arc::clone(&middleware_calls);
            Router::builder()
                .route(
                    "/",
                    get(move || {
                        handler_calls.fetch_add(1, Ordering::SeqCst);
                        handler_fn(|_req, _resp| Ok(()))
                    })
                    .with(move || {
                        middleware_calls.fetch_add(1, Ordering::SeqCst);
                        middleware_fn(|_req, _resp| Ok(Flow::Continue))
                    }),
                )
                .build()
        };

        assert_eq!(router.len(), 1);
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(middleware_calls.load(Ordering::SeqCst), 0);

        let route = router.routes().next().unwrap();
        let _handler = route.create_handler();
        let _middlewares = route.create_middlewares().collect::<Vec<_>>();
        assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
        assert_eq!(middleware_calls.load(Ordering::SeqCst), 1);
    }
}
