//! Request dispatch: route lookup, the middleware chain and the handler call.
//!
//! A dispatch goes through these states and never goes back to scanning once
//! a route was selected:
//!
//! ```text
//! Scanning -> NotFound
//!          -> Matched -> MiddlewareRunning -> Stopped
//!                                          -> HandlerRunning -> Done
//! ```
//!
//! Failures raised by middleware or handlers are not turned into responses
//! here; they come back as [`DispatchError`] for the caller to render.

use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use tracing::{debug, trace};

use crate::error::DispatchError;
use crate::handler::RequestHandler;
use crate::middleware::{Flow, Middleware};
use crate::response::ErrorPage;
use crate::router::Router;
use crate::{RequestContext, ResponseSink};

/// Dispatches requests against a shared, read-only route table.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
}

impl Dispatcher {
    pub fn new(router: impl Into<Arc<Router>>) -> Self {
        Self { router: router.into() }
    }

    /// Handles one request to completion and returns its single terminal response.
    ///
    /// Every call gets its own [`RequestContext`] and [`ResponseSink`]; nothing is
    /// shared between dispatches except the route table. Middleware and the
    /// handler run on the calling thread, so a handler that never returns blocks
    /// this call forever.
    pub fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, DispatchError> {
        let mut sink = ResponseSink::new();

        let Some(route) = self.router.find(request.method(), request.uri().path()) else {
            debug!(method = %request.method(), path = request.uri().path(), "no route matched");
            sink.render_error(&ErrorPage::not_found())?;
            return Self::finish(sink, "");
        };

        debug!(method = %request.method(), path = request.uri().path(), pattern = route.pattern(), "route matched");
        let mut ctx = RequestContext::new(route.pattern(), request);

        for (index, middleware) in route.create_middlewares().enumerate() {
            let flow = middleware
                .handle(&mut ctx, &mut sink)
                .map_err(|source| DispatchError::Middleware { pattern: route.pattern().to_owned(), index, source })?;

            if flow == Flow::Stop {
                trace!(pattern = route.pattern(), index, "middleware stopped the dispatch");
                return Self::finish(sink, route.pattern());
            }
        }

        let handler = route.create_handler();
        handler
            .invoke(&mut ctx, &mut sink)
            .map_err(|source| DispatchError::Handler { pattern: route.pattern().to_owned(), source })?;

        Self::finish(sink, route.pattern())
    }

    fn finish(sink: ResponseSink, pattern: &str) -> Result<Response<Bytes>, DispatchError> {
        sink.into_response().ok_or_else(|| DispatchError::MissingResponse { pattern: pattern.to_owned() })
    }
}
