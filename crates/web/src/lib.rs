//! A small synchronous request router on top of `lattice-http`.
//!
//! Routes pair an HTTP method and a path pattern such as `/users/[id]` with a
//! handler factory and an ordered list of middleware factories. The
//! [`Dispatcher`] picks the first registered route matching a request, runs
//! its middleware chain and then its handler, or answers with a 404 page.
//! The [`Server`] serves a router over HTTP/1.1 and renders failed
//! dispatches as error pages.

mod dispatcher;
mod request;
mod response;
mod server;

pub mod error;
pub mod handler;
pub mod middleware;
pub mod router;
pub mod session;
pub mod validator;

pub use dispatcher::Dispatcher;
pub use error::BoxError;
pub use error::DispatchError;
pub use error::HttpError;
pub use error::ResponseError;
pub use request::PathParams;
pub use request::RequestContext;
pub use response::ErrorPage;
pub use response::ResponseSink;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
