//! The application server: accepts connections and feeds requests to the dispatcher.
//!
//! The server is the layer above the [`Dispatcher`]: it is the one place that
//! turns a failed dispatch into a rendered error page.

use std::convert::Infallible;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use lattice_http::connection::HttpConnection;
use lattice_http::handler::Handler;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::response::ErrorPage;
use crate::router::Router;
use crate::HttpError;

const FAILURE_MESSAGE: &str = "Something went wrong, please try again later";

#[derive(Debug)]
pub struct ServerBuilder {
    router: Option<Router>,
    address: Option<io::Result<Vec<SocketAddr>>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, address: None }
    }

    /// Sets the address to listen on; resolution errors are reported by [`ServerBuilder::build`]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self
            .address
            .ok_or(ServerBuildError::MissingAddress)?
            .map_err(|source| ServerBuildError::InvalidAddress { source })?;
        if address.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }

        Ok(Server { dispatcher: Arc::new(Dispatcher::new(router)), address })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("address can't be resolved: {source}")]
    InvalidAddress { source: io::Error },
}

#[derive(Debug)]
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    address: Vec<SocketAddr>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn address(&self) -> &[SocketAddr] {
        &self.address
    }

    /// Installs the log subscriber, binds the configured address and serves until the process ends.
    pub async fn start(self) {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "a global subscriber is already set, keep using it");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        self.listen(tcp_listener).await;
    }

    /// Serves connections accepted from `tcp_listener`, one task per connection.
    pub async fn listen(self, tcp_listener: TcpListener) {
        let handler = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(handler).await {
                    Ok(_) => {
                        info!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, "service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }

    /// Dispatches `request` on the blocking pool and renders any failure as an error page.
    pub async fn serve(&self, request: Request<Bytes>) -> Response<Bytes> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        match tokio::task::spawn_blocking(move || dispatcher.dispatch(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let page = failure_page(&e);
                if page.status().is_server_error() {
                    error!(%method, path = %path, cause = %e, "dispatch failed");
                } else {
                    warn!(%method, path = %path, cause = %e, "dispatch rejected");
                }
                page.to_response()
            }
            Err(e) => {
                error!(%method, path = %path, cause = %e, "dispatch panicked or was cancelled");
                HttpError::internal_server_error(FAILURE_MESSAGE).to_error_page().to_response()
            }
        }
    }
}

#[async_trait]
impl Handler for Server {
    type Error = Infallible;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
        Ok(self.serve(req).await)
    }
}

/// The page for a failed dispatch: the raised [`HttpError`] if there is one, a 500 otherwise.
fn failure_page(error: &DispatchError) -> ErrorPage {
    match error.http_error() {
        Some(http_error) => http_error.to_error_page(),
        None => HttpError::internal_server_error(FAILURE_MESSAGE).to_error_page(),
    }
}
