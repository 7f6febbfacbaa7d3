use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::{HeaderValue, Request, Response, StatusCode, Version, header};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::ConnectionError;

/// An HTTP connection serving requests one at a time
///
/// `HttpConnection` handles the full lifecycle of an HTTP/1.x connection:
/// - Reading and decoding requests
/// - Handing each request to the [`Handler`] exactly once
/// - Writing the response before the next request is read
/// - Closing on `Connection: close` or a malformed request
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), ConnectionError>
    where
        H: Handler,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(request)) => {
                    let keep_alive = is_keep_alive(&request);
                    debug!(method = %request.method(), uri = %request.uri(), "receive request");

                    let response_result = handler.call(request).await;
                    self.send_response(response_result, keep_alive).await?;

                    if !keep_alive {
                        info!("client asked to close, connection shutdown");
                        return Ok(());
                    }
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    self.do_send_response(build_error_response(StatusCode::BAD_REQUEST), false).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn send_response<E>(
        &mut self,
        response_result: Result<Response<Bytes>, E>,
        keep_alive: bool,
    ) -> Result<(), ConnectionError>
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response, keep_alive).await,
            Err(e) => {
                error!("handle response error, cause: {}", e.into());
                self.do_send_response(build_error_response(StatusCode::INTERNAL_SERVER_ERROR), keep_alive).await
            }
        }
    }

    async fn do_send_response(
        &mut self,
        mut response: Response<Bytes>,
        keep_alive: bool,
    ) -> Result<(), ConnectionError> {
        let headers = response.headers_mut();
        if !headers.contains_key(header::DATE) {
            if let Some(date) = http_date() {
                headers.insert(header::DATE, date);
            }
        }
        if !keep_alive {
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        }

        // `send` flushes, so the client sees the response before the next read
        self.framed_write.send(response).await?;
        Ok(())
    }
}

fn is_keep_alive(request: &Request<Bytes>) -> bool {
    let connection = request.headers().get(header::CONNECTION).map(HeaderValue::as_bytes);
    match request.version() {
        Version::HTTP_10 => connection.is_some_and(|value| value.eq_ignore_ascii_case(b"keep-alive")),
        _ => !connection.is_some_and(|value| value.eq_ignore_ascii_case(b"close")),
    }
}

fn http_date() -> Option<HeaderValue> {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    HeaderValue::from_bytes(&buf[..]).ok()
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status_code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use std::io;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn run(input: &'static [u8]) -> (String, Result<(), ConnectionError>) {
        let (client, server) = tokio::io::duplex(16 * 1024);
        let (reader, writer) = tokio::io::split(server);

        let handler = Arc::new(make_handler(|req: Request<Bytes>| async move {
            if req.uri().path() == "/fail" {
                return Err(io::Error::other("handler failed"));
            }
            Ok(Response::new(Bytes::from(format!("path={}", req.uri().path()))))
        }));

        let task = tokio::spawn(HttpConnection::new(reader, writer).process(handler));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(input).await.unwrap();

        let mut output = String::new();
        client_read.read_to_string(&mut output).await.unwrap();
        (output, task.await.unwrap())
    }

    #[tokio::test]
    async fn serves_requests_in_order_until_close() {
        let input = b"GET /first HTTP/1.1\r\n\r\nGET /second HTTP/1.1\r\nConnection: close\r\n\r\n";
        let (output, result) = run(input).await;

        assert!(result.is_ok());
        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 2);
        let first = output.find("path=/first").unwrap();
        let second = output.find("path=/second").unwrap();
        assert!(first < second);
        assert!(output.contains("connection: close\r\n"));
        assert!(output.contains("date: "));
    }

    #[tokio::test]
    async fn http_10_closes_by_default() {
        let (output, result) = run(b"GET /only HTTP/1.0\r\n\r\nGET /never HTTP/1.0\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(output.contains("path=/only"));
        assert!(!output.contains("path=/never"));
    }

    #[tokio::test]
    async fn handler_error_becomes_500() {
        let (output, result) = run(b"GET /fail HTTP/1.1\r\nConnection: close\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_becomes_400_and_closes() {
        let (output, result) = run(b"GET / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n").await;

        assert!(matches!(result, Err(ConnectionError::RequestError { .. })));
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn keep_alive_rules() {
        let request = Request::builder().version(Version::HTTP_11).body(Bytes::new()).unwrap();
        assert!(is_keep_alive(&request));

        let request =
            Request::builder().version(Version::HTTP_11).header("connection", "Close").body(Bytes::new()).unwrap();
        assert!(!is_keep_alive(&request));

        let request =
            Request::builder().version(Version::HTTP_10).header("connection", "keep-alive").body(Bytes::new()).unwrap();
        assert!(is_keep_alive(&request));
    }
}
