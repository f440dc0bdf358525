//! Stream transport for engine requests.
//!
//! # Responsibilities
//! - Dial the endpoint (Unix socket or TCP)
//! - Run one HTTP/1.1 exchange over the fresh connection
//! - Drive the connection inside the caller's future so a timeout or drop
//!   cancels everything; no detached connection tasks
//!
//! # Design Decisions
//! - One connection per call; the engine is local and calls are infrequent
//! - Dial and exchange are separate steps so failures can be attributed

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::rpc::endpoint::Endpoint;

/// Byte stream to the engine.
pub(crate) trait EngineIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> EngineIo for T {}

/// Open a stream to the endpoint.
pub(crate) async fn connect(endpoint: &Endpoint) -> std::io::Result<Box<dyn EngineIo>> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let stream = tokio::net::UnixStream::connect(path).await?;
            Ok(Box::new(stream))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        )),
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
    }
}

/// Failure after the connection was open.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ExchangeError {
    #[error(transparent)]
    Http(#[from] hyper::Error),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Send one request and read the response, at most `limit` body bytes.
pub(crate) async fn exchange(
    io: Box<dyn EngineIo>,
    request: Request<Full<Bytes>>,
    limit: usize,
) -> Result<(StatusCode, Bytes), ExchangeError> {
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;

    // `sender` is moved in and dropped when the response is read, which lets
    // the connection future finish.
    let response = async move {
        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = Limited::new(response.into_body(), limit)
            .collect()
            .await
            .map_err(|e| match e.downcast::<hyper::Error>() {
                Ok(e) => ExchangeError::Http(*e),
                Err(e) if e.is::<LengthLimitError>() => ExchangeError::BodyTooLarge { limit },
                Err(e) => ExchangeError::Body(e.to_string()),
            })?
            .to_bytes();
        Ok::<_, ExchangeError>((status, body))
    };

    let (result, connection_result) = tokio::join!(response, connection);
    if let Err(e) = connection_result {
        tracing::trace!(error = %e, "Engine connection closed with error");
    }
    result
}
