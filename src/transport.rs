//! Transport seam between the session client and the network.
//!
//! [`SessionClient`](crate::SessionClient) only ever talks to a [`Transport`].
//! [`ReqwestTransport`] is the blocking reqwest implementation used in
//! production; tests inject their own.

use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::StatusCode;
use reqwest::blocking::Client as ReqwestClient;
use tracing::debug;

use crate::{ConfigError, SignedRequest, TransportError};

/// Streaming response body.
pub type ResponseBody = Box<dyn Read + Send>;

/// Executes signed requests synchronously.
///
/// Implementations must not retry; callers decide on backoff.
pub trait Transport: Send + Sync {
    fn execute(&self, request: SignedRequest) -> Result<TransportResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: SignedRequest) -> Result<TransportResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: SignedRequest) -> Result<TransportResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: SignedRequest) -> Result<TransportResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Status, content type and a not yet consumed body.
pub struct TransportResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: ResponseBody,
}

impl TransportResponse {
    pub fn new<R>(status: StatusCode, content_type: Option<String>, body: R) -> Self
    where
        R: Read + Send + 'static,
    {
        TransportResponse {
            status,
            content_type,
            body: Box::new(body),
        }
    }

    /// Builds a response around an in-memory body.
    pub fn from_bytes(status: StatusCode, content_type: Option<&str>, body: Vec<u8>) -> Self {
        TransportResponse::new(status, content_type.map(str::to_string), Cursor::new(body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Reads the whole body as text; invalid UTF-8 is replaced.
    pub fn text(mut self) -> Result<String, TransportError> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Blocking reqwest client behind the [`Transport`] seam.
#[derive(Clone, Debug)]
pub struct ReqwestTransport(ReqwestClient);

impl ReqwestTransport {
    /// Constructs a transport with reqwest's default settings.
    pub fn new() -> Result<Self, ConfigError> {
        ReqwestTransport::with_timeout(None)
    }

    /// Constructs a transport that gives up after `timeout`; `None` keeps
    /// reqwest's default.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ConfigError::HttpClientBuild)?;
        Ok(ReqwestTransport(client))
    }

    /// Wraps an existing reqwest client.
    pub fn with_client(client: ReqwestClient) -> Self {
        ReqwestTransport(client)
    }
}

impl From<ReqwestClient> for ReqwestTransport {
    fn from(client: ReqwestClient) -> Self {
        ReqwestTransport::with_client(client)
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: SignedRequest) -> Result<TransportResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending signed request");

        let mut builder = self
            .0
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send()?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(status = status.as_u16(), content_type = ?content_type, "response received");

        Ok(TransportResponse::new(status, content_type, response))
    }
}
