#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use dossia_oauth1::{
    Credentials, ServiceConfig, ServiceEndpoints, SignedRequest, StatusCode, Transport,
    TransportError, TransportResponse, Url,
};

pub const CONSUMER_KEY: &str = "consumer-it";
pub const CONSUMER_SECRET: &str = "consumer-secret-it";
pub const REQUEST_TOKEN: &str = "req token/1";
pub const REQUEST_SECRET: &str = "req-secret";
pub const ACCESS_TOKEN: &str = "acc-token";
pub const ACCESS_SECRET: &str = "acc-secret";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0xff];

type Responder =
    dyn Fn(&SignedRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// In-memory transport that records every request it is handed.
pub struct FakeTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<SignedRequest>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&SignedRequest) -> Result<TransportResponse, TransportError> + Send + Sync + 'static,
    {
        FakeTransport {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers the token endpoints like the provider and the API paths
    /// `/xml` and `/png` with fixed bodies.
    pub fn provider() -> Self {
        FakeTransport::new(|request| Ok(provider_response(request)))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SignedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: SignedRequest) -> Result<TransportResponse, TransportError> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

pub fn provider_response(request: &SignedRequest) -> TransportResponse {
    let text = |body: String| {
        TransportResponse::from_bytes(StatusCode::OK, Some("text/plain"), body.into_bytes())
    };
    match request.url.path() {
        "/oauth/request_token" => text(format!(
            "oauth_token={}&oauth_token_secret={}&oauth_callback_confirmed=true",
            "req+token%2F1", REQUEST_SECRET
        )),
        "/oauth/access_token" => text(format!(
            "oauth_token={}&oauth_token_secret={}",
            ACCESS_TOKEN, ACCESS_SECRET
        )),
        "/xml" => TransportResponse::from_bytes(
            StatusCode::OK,
            Some("text/xml; charset=UTF-8"),
            b"<records/>".to_vec(),
        ),
        "/png" => {
            TransportResponse::from_bytes(StatusCode::OK, Some("image/png"), PNG_BYTES.to_vec())
        }
        _ => TransportResponse::from_bytes(StatusCode::NOT_FOUND, None, b"missing".to_vec()),
    }
}

pub fn endpoints(base: &str) -> ServiceEndpoints {
    let url = |path: &str| Url::parse(&format!("{}{}", base, path)).unwrap();
    ServiceEndpoints::new(
        url("/oauth/request_token"),
        url("/oauth/authorize"),
        url("/oauth/access_token"),
    )
}

pub fn config(base: &str, download_dir: &Path) -> ServiceConfig {
    ServiceConfig::new(Credentials::new(CONSUMER_KEY, CONSUMER_SECRET))
        .endpoints(endpoints(base))
        .api_base(Url::parse(base).unwrap())
        .download_dir(download_dir)
}

pub fn api_url(base: &str, path: &str) -> Url {
    Url::parse(&format!("{}{}", base, path)).unwrap()
}
