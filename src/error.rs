use thiserror::Error;

use crate::HandshakeState;

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport failed : {0}")]
    Transport(#[from] TransportError),
    #[error("OAuth exchange failed : {0}")]
    Protocol(#[from] ProtocolError),
    #[error("handshake step out of order : {0}")]
    InvalidState(#[from] InvalidStateError),
    #[error("invalid configuration : {0}")]
    Config(#[from] ConfigError),
    #[error("URL template could not be expanded : {0}")]
    Template(#[from] TemplateError),
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
}

impl Error {
    /// Whether the same call may succeed if simply retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Whether the handshake has to be restarted from a fresh request token.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}

impl From<TokenReaderError> for Error {
    fn from(err: TokenReaderError) -> Self {
        Error::Protocol(err.into())
    }
}

/// Network or local IO failure while talking to the provider.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error : {source}")]
    Network {
        #[source]
        source: BoxError,
    },
    #[error("I/O error : {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Wraps a transport-specific network error.
    pub fn network(src: impl std::error::Error + Send + Sync + 'static) -> Self {
        TransportError::Network {
            source: Box::new(src),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::network(err)
    }
}

/// The provider rejected the exchange or answered with something unreadable.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("provider rejected the request with status {status} : {body}")]
    Rejected { status: u16, body: String },
    #[error("{0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("callback carries token {actual}, but the session holds {expected}")]
    CallbackTokenMismatch { expected: String, actual: String },
    #[error("callback URL has no oauth_token parameter : {0}")]
    MissingCallbackToken(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} requires the session to be {expected}, but it is {actual}")]
pub struct InvalidStateError {
    pub operation: &'static str,
    pub expected: HandshakeState,
    pub actual: HandshakeState,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("{name} is not a valid URL : {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{name} is not a valid number : {source}")]
    InvalidNumber {
        name: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("HTTP client could not be constructed : {0}")]
    HttpClientBuild(#[source] reqwest::Error),
    #[error("callback URL could not be derived from {request_url} : {source}")]
    Callback {
        request_url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unbound placeholders {0:?}")]
    Unbound(Vec<String>),
    #[error("expanded template {url} is not a valid URL : {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Error, Debug)]
pub enum SignError {
    #[error("parameters could not be encoded : {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
    #[error("response carries an empty {0}")]
    EmptyToken(&'static str),
}
