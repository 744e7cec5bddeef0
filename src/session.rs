use std::fmt;

use tracing::debug;

use crate::{AuthorizationCallback, Error, InvalidStateError, ProtocolError};

/// Position of a [`SessionAccessor`] in the three-legged handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    Unauthenticated,
    RequestTokenObtained,
    UserAuthorized,
    AccessTokenObtained,
}

impl HandshakeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            HandshakeState::Unauthenticated => "unauthenticated",
            HandshakeState::RequestTokenObtained => "request_token_obtained",
            HandshakeState::UserAuthorized => "user_authorized",
            HandshakeState::AccessTokenObtained => "access_token_obtained",
        }
    }
}

impl Default for HandshakeState {
    fn default() -> Self {
        HandshakeState::Unauthenticated
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token and its secret as issued by the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    token: String,
    secret: String,
}

impl TokenPair {
    pub fn new<TToken, TSecret>(token: TToken, secret: TSecret) -> Self
    where
        TToken: Into<String>,
        TSecret: Into<String>,
    {
        TokenPair {
            token: token.into(),
            secret: secret.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token holder for one authentication flow.
///
/// Lives in memory only. Fields are mutated in place, so a value shared
/// between threads must be guarded by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAccessor {
    state: HandshakeState,
    request_token: Option<TokenPair>,
    access_token: Option<TokenPair>,
    verifier: Option<String>,
}

impl SessionAccessor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Restores a session from an access token obtained earlier.
    pub fn with_access_token<TToken, TSecret>(token: TToken, secret: TSecret) -> Self
    where
        TToken: Into<String>,
        TSecret: Into<String>,
    {
        SessionAccessor {
            state: HandshakeState::AccessTokenObtained,
            request_token: None,
            access_token: Some(TokenPair::new(token, secret)),
            verifier: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn request_token(&self) -> Option<&TokenPair> {
        self.request_token.as_ref()
    }

    pub fn access_token(&self) -> Option<&TokenPair> {
        self.access_token.as_ref()
    }

    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    /// Records the provider's redirect back to the application.
    ///
    /// The callback must carry the request token this session holds.
    pub fn authorize(&mut self, callback: &AuthorizationCallback) -> Result<(), Error> {
        self.require(HandshakeState::RequestTokenObtained, "authorize")?;
        let expected = self
            .request_token
            .as_ref()
            .map(TokenPair::token)
            .unwrap_or_default();
        if callback.token() != expected {
            return Err(ProtocolError::CallbackTokenMismatch {
                expected: expected.to_string(),
                actual: callback.token().to_string(),
            }
            .into());
        }

        self.verifier = callback.verifier().map(str::to_string);
        self.transition(HandshakeState::UserAuthorized);
        Ok(())
    }

    /// Drops every token and starts over.
    pub fn reset(&mut self) {
        *self = SessionAccessor::new();
    }

    pub(crate) fn set_request_token(&mut self, pair: TokenPair) {
        self.request_token = Some(pair);
        self.access_token = None;
        self.verifier = None;
        self.transition(HandshakeState::RequestTokenObtained);
    }

    pub(crate) fn set_access_token(&mut self, pair: TokenPair) {
        self.access_token = Some(pair);
        self.request_token = None;
        self.verifier = None;
        self.transition(HandshakeState::AccessTokenObtained);
    }

    pub(crate) fn require(
        &self,
        expected: HandshakeState,
        operation: &'static str,
    ) -> Result<(), InvalidStateError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(InvalidStateError {
                operation,
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!(from = self.state.as_str(), to = next.as_str(), "handshake transition");
        self.state = next;
    }
}
