use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::{
    ProtocolError, Result, TokenPair, TokenReaderError, TokenReaderResult, TransportResponse,
    OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY,
};

/// Represents response of token acquisition.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents, e.g. `oauth_callback_confirmed`
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl TokenResponse {
    /// Converts into a token pair, refusing an empty token.
    pub fn into_pair(self) -> TokenReaderResult<TokenPair> {
        if self.oauth_token.is_empty() {
            return Err(TokenReaderError::EmptyToken(OAUTH_TOKEN_KEY));
        }
        Ok(TokenPair::new(self.oauth_token, self.oauth_token_secret))
    }
}

/// Add parse_oauth_token feature to a transport response.
// this trait is sealed
pub trait TokenReader: private::Sealed {
    fn parse_oauth_token(self) -> Result<TokenResponse>;
}

impl TokenReader for TransportResponse {
    fn parse_oauth_token(self) -> Result<TokenResponse> {
        let status = self.status();
        let text = self.text()?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "token endpoint rejected the request");
            return Err(ProtocolError::Rejected {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        Ok(read_oauth_token(text)?)
    }
}

/// Parses an `application/x-www-form-urlencoded` token response.
pub fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.trim().as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

mod private {
    use crate::TransportResponse;

    pub trait Sealed {}
    impl Sealed for TransportResponse {}
}
