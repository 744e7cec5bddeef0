use url::Url;

use crate::{ConfigError, ProtocolError, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY};

/// Query pair appended to derived callbacks so the returning page knows the
/// user comes back from the provider.
pub const CALLBACK_OPERATION: (&str, &str) = ("operation", "accessToken");

/// The inbound web request that is about to redirect the user to the provider.
pub trait RequestContext {
    /// Absolute URL of the current request.
    fn request_url(&self) -> &Url;

    /// Path of the current page. Only its final segment is used.
    fn request_path(&self) -> &str;
}

impl<T: RequestContext + ?Sized> RequestContext for &T {
    fn request_url(&self) -> &Url {
        (**self).request_url()
    }

    fn request_path(&self) -> &str {
        (**self).request_path()
    }
}

/// Derives the callback for the authorize step from the current request.
///
/// The final segment of `request_path` is resolved against the directory of
/// the request URL; any query on the request is dropped.
pub fn callback_url<C: RequestContext>(ctx: &C) -> Result<Url, ConfigError> {
    let request_url = ctx.request_url();
    let page = ctx.request_path().rsplit('/').next().unwrap_or_default();
    let mut url = request_url
        .join(page)
        .map_err(|source| ConfigError::Callback {
            request_url: request_url.to_string(),
            source,
        })?;
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut()
        .append_pair(CALLBACK_OPERATION.0, CALLBACK_OPERATION.1);
    Ok(url)
}

/// What the provider hands back when it redirects the user after approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    token: String,
    verifier: Option<String>,
}

impl AuthorizationCallback {
    pub fn new<T: Into<String>>(token: T, verifier: Option<String>) -> Self {
        AuthorizationCallback {
            token: token.into(),
            verifier,
        }
    }

    /// Reads `oauth_token` and `oauth_verifier` from the redirect URL.
    pub fn from_url(url: &Url) -> Result<Self, ProtocolError> {
        let mut token = None;
        let mut verifier = None;
        for (key, value) in url.query_pairs() {
            match &*key {
                OAUTH_TOKEN_KEY if token.is_none() => token = Some(value.into_owned()),
                OAUTH_VERIFIER_KEY if verifier.is_none() => verifier = Some(value.into_owned()),
                _ => {}
            }
        }
        match token {
            Some(token) if !token.is_empty() => Ok(AuthorizationCallback { token, verifier }),
            _ => Err(ProtocolError::MissingCallbackToken(url.to_string())),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }
}
