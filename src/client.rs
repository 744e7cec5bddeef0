use http::Method;
use oauth1_request::signature_method::SignatureMethod;
use oauth1_request::HmacSha1;
use tracing::{debug, info, warn};
use url::Url;

use crate::response::{download, is_textual};
use crate::template::{Placeholder, TemplateBindings, UrlTemplate};
use crate::token_reader::TokenReader;
use crate::{
    CallOutput, HandshakeState, InvalidStateError, OAuthParameters, ProtocolError,
    ReqwestTransport, RequestBuilder, Result, SecretsProvider, ServiceConfig, SessionAccessor,
    SignedRequest, Signer, TokenPair, Transport, TransportResponse, CONTENT_TYPE_FORM,
    OAUTH_CALLBACK_KEY, OAUTH_TOKEN_KEY,
};

const OUT_OF_BAND: &str = "oob";

/// One signed call against the provider's API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    method: Method,
    url: Url,
    params: Vec<(String, String)>,
    content_type: Option<String>,
    body: Option<Vec<u8>>,
}

impl ApiCall {
    pub fn new(method: Method, url: Url) -> Self {
        ApiCall {
            method,
            url,
            params: Vec::new(),
            content_type: None,
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        ApiCall::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        ApiCall::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        ApiCall::new(Method::PUT, url)
    }

    pub fn delete(url: Url) -> Self {
        ApiCall::new(Method::DELETE, url)
    }

    /// Adds a query parameter. Parameters take part in the signature.
    pub fn param<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn content_type<T: Into<String>>(self, content_type: T) -> Self {
        ApiCall {
            content_type: Some(content_type.into()),
            ..self
        }
    }

    /// Request body. A form-urlencoded body is signed, anything else is sent as is.
    pub fn body<T: Into<Vec<u8>>>(self, body: T) -> Self {
        ApiCall {
            body: Some(body.into()),
            ..self
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn is_form(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().eq_ignore_ascii_case(CONTENT_TYPE_FORM))
            .unwrap_or(false)
    }
}

/// Drives the three-legged handshake and signs API calls.
///
/// The client holds no per-user state: every token lives in the
/// [`SessionAccessor`] passed to each step, so one client can serve many
/// sessions at once.
#[derive(Debug)]
pub struct SessionClient<T, SM = HmacSha1>
where
    T: Transport,
    SM: SignatureMethod + Clone,
{
    config: ServiceConfig,
    transport: T,
    signature_method: SM,
}

impl SessionClient<ReqwestTransport> {
    /// Constructs a client over a blocking reqwest transport, honoring the
    /// configured timeout.
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.get_timeout())?;
        Ok(SessionClient::new(config, transport))
    }
}

impl<T: Transport> SessionClient<T> {
    pub fn new(config: ServiceConfig, transport: T) -> Self {
        SessionClient::with_signature_method(config, transport, HmacSha1)
    }
}

impl<T, SM> SessionClient<T, SM>
where
    T: Transport,
    SM: SignatureMethod + Clone,
{
    pub fn with_signature_method(
        config: ServiceConfig,
        transport: T,
        signature_method: SM,
    ) -> Self {
        SessionClient {
            config,
            transport,
            signature_method,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Obtains a request token and opens a new session with it.
    pub fn request_token(&self) -> Result<SessionAccessor> {
        let credentials = self.config.get_credentials();
        let callback = credentials
            .callback_url()
            .map(Url::as_str)
            .unwrap_or(OUT_OF_BAND);
        let secrets = credentials.secrets();
        let parameters = self.parameters().callback(callback);

        let url = self.config.get_endpoints().request_token.clone();
        let signer = Signer::new(&secrets, parameters);
        let request = RequestBuilder::new(Method::GET, url, signer).sign()?;
        let pair = self.send(request)?.parse_oauth_token()?.into_pair()?;

        let mut accessor = SessionAccessor::new();
        accessor.set_request_token(pair);
        info!("request token obtained");
        Ok(accessor)
    }

    /// The page the user has to visit to approve the request token.
    ///
    /// Pure: nothing is sent and the session is left untouched.
    pub fn authorization_url(&self, accessor: &SessionAccessor, callback: &Url) -> Result<Url> {
        let token = accessor
            .request_token()
            .map(TokenPair::token)
            .ok_or_else(|| {
                state_error(accessor, "authorization_url", HandshakeState::RequestTokenObtained)
            })?;

        let authorize = &self.config.get_endpoints().authorize;
        let mut url = authorize.clone();
        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            // any token or callback baked into the endpoint is replaced
            for (key, value) in authorize.query_pairs() {
                if key != OAUTH_TOKEN_KEY && key != OAUTH_CALLBACK_KEY {
                    pairs.append_pair(&key, &value);
                }
            }
            pairs
                .append_pair(OAUTH_TOKEN_KEY, token)
                .append_pair(OAUTH_CALLBACK_KEY, callback.as_str());
        }
        Ok(url)
    }

    /// Trades the authorized request token for an access token.
    pub fn exchange_access_token(&self, accessor: &mut SessionAccessor) -> Result<()> {
        accessor.require(HandshakeState::UserAuthorized, "exchange_access_token")?;
        let pair = {
            let request_token = accessor.request_token().ok_or_else(|| {
                state_error(accessor, "exchange_access_token", HandshakeState::RequestTokenObtained)
            })?;
            let secrets = self
                .config
                .get_credentials()
                .secrets()
                .token(request_token.token(), request_token.secret());
            let mut parameters = self.parameters();
            if let Some(verifier) = accessor.verifier() {
                parameters = parameters.verifier(verifier);
            }

            let url = self.config.get_endpoints().access_token.clone();
            let signer = Signer::new(&secrets, parameters);
            let request = RequestBuilder::new(Method::GET, url, signer).sign()?;
            self.send(request)?.parse_oauth_token()?.into_pair()?
        };

        accessor.set_access_token(pair);
        info!("access token obtained");
        Ok(())
    }

    /// Signs and sends an API call with the session's access token.
    ///
    /// Textual responses come back as [`CallOutput::Text`]; anything else is
    /// streamed into the download directory.
    pub fn execute_call(&self, accessor: &SessionAccessor, call: ApiCall) -> Result<CallOutput> {
        accessor.require(HandshakeState::AccessTokenObtained, "execute_call")?;
        let access_token = accessor.access_token().ok_or_else(|| {
            state_error(accessor, "execute_call", HandshakeState::AccessTokenObtained)
        })?;

        let secrets = self
            .config
            .get_credentials()
            .secrets()
            .token(access_token.token(), access_token.secret());
        let request = self.build_call(&secrets, call)?;
        let response = self.send(request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text()?;
            warn!(status = status.as_u16(), "api call rejected");
            return Err(ProtocolError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        if is_textual(response.content_type()) {
            return Ok(CallOutput::Text(response.text()?));
        }
        let content_type = response.content_type().unwrap_or_default().to_string();
        let mut body = response.into_body();
        let path = download(&mut body, self.config.get_download_dir(), &content_type)?;
        Ok(CallOutput::Downloaded(path))
    }

    /// Expands a template with `{dossia-api-endpoint}` defaulting to the
    /// configured API base.
    pub fn expand(&self, template: &UrlTemplate<'_>, bindings: &TemplateBindings) -> Result<Url> {
        let mut merged = self.config.template_bindings();
        for placeholder in Placeholder::ALL.iter().copied() {
            if let Some(value) = bindings.get(placeholder) {
                merged.insert(placeholder, value);
            }
        }
        Ok(template.expand(&merged)?)
    }

    fn build_call<S: SecretsProvider>(&self, secrets: &S, call: ApiCall) -> Result<SignedRequest> {
        let is_form = call.is_form();
        let ApiCall {
            method,
            url,
            params,
            content_type,
            body,
        } = call;

        let signer = Signer::new(secrets, self.parameters());
        let mut builder = RequestBuilder::new(method, url, signer);
        if !params.is_empty() {
            builder = builder.query(&params)?;
        }
        builder = match body {
            Some(body) if is_form => match String::from_utf8(body) {
                Ok(form) => builder.form_encoded(form),
                Err(err) => builder.body(err.into_bytes()),
            },
            Some(body) => builder.body(body),
            None => builder,
        };
        if let Some(ref content_type) = content_type {
            builder = builder.content_type(content_type)?;
        }
        if let Some(encoding) = self.config.get_accept_encoding() {
            builder = builder.accept_encoding(encoding)?;
        }
        Ok(builder.sign()?)
    }

    fn parameters(&self) -> OAuthParameters<'_, SM> {
        let parameters = OAuthParameters::new()
            .signature_method(self.signature_method.clone())
            .version(true);
        match self.config.get_realm() {
            Some(realm) => parameters.realm(realm),
            None => parameters,
        }
    }

    fn send(&self, request: SignedRequest) -> Result<TransportResponse> {
        debug!(method = %request.method, url = %request.url, "executing signed request");
        Ok(self.transport.execute(request)?)
    }
}

fn state_error(
    accessor: &SessionAccessor,
    operation: &'static str,
    expected: HandshakeState,
) -> InvalidStateError {
    InvalidStateError {
        operation,
        expected,
        actual: accessor.state(),
    }
}
