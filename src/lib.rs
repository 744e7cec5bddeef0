/*!
dossia-oauth1: OAuth 1.0a sessions against the Dossia health-record API,
built on [reqwest](https://crates.io/crates/reqwest) and
[oauth1-request](https://crates.io/crates/oauth1-request).

# Overview

A [`SessionClient`] walks a [`SessionAccessor`] through the three-legged
handshake (request token, user authorization, access token) and then signs
API calls with the access token. Textual responses are returned as text,
binary ones are streamed into `download<timestamp>.<subtype>` files.

The client itself carries no per-user state, so one client can drive any
number of sessions concurrently.

# How to use

```no_run
use dossia_oauth1::template::{self, Placeholder, TemplateBindings};
use dossia_oauth1::{ApiCall, AuthorizationCallback, Credentials, ServiceConfig, SessionClient, Url};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let callback = Url::parse("https://app.example.org/records?operation=accessToken")?;
let credentials = Credentials::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]").callback(callback.clone());
let client = SessionClient::from_config(ServiceConfig::new(credentials))?;

// step 1: acquire a request token
let mut session = client.request_token()?;

// step 2: send the user to the provider
let authorize = client.authorization_url(&session, &callback)?;
println!("please visit: {}", authorize);

// ... the provider redirects back to the callback
let redirect = Url::parse("https://app.example.org/records?oauth_token=...&oauth_verifier=...")?;
session.authorize(&AuthorizationCallback::from_url(&redirect)?)?;

// step 3: trade it for an access token
client.exchange_access_token(&mut session)?;

// signed calls
let bindings = TemplateBindings::new().bind(Placeholder::RecordId, "[RECORD_ID]");
let url = client.expand(&template::ROOT_LEVEL_DOCUMENTS, &bindings)?;
let output = client.execute_call(&session, ApiCall::get(url))?;
if let Some(xml) = output.as_text() {
    println!("{}", xml);
}
# Ok(())
# }
```
*/
mod callback;
mod client;
mod config;
mod error;
mod request;
mod response;
mod secrets;
mod session;
mod signer;
pub mod template;
mod token_reader;
mod transport;

// exposed to external program
pub use callback::{callback_url, AuthorizationCallback, RequestContext, CALLBACK_OPERATION};
pub use client::{ApiCall, SessionClient};
pub use config::{
    ServiceConfig, ServiceEndpoints, DOSSIA_ACCESS_TOKEN_URL, DOSSIA_AUTHORIZE_URL,
    DOSSIA_REQUEST_TOKEN_URL,
};
pub use error::{
    ConfigError, Error, InvalidStateError, ProtocolError, Result, SignError, SignResult,
    TemplateError, TokenReaderError, TokenReaderResult, TransportError,
};
pub use request::{RequestBuilder, SignedRequest};
pub use response::{
    download_extension, extract_document_id, is_textual, CallOutput, CONTENT_TYPE_BMP,
    CONTENT_TYPE_GIF, CONTENT_TYPE_HTML, CONTENT_TYPE_JPG, CONTENT_TYPE_PDF, CONTENT_TYPE_PLAIN,
    CONTENT_TYPE_PNG, CONTENT_TYPE_TEXT_XML, CONTENT_TYPE_XML, DOWNLOAD_FILE_PREFIX,
};
pub use secrets::{Credentials, Secrets, SecretsProvider};
pub use session::{HandshakeState, SessionAccessor, TokenPair};
pub use signer::{OAuthParameters, Signer};
pub use token_reader::{read_oauth_token, TokenReader, TokenResponse};
pub use template::{Placeholder, TemplateBindings, UrlTemplate};
pub use transport::{ReqwestTransport, ResponseBody, Transport, TransportResponse};

pub use http::{Method, StatusCode};
pub use oauth1_request::HmacSha1;
pub use url::Url;

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";
/// `application/x-www-form-urlencoded`; bodies of this type are signed.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
