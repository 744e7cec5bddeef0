use std::borrow::Cow;

use http::Method;
use oauth1_request::signature_method::SignatureMethod;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::{SecretsProvider, OAUTH_KEY_PREFIX, REALM_KEY};

/// Computes `Authorization: OAuth ...` header values for one set of secrets.
#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider, TSignatureMethod>
where
    TSecretsProvider: SecretsProvider,
    TSignatureMethod: SignatureMethod + Clone,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a, TSignatureMethod>,
}

impl<'a, TSecretsProvider, TSignatureMethod> Signer<'a, TSecretsProvider, TSignatureMethod>
where
    TSecretsProvider: SecretsProvider,
    TSignatureMethod: SignatureMethod + Clone,
{
    pub fn new(
        secrets: &'a TSecretsProvider,
        parameters: OAuthParameters<'a, TSignatureMethod>,
    ) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Signs `method url` together with its query string and, when the body
    /// is `application/x-www-form-urlencoded`, the form pairs.
    pub fn authorization(&self, method: &Method, url: &Url, form_body: Option<&str>) -> String {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let options = self.parameters.build_options(token);

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        // every non-oauth pair, percent-encoded, sorted by encoded key then value
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .chain(
                form_body
                    .map(|body| url::form_urlencoded::parse(body.as_bytes()))
                    .into_iter()
                    .flatten(),
            )
            .filter(|(k, _)| !k.starts_with(OAUTH_KEY_PREFIX))
            .map(|(k, v)| (encode(&k), encode(&v)))
            .collect();
        pairs.sort();

        // pairs sorting before "oauth_" go in first, the rest after the oauth block
        let split_at = pairs
            .iter()
            .position(|(k, _)| k.as_str() > OAUTH_KEY_PREFIX)
            .unwrap_or_else(|| pairs.len());
        let (before_oauth, after_oauth) = pairs.split_at(split_at);

        let sig_method = self.parameters.signature_method.clone();
        let mut signer = if form_body.is_some() {
            OAuthSigner::form_with_signature_method(
                sig_method,
                method.as_str(),
                base_url,
                consumer_secret,
                token_secret,
            )
        } else {
            OAuthSigner::with_signature_method(
                sig_method,
                method.as_str(),
                base_url,
                consumer_secret,
                token_secret,
            )
        };

        // oauth1-request copies keys into the base string as is, so they go in
        // encoded twice; only the header is kept from its output
        for (key, value) in before_oauth {
            signer.parameter_encoded(&encode(key), value);
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in after_oauth {
            signer.parameter_encoded(&encode(key), value);
        }

        let sign = signer.finish().authorization;

        match self.parameters.realm {
            Some(ref realm) => format!("{},{}=\"{}\"", sign, REALM_KEY, realm),
            None => sign,
        }
    }
}

/// RFC 3986 unreserved characters stay as they are.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, OAUTH_ENCODE_SET).to_string()
}

/// Per-signature OAuth protocol parameters.
///
/// Nonce and timestamp are generated by oauth1-request unless pinned here.
#[derive(Debug, Clone)]
pub struct OAuthParameters<'a, TSignatureMethod>
where
    TSignatureMethod: SignatureMethod + Clone,
{
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    signature_method: TSignatureMethod,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl Default for OAuthParameters<'static, HmacSha1> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            realm: None,
            signature_method: HmacSha1,
            timestamp: None,
            verifier: None,
            version: false,
        }
    }
}

impl<'a> OAuthParameters<'a, HmacSha1> {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<'a, T> OAuthParameters<'a, T>
where
    T: SignatureMethod + Clone,
{
    /// Replaces the signature method, keeping every other parameter.
    pub fn signature_method<TSignatureMethod>(
        self,
        signature_method: TSignatureMethod,
    ) -> OAuthParameters<'a, TSignatureMethod>
    where
        TSignatureMethod: SignatureMethod + Clone,
    {
        OAuthParameters {
            signature_method,
            callback: self.callback,
            nonce: self.nonce,
            realm: self.realm,
            timestamp: self.timestamp,
            verifier: self.verifier,
            version: self.version,
        }
    }

    /// set the oauth_callback value
    pub fn callback<C>(self, callback: C) -> Self
    where
        C: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    pub fn nonce<C>(self, nonce: C) -> Self
    where
        C: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm appended to the Authorization header
    pub fn realm<C>(self, realm: C) -> Self
    where
        C: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<C>(self, timestamp: C) -> Self
    where
        C: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<C>(self, verifier: C) -> Self
    where
        C: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// `true` sends `oauth_version="1.0"`, `false` omits the parameter.
    pub fn version<C>(self, version: C) -> Self
    where
        C: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    fn build_options<'s>(&'s self, token: Option<&'s str>) -> Options<'s> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order

        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_ref());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_ref());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_ref());
        }
        opt.version(self.version);

        opt
    }
}
