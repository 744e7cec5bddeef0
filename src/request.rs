use std::convert::TryFrom;

use http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE,
};
use http::Method;
use oauth1_request::signature_method::SignatureMethod;
use serde::Serialize;
use url::Url;

use crate::{SecretsProvider, SignError, SignResult, Signer, CONTENT_TYPE_FORM};

/// A fully signed outgoing call, ready to be handed to a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl SignedRequest {
    /// The `Authorization` header, if the request carries one.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Collects the parts of a request and signs them in one go.
pub struct RequestBuilder<'a, TSecretsProvider, TSignatureMethod>
where
    TSecretsProvider: SecretsProvider,
    TSignatureMethod: SignatureMethod + Clone,
{
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    form: Option<String>,
    signer: Signer<'a, TSecretsProvider, TSignatureMethod>,
}

impl<'a, TSecretsProvider, TSignatureMethod> RequestBuilder<'a, TSecretsProvider, TSignatureMethod>
where
    TSecretsProvider: SecretsProvider,
    TSignatureMethod: SignatureMethod + Clone,
{
    pub fn new(
        method: Method,
        url: Url,
        signer: Signer<'a, TSecretsProvider, TSignatureMethod>,
    ) -> Self {
        RequestBuilder {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            form: None,
            signer,
        }
    }

    /// Modify the query string of the URL.
    ///
    /// Appends the serialized pairs; existing pairs with the same key are kept.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> SignResult<Self> {
        {
            let mut pairs = self.url.query_pairs_mut();
            let serializer = serde_urlencoded::Serializer::new(&mut pairs);
            query.serialize(serializer)?;
        }
        if let Some("") = self.url.query() {
            self.url.set_query(None);
        }
        Ok(self)
    }

    /// Send a form body. Form pairs take part in the signature.
    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> SignResult<Self> {
        let body = serde_urlencoded::to_string(form)?;
        Ok(self.form_encoded(body))
    }

    /// Send an already encoded `application/x-www-form-urlencoded` body.
    pub fn form_encoded(mut self, body: String) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_FORM));
        self.body = Some(body.clone().into_bytes());
        self.form = Some(body);
        self
    }

    /// Set an opaque request body; it is not part of the signature.
    pub fn body<T: Into<Vec<u8>>>(mut self, body: T) -> Self {
        self.body = Some(body.into());
        self.form = None;
        self
    }

    /// Add a `Header` to this Request.
    pub fn header<K, V>(mut self, key: K, value: V) -> SignResult<Self>
    where
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        let name = HeaderName::try_from(key).map_err(|_| SignError::InvalidHeader("name"))?;
        let value = HeaderValue::try_from(value)
            .map_err(|_| SignError::InvalidHeader(header_label(&name)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn content_type(self, content_type: &str) -> SignResult<Self> {
        self.header(CONTENT_TYPE, content_type)
    }

    pub fn accept_encoding(self, encoding: &str) -> SignResult<Self> {
        self.header(ACCEPT_ENCODING, encoding)
    }

    /// Generate the OAuth signature and freeze the request.
    pub fn sign(mut self) -> SignResult<SignedRequest> {
        let authorization =
            self.signer
                .authorization(&self.method, &self.url, self.form.as_deref());
        let value = HeaderValue::try_from(authorization)
            .map_err(|_| SignError::InvalidHeader("authorization"))?;
        self.headers.insert(AUTHORIZATION, value);

        Ok(SignedRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        })
    }
}

fn header_label(name: &HeaderName) -> &'static str {
    if *name == CONTENT_TYPE {
        "content-type"
    } else if *name == ACCEPT_ENCODING {
        "accept-encoding"
    } else {
        "value"
    }
}
