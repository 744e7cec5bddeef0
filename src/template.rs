//! Resource URL templates of the Dossia REST API.
//!
//! Templates carry `{name}` placeholders. Substitution is a single pass over
//! exact tokens: a bound value is inserted literally and never rescanned, and
//! a token that is unknown or unbound is copied through untouched.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::TemplateError;

/// Base URL of the Dossia v2.0 REST services.
pub const DOSSIA_API_ENDPOINT: &str = "https://dev-api.dossia.org/dossia-restful-api/services/v2.0";

pub const ALL_RECORDS: UrlTemplate<'static> =
    UrlTemplate::from_static("{dossia-api-endpoint}/records/");
pub const ROOT_LEVEL_DOCUMENTS: UrlTemplate<'static> =
    UrlTemplate::from_static("{dossia-api-endpoint}/records/{record-id}/documents/");
pub const RETRIEVE_DOCUMENT: UrlTemplate<'static> =
    UrlTemplate::from_static("{dossia-api-endpoint}/records/{record-id}/documents/{document-id}/");
pub const RETRIEVE_BINARY_DOCUMENT: UrlTemplate<'static> = UrlTemplate::from_static(
    "{dossia-api-endpoint}/records/{record-id}/documents/{document-id}/binary",
);
pub const SPECIFIC_VERSION: UrlTemplate<'static> = UrlTemplate::from_static(
    "{dossia-api-endpoint}/records/{record-id}/documents/{document-id}/versions/{version-id}",
);
pub const DOCUMENTS_BY_TYPE: UrlTemplate<'static> = UrlTemplate::from_static(
    "{dossia-api-endpoint}/records/{record-id}/documents/document_type/{document_type}/",
);
pub const APP_DOCUMENT: UrlTemplate<'static> =
    UrlTemplate::from_static("{dossia-api-endpoint}/records/{record-id}/apps/documents/key/{keyId}");
pub const APP_DOCUMENT_WITH_LABEL: UrlTemplate<'static> = UrlTemplate::from_static(
    "{dossia-api-endpoint}/records/{record-id}/apps/documents/key/{keyId}/label/{labelId}",
);
pub const RELATE_EXISTING_DOCUMENTS: UrlTemplate<'static> = UrlTemplate::from_static(
    "{dossia-api-endpoint}/records/{record-id}/documents/{document-id}/rels/related/{childDocumentId}",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    ApiEndpoint,
    RecordId,
    DocumentId,
    KeyId,
    LabelId,
    VersionId,
    DocumentType,
    ChildDocumentId,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::ApiEndpoint,
        Placeholder::RecordId,
        Placeholder::DocumentId,
        Placeholder::KeyId,
        Placeholder::LabelId,
        Placeholder::VersionId,
        Placeholder::DocumentType,
        Placeholder::ChildDocumentId,
    ];

    /// Name between the braces.
    pub const fn name(self) -> &'static str {
        match self {
            Placeholder::ApiEndpoint => "dossia-api-endpoint",
            Placeholder::RecordId => "record-id",
            Placeholder::DocumentId => "document-id",
            Placeholder::KeyId => "keyId",
            Placeholder::LabelId => "labelId",
            Placeholder::VersionId => "version-id",
            Placeholder::DocumentType => "document_type",
            Placeholder::ChildDocumentId => "childDocumentId",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Placeholder::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// Values for the placeholders of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBindings(BTreeMap<Placeholder, String>);

impl TemplateBindings {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn bind<V: Into<String>>(mut self, placeholder: Placeholder, value: V) -> Self {
        self.insert(placeholder, value);
        self
    }

    pub fn insert<V: Into<String>>(&mut self, placeholder: Placeholder, value: V) {
        self.0.insert(placeholder, value.into());
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.0.get(&placeholder).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    /// Token name without braces.
    Token(&'a str),
}

fn segments(raw: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find(|c: char| c == '{' || c == '}') {
            Some(offset) if after.as_bytes()[offset] == b'}' => {
                if start > 0 {
                    out.push(Segment::Literal(&rest[..start]));
                }
                out.push(Segment::Token(&after[..offset]));
                rest = &after[offset + 1..];
            }
            // a second '{' opens before this one closes; keep the first literally
            Some(offset) => {
                let next = start + 1 + offset;
                out.push(Segment::Literal(&rest[..next]));
                rest = &rest[next..];
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    out
}

/// A resource path with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate<'a> {
    raw: Cow<'a, str>,
}

impl<'a> UrlTemplate<'a> {
    pub fn new<T: Into<Cow<'a, str>>>(raw: T) -> Self {
        UrlTemplate { raw: raw.into() }
    }

    pub const fn from_static(raw: &'static str) -> UrlTemplate<'static> {
        UrlTemplate {
            raw: Cow::Borrowed(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Known placeholders in order of first appearance.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        let mut found = Vec::new();
        for segment in segments(&self.raw) {
            if let Segment::Token(name) = segment {
                if let Some(p) = Placeholder::from_name(name) {
                    if !found.contains(&p) {
                        found.push(p);
                    }
                }
            }
        }
        found
    }

    /// Substitutes every bound placeholder; anything else is left as is.
    pub fn resolve(&self, bindings: &TemplateBindings) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in segments(&self.raw) {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(name) => {
                    match Placeholder::from_name(name).and_then(|p| bindings.get(p)) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                }
            }
        }
        out
    }

    /// Tokens that [`resolve`](Self::resolve) would leave in place.
    pub fn unbound(&self, bindings: &TemplateBindings) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for segment in segments(&self.raw) {
            if let Segment::Token(name) = segment {
                let bound = Placeholder::from_name(name)
                    .and_then(|p| bindings.get(p))
                    .is_some();
                if !bound && !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
            }
        }
        missing
    }

    /// Checks that every placeholder is bound, then resolves and parses.
    pub fn expand(&self, bindings: &TemplateBindings) -> Result<Url, TemplateError> {
        let missing = self.unbound(bindings);
        if !missing.is_empty() {
            return Err(TemplateError::Unbound(missing));
        }
        let resolved = self.resolve(bindings);
        Url::parse(&resolved).map_err(|source| TemplateError::InvalidUrl {
            url: resolved,
            source,
        })
    }
}

impl fmt::Display for UrlTemplate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
