use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::template::{Placeholder, TemplateBindings, DOSSIA_API_ENDPOINT};
use crate::{ConfigError, Credentials};

pub const DOSSIA_REQUEST_TOKEN_URL: &str = "https://webui1.dossia.org/authserver/request_token";
pub const DOSSIA_AUTHORIZE_URL: &str = "https://webui1.dossia.org/authserver/authorize";
pub const DOSSIA_ACCESS_TOKEN_URL: &str = "https://webui1.dossia.org/authserver/access_token";

/// Where the three handshake steps are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub request_token: Url,
    pub authorize: Url,
    pub access_token: Url,
}

impl ServiceEndpoints {
    pub fn new(request_token: Url, authorize: Url, access_token: Url) -> Self {
        ServiceEndpoints {
            request_token,
            authorize,
            access_token,
        }
    }

    /// The provider's production authorization server.
    pub fn dossia() -> Self {
        ServiceEndpoints {
            request_token: static_url(DOSSIA_REQUEST_TOKEN_URL),
            authorize: static_url(DOSSIA_AUTHORIZE_URL),
            access_token: static_url(DOSSIA_ACCESS_TOKEN_URL),
        }
    }
}

// only for the compile-time constants above
fn static_url(raw: &'static str) -> Url {
    match Url::parse(raw) {
        Ok(url) => url,
        Err(err) => unreachable!("constant URL {} does not parse: {}", raw, err),
    }
}

/// Everything the session client needs, fixed for the client's lifetime.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    credentials: Credentials,
    endpoints: ServiceEndpoints,
    api_base: Url,
    accept_encoding: Option<String>,
    download_dir: PathBuf,
    realm: Option<String>,
    timeout: Option<Duration>,
}

impl ServiceConfig {
    /// Provider defaults around the given consumer registration.
    pub fn new(credentials: Credentials) -> Self {
        ServiceConfig {
            credentials,
            endpoints: ServiceEndpoints::dossia(),
            api_base: static_url(DOSSIA_API_ENDPOINT),
            accept_encoding: None,
            download_dir: PathBuf::from("."),
            realm: None,
            timeout: None,
        }
    }

    /// Reads the configuration from `DOSSIA_*` environment variables.
    ///
    /// `DOSSIA_CONSUMER_KEY` and `DOSSIA_CONSUMER_SECRET` are required, the
    /// rest falls back to provider defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let consumer_key = required_var("DOSSIA_CONSUMER_KEY")?;
        let consumer_secret = required_var("DOSSIA_CONSUMER_SECRET")?;

        let mut credentials = Credentials::new(consumer_key, consumer_secret);
        if let Some(callback) = url_var("DOSSIA_CALLBACK_URL")? {
            credentials = credentials.callback(callback);
        }

        let defaults = ServiceEndpoints::dossia();
        let endpoints = ServiceEndpoints {
            request_token: url_var("DOSSIA_REQUEST_TOKEN_URL")?.unwrap_or(defaults.request_token),
            authorize: url_var("DOSSIA_AUTHORIZE_URL")?.unwrap_or(defaults.authorize),
            access_token: url_var("DOSSIA_ACCESS_TOKEN_URL")?.unwrap_or(defaults.access_token),
        };

        let mut config = ServiceConfig::new(credentials).endpoints(endpoints);
        if let Some(api_base) = url_var("DOSSIA_API_BASE")? {
            config = config.api_base(api_base);
        }
        if let Some(dir) = optional_var("DOSSIA_DOWNLOAD_DIR") {
            config = config.download_dir(dir);
        }
        if let Some(encoding) = optional_var("DOSSIA_ACCEPT_ENCODING") {
            config = config.accept_encoding(encoding);
        }
        if let Some(secs) = number_var("DOSSIA_TIMEOUT_SECS")? {
            config = config.timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn endpoints(self, endpoints: ServiceEndpoints) -> Self {
        ServiceConfig { endpoints, ..self }
    }

    /// Base URL bound to `{dossia-api-endpoint}`.
    pub fn api_base(self, api_base: Url) -> Self {
        ServiceConfig { api_base, ..self }
    }

    /// Value of the `Accept-Encoding` header sent with API calls.
    pub fn accept_encoding<T: Into<String>>(self, encoding: T) -> Self {
        ServiceConfig {
            accept_encoding: Some(encoding.into()),
            ..self
        }
    }

    /// Directory receiving downloaded binary responses.
    pub fn download_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
        ServiceConfig {
            download_dir: dir.into(),
            ..self
        }
    }

    /// Realm appended to every `Authorization` header.
    pub fn realm<T: Into<String>>(self, realm: T) -> Self {
        ServiceConfig {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// Transport timeout used by [`SessionClient::from_config`](crate::SessionClient::from_config).
    pub fn timeout(self, timeout: Duration) -> Self {
        ServiceConfig {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn get_endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    pub fn get_api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn get_accept_encoding(&self) -> Option<&str> {
        self.accept_encoding.as_deref()
    }

    pub fn get_download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn get_realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Bindings with `{dossia-api-endpoint}` already set to the API base.
    pub fn template_bindings(&self) -> TemplateBindings {
        TemplateBindings::new().bind(
            Placeholder::ApiEndpoint,
            self.api_base.as_str().trim_end_matches('/'),
        )
    }
}

fn optional_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::MissingVar(name))
}

fn url_var(name: &'static str) -> Result<Option<Url>, ConfigError> {
    optional_var(name)
        .map(|raw| Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source }))
        .transpose()
}

fn number_var(name: &'static str) -> Result<Option<u64>, ConfigError> {
    optional_var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|source| ConfigError::InvalidNumber { name, source })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ALL_RECORDS;

    #[test]
    fn provider_defaults() {
        let config = ServiceConfig::new(Credentials::new("key", "secret"));
        assert_eq!(
            config.get_endpoints().request_token.as_str(),
            DOSSIA_REQUEST_TOKEN_URL
        );
        assert_eq!(config.get_endpoints().authorize.as_str(), DOSSIA_AUTHORIZE_URL);
        assert_eq!(
            config.get_endpoints().access_token.as_str(),
            DOSSIA_ACCESS_TOKEN_URL
        );
        assert_eq!(config.get_download_dir(), Path::new("."));
        assert!(config.get_accept_encoding().is_none());
    }

    #[test]
    fn api_base_binding_has_no_trailing_slash() {
        let config = ServiceConfig::new(Credentials::new("key", "secret"))
            .api_base(Url::parse("https://api.example.org/v2.0/").unwrap());
        assert_eq!(
            ALL_RECORDS.resolve(&config.template_bindings()),
            "https://api.example.org/v2.0/records/"
        );

        let config = ServiceConfig::new(Credentials::new("key", "secret"));
        assert_eq!(
            ALL_RECORDS.resolve(&config.template_bindings()),
            format!("{}/records/", DOSSIA_API_ENDPOINT)
        );
    }

    // the only test touching DOSSIA_* variables
    #[test]
    fn from_env_reads_overrides() {
        env::remove_var("DOSSIA_CONSUMER_KEY");
        env::remove_var("DOSSIA_CONSUMER_SECRET");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(ConfigError::MissingVar("DOSSIA_CONSUMER_KEY"))
        ));

        env::set_var("DOSSIA_CONSUMER_KEY", "env-key");
        env::set_var("DOSSIA_CONSUMER_SECRET", "env-secret");
        env::set_var("DOSSIA_ACCESS_TOKEN_URL", "http://localhost:9000/access");
        env::set_var("DOSSIA_DOWNLOAD_DIR", "/tmp/dossia");
        env::set_var("DOSSIA_AUTHORIZE_URL", "not a url");

        assert!(matches!(
            ServiceConfig::from_env(),
            Err(ConfigError::InvalidUrl {
                name: "DOSSIA_AUTHORIZE_URL",
                ..
            })
        ));

        env::remove_var("DOSSIA_AUTHORIZE_URL");
        env::set_var("DOSSIA_TIMEOUT_SECS", "soon");
        assert!(matches!(
            ServiceConfig::from_env(),
            Err(ConfigError::InvalidNumber {
                name: "DOSSIA_TIMEOUT_SECS",
                ..
            })
        ));

        env::set_var("DOSSIA_TIMEOUT_SECS", "30");
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.get_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.get_credentials().consumer_key(), "env-key");
        assert_eq!(
            config.get_endpoints().access_token.as_str(),
            "http://localhost:9000/access"
        );
        assert_eq!(config.get_endpoints().authorize.as_str(), DOSSIA_AUTHORIZE_URL);
        assert_eq!(config.get_download_dir(), Path::new("/tmp/dossia"));

        for name in &[
            "DOSSIA_CONSUMER_KEY",
            "DOSSIA_CONSUMER_SECRET",
            "DOSSIA_ACCESS_TOKEN_URL",
            "DOSSIA_DOWNLOAD_DIR",
            "DOSSIA_TIMEOUT_SECS",
        ] {
            env::remove_var(name);
        }
    }
}
