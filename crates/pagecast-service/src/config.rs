//! Environment-driven configuration for the service binary.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;

use crate::media::RestMediaStore;
use crate::publisher::WebhookPublisher;
use crate::repositories::RestStore;
use crate::{DefaultAppState, ServiceState};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_MEDIA_BUCKET: &str = "post-media";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Root of the hosted project; `/rest/v1/` and `/storage/v1/` hang off it
    pub store_url: Url,
    pub store_api_key: String,
    pub publish_webhook_url: Url,
    pub media_bucket: String,
    pub request_timeout: Duration,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any `name -> value` source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let url = |name: &'static str| -> Result<Url, ConfigError> {
            let raw = required(name)?;
            Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
        };
        let seconds = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match get(name) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(0) | Err(_) => Err(ConfigError::Invalid(format!(
                        "{name} must be a positive number of seconds, got {raw:?}"
                    ))),
                    Ok(secs) => Ok(Duration::from_secs(secs)),
                },
            }
        };

        let bind_raw = get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("BIND_ADDRESS is not a socket address: {bind_raw:?}"))
        })?;

        let mut store_url = url("STORE_URL")?;
        // join() would drop the last path segment without it
        if !store_url.path().ends_with('/') {
            let path = format!("{}/", store_url.path());
            store_url.set_path(&path);
        }

        Ok(Config {
            bind_address,
            store_url,
            store_api_key: required("STORE_API_KEY")?,
            publish_webhook_url: url("PUBLISH_WEBHOOK_URL")?,
            media_bucket: get("MEDIA_BUCKET").unwrap_or_else(|| DEFAULT_MEDIA_BUCKET.to_string()),
            request_timeout: seconds("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            upstream_timeout: seconds("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?,
        })
    }

    pub fn rest_url(&self) -> Result<Url, ConfigError> {
        self.store_url
            .join("rest/v1/")
            .map_err(|source| ConfigError::InvalidUrl {
                name: "STORE_URL",
                source,
            })
    }

    pub fn storage_url(&self) -> Result<Url, ConfigError> {
        self.store_url
            .join("storage/v1/")
            .map_err(|source| ConfigError::InvalidUrl {
                name: "STORE_URL",
                source,
            })
    }

    /// Wires the collaborators up over one shared HTTP client.
    pub fn connect(&self) -> Result<DefaultAppState, ConfigError> {
        let http = Client::builder()
            .user_agent(concat!("pagecast/", env!("CARGO_PKG_VERSION")))
            .timeout(self.upstream_timeout)
            .build()?;

        let store = RestStore::new(http.clone(), self.rest_url()?, self.store_api_key.clone());
        let publisher = WebhookPublisher::new(http.clone(), self.publish_webhook_url.clone());
        let media = RestMediaStore::new(
            http,
            self.storage_url()?,
            self.media_bucket.clone(),
            self.store_api_key.clone(),
        );

        Ok(ServiceState::new(store, publisher, media))
    }
}
