//! HTTP Client builder module
//!
//! Provides unified HTTP Client building functionality with proxy support

use reqwest::header::HeaderMap;
use reqwest::{Client, Proxy, redirect};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// Maximum redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// Proxy configuration
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy URL, supports http/https/socks5
    pub url: String,
    /// Proxy authentication username
    pub username: Option<String>,
    /// Proxy authentication password
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Create proxy configuration from URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Build proxy configuration from the `proxy*` config fields
    pub fn from_config(config: &Config) -> Option<Self> {
        config.proxy_url.as_ref().map(|url| {
            let proxy = Self::new(url);
            match (&config.proxy_username, &config.proxy_password) {
                (Some(username), Some(password)) => proxy.with_auth(username, password),
                _ => proxy,
            }
        })
    }
}

/// Build HTTP Client
///
/// # Arguments
/// * `proxy` - Optional proxy configuration
/// * `timeout_secs` - Timeout in seconds, covering the whole streamed body
/// * `tls_backend` - TLS implementation
/// * `default_headers` - Headers sent with every request (authentication)
///
/// # Returns
/// Configured reqwest::Client that follows redirects
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
    default_headers: HeaderMap,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .default_headers(default_headers);

    if tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(&proxy_config.url)?;

        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password) {
            proxy = proxy.basic_auth(username, password);
        }

        builder = builder.proxy(proxy);
        tracing::debug!("HTTP Client using proxy: {}", proxy_config.url);
    }

    Ok(builder.build()?)
}
