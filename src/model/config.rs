use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// Environment variable holding the API key when `apiKey` is not configured
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Environment variable holding the private access token when `privateAccess` is not configured
pub const PRIVATE_ACCESS_ENV: &str = "MISTRAL_AGENTS_PRIVATE_ACCESS";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Value of the `X-Private-Access` header (optional)
    #[serde(default)]
    pub private_access: Option<String>,

    /// Model used when starting a conversation
    #[serde(default = "default_model")]
    pub model: String,

    /// Built-in tools enabled when starting a conversation
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Extra tool-name to status-phrase mappings, merged over the built-in table
    #[serde(default)]
    pub tool_phrases: HashMap<String, String>,

    /// Number of prompt characters used for a new conversation's title
    #[serde(default = "default_title_length")]
    pub title_length: usize,

    /// Page size when listing conversations
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_tls_backend")]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy authentication username (optional)
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// Proxy authentication password (optional)
    #[serde(default)]
    pub proxy_password: Option<String>,

    /// Directory generated images are written to
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Config file path (runtime metadata, not written to JSON)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_server_url() -> String {
    "https://api.mistral.ai".to_string()
}

fn default_model() -> String {
    "mistral-large-2411".to_string()
}

fn default_tools() -> Vec<String> {
    vec!["web_search".to_string(), "generate_image".to_string()]
}

fn default_title_length() -> usize {
    30
}

fn default_list_page_size() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    720
}

fn default_tls_backend() -> TlsBackend {
    TlsBackend::Rustls
}

fn default_image_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_key: None,
            private_access: None,
            model: default_model(),
            tools: default_tools(),
            tool_phrases: HashMap::new(),
            title_length: default_title_length(),
            list_page_size: default_list_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_backend: default_tls_backend(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            image_dir: default_image_dir(),
            config_path: None,
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Load configuration from file
    ///
    /// A missing file yields the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Fill credentials missing from the file from the environment
    pub fn with_env_fallbacks(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = std::env::var(API_KEY_ENV).ok().filter(|v| !v.trim().is_empty());
        }
        if self.private_access.is_none() {
            self.private_access = std::env::var(PRIVATE_ACCESS_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty());
        }
        self
    }

    /// Get config file path (if available)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
