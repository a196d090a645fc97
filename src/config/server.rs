use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::CategoryDeletePolicy;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://gallery.example.com").
    /// Prepended to local image paths. If not set, local images render as root-relative paths.
    pub public_base_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Upper bound for a caller-supplied `x-request-timeout`.
    pub max_request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub category_delete: CategoryDeletePolicy,
    /// Create a bare user row when a category is linked to an unknown user id.
    pub link_creates_user: bool,
    pub blob: BlobConfig,
}

/// Where uploaded image bytes live.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum BlobConfig {
    Local {
        /// Defaults to `<data_dir>/uploads`.
        #[serde(default)]
        content_dir: Option<PathBuf>,
    },
    Remote {
        endpoint: String,
        public_url: String,
        #[serde(default)]
        auth_token: Option<String>,
        /// Additional hosts whose URLs are treated as already-canonical remote locators.
        #[serde(default)]
        extra_hosts: Vec<String>,
    },
}

impl Default for BlobConfig {
    fn default() -> Self {
        BlobConfig::Local { content_dir: None }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("vitrine.db")
    }

    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        match &self.blob {
            BlobConfig::Local {
                content_dir: Some(dir),
            } => dir.clone(),
            _ => self.data_dir.join("uploads"),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn max_request_timeout(&self) -> Duration {
        Duration::from_secs(self.max_request_timeout_secs.max(self.request_timeout_secs))
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        if let Some(base) = &self.public_base_url {
            let url = parse_origin(base, "public_base_url")?;
            if url.query().is_some() || url.fragment().is_some() {
                return Err(Error::Config(format!(
                    "public_base_url: '{base}' must not carry a query or fragment"
                )));
            }
        }

        if let BlobConfig::Remote {
            endpoint,
            public_url,
            ..
        } = &self.blob
        {
            parse_origin(endpoint, "blob.endpoint")?;
            parse_origin(public_url, "blob.public_url")?;
        }

        Ok(())
    }
}

fn parse_origin(value: &str, field: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("{field}: {e}")))?;
    if url.host_str().is_none() {
        return Err(Error::Config(format!("{field}: missing host in '{value}'")));
    }
    Ok(url)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            request_timeout_secs: 30,
            max_request_timeout_secs: 120,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            category_delete: CategoryDeletePolicy::default(),
            link_creates_user: false,
            blob: BlobConfig::default(),
        }
    }
}
