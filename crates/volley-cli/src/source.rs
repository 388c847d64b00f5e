//! Where configuration documents come from.

use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use volley_core::{Config, ConfigError};

/// Errors reading a document from its source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Errors loading a [`Config`] from its sources.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A document location given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Local file path
    File(PathBuf),
    /// Remote URL (e.g., "https://example.com/openapi.yml")
    Remote(String),
}

impl ConfigSource {
    /// `http://` and `https://` prefixes select a remote URL, anything else is
    /// a file path.
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            ConfigSource::Remote(s.to_string())
        } else {
            ConfigSource::File(PathBuf::from(s))
        }
    }

    pub fn label(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Remote(url) => url.clone(),
        }
    }

    /// Reads the document's raw text.
    pub async fn read(&self) -> Result<String, SourceError> {
        match self {
            ConfigSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Read {
                        path: path.display().to_string(),
                        source,
                    })
            }
            ConfigSource::Remote(url) => {
                info!("Fetching {}", url);
                let fetch_error = |source| SourceError::Fetch {
                    url: url.clone(),
                    source,
                };

                let response = reqwest::get(url).await.map_err(fetch_error)?;
                if !response.status().is_success() {
                    return Err(SourceError::Status {
                        url: url.clone(),
                        status: response.status().as_u16(),
                    });
                }
                response.text().await.map_err(fetch_error)
            }
        }
    }
}

impl std::str::FromStr for ConfigSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Reads both documents and builds the checked, normalized [`Config`].
pub async fn load_config(
    config: &ConfigSource,
    openapi: Option<&ConfigSource>,
) -> Result<Config, LoadError> {
    let main = config.read().await?;
    let openapi = match openapi {
        Some(source) => Some(source.read().await?),
        None => None,
    };
    Ok(Config::parse(&main, openapi.as_deref())?)
}
