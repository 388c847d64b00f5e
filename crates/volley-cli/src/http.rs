//! Building requests from scenarios and sending them.

use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::{Method, Url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use volley_core::{ActualResponse, Route, Scenario};

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("valid placeholder pattern"))
}

/// Errors building or sending a request. All are scenario-scoped.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to encode request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    /// Builds the request for `scenario` on `route` against `host`.
    pub fn from_scenario(host: &str, route: &Route, scenario: &Scenario) -> Result<Self, HttpError> {
        let method = Method::from_bytes(route.method.as_bytes())
            .map_err(|_| HttpError::InvalidMethod(route.method.clone()))?;
        let url = build_url(host, &route.template, &scenario.params, &scenario.query)?;

        let mut headers: Vec<(String, String)> = scenario
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let body = match (&scenario.request.json, &scenario.request.text) {
            (Some(json), _) => {
                let has_content_type = headers
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
                if !has_content_type {
                    headers.push(("Content-Type".to_string(), "application/json".to_string()));
                }
                Some(serde_json::to_vec(&Value::Object(json.clone()))?)
            }
            (None, Some(text)) => Some(text.clone().into_bytes()),
            (None, None) => None,
        };

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Replaces `{name}` placeholders in `template` with values from `params`.
///
/// Placeholders without a value become empty.
pub fn replace_path_params(template: &str, params: &BTreeMap<String, String>) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            params.get(name).cloned().unwrap_or_else(|| {
                warn!("No value for path parameter {{{}}} in {}", name, template);
                String::new()
            })
        })
        .into_owned()
}

/// `host + template` with placeholders filled and the query appended,
/// percent-encoded.
pub fn build_url(
    host: &str,
    template: &str,
    params: &BTreeMap<String, String>,
    query: &BTreeMap<String, String>,
) -> Result<Url, HttpError> {
    let raw = format!("{}{}", host, replace_path_params(template, params));
    let mut url = Url::parse(&raw).map_err(|e| HttpError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Sends prepared requests. The seam tests substitute.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<ActualResponse, HttpError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: &PreparedRequest) -> Result<ActualResponse, HttpError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(ActualResponse {
            status,
            headers,
            body,
        })
    }
}
