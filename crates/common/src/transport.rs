//! HTTP transport seam.
//!
//! The signed client only needs "send these bytes, give me status, headers
//! and the full body back". [`ReqwestTransport`] does that over the network;
//! tests swap in a scripted implementation.

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use http::header::{CACHE_CONTROL, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method, Response};
use url::Url;

use crate::constants::{HEADER_GEOLOCATION, HEADER_LANGUAGE, HEADER_REGION};
use crate::error::BunqError;
use crate::settings::{Api, Settings};

/// A fully prepared request. `path` is relative to the API base URL.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and read the whole response body.
    async fn send(&self, request: OutgoingRequest) -> Result<Response<Vec<u8>>, Report<BunqError>>;
}

/// Headers sent with every request, taken from the `[api]` settings.
///
/// # Errors
///
/// Returns [`BunqError::Configuration`] if a configured value is not a valid
/// header value.
pub fn client_headers(api: &Api) -> Result<HeaderMap, Report<BunqError>> {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    for (name, value) in [
        (USER_AGENT, &api.user_agent),
        (HEADER_LANGUAGE, &api.language),
        (HEADER_REGION, &api.region),
        (HEADER_GEOLOCATION, &api.geolocation),
    ] {
        let header_value =
            HeaderValue::from_str(value).change_context(BunqError::Configuration {
                message: format!("Invalid value for header {name}"),
            })?;
        headers.insert(name, header_value);
    }

    Ok(headers)
}

pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self, Report<BunqError>> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .change_context(BunqError::Configuration {
                message: "Failed to build HTTP client".to_string(),
            })?;

        Ok(Self::new(http, settings.base_url()?))
    }

    fn resolve(&self, path: &str) -> Result<Url, Report<BunqError>> {
        // A leading '/' would replace the base path instead of extending it.
        self.base_url
            .join(path.trim_start_matches('/'))
            .change_context(BunqError::Transport {
                message: format!("Invalid request path: {path}"),
            })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<Response<Vec<u8>>, Report<BunqError>> {
        let url = self.resolve(&request.path)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder
            .send()
            .await
            .change_context(BunqError::Transport {
                message: format!("{} {} failed", request.method, request.path),
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .change_context(BunqError::Transport {
                message: format!("Failed to read body of {} {}", request.method, request.path),
            })?;

        let mut result = Response::new(body.to_vec());
        *result.status_mut() = status;
        *result.headers_mut() = headers;
        Ok(result)
    }
}
