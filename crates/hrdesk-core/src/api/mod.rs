//! Thin REST client for the HR backend.
//!
//! Uses the curl crate (libcurl) for transfers, moved onto tokio's blocking
//! pool. Every failed call is reported as a [`RawFailure`] so it can flow
//! straight into a [`Runner`].

mod transfer;

use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::classify::RawFailure;
use crate::config::HrdeskConfig;
use crate::runner::{RunOptions, RunOutcome, Runner, RunnerError};

/// Client-side problems that happen before any request is made.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid resource id {0:?}")]
    InvalidId(String),
    #[error("{0} requests cannot carry a body")]
    BodyNotAllowed(&'static str),
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Backend collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Employees,
    LeaveRequests,
    Onboarding,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Employees,
        Resource::LeaveRequests,
        Resource::Onboarding,
        Resource::Users,
    ];

    /// Path segment under the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Employees => "employees",
            Resource::LeaveRequests => "leave-requests",
            Resource::Onboarding => "onboarding",
            Resource::Users => "users",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Resource::ALL
            .into_iter()
            .find(|r| r.path() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Resource::ALL.iter().map(|r| r.path()).collect();
                format!("unknown resource {s:?} (expected one of: {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    connect_timeout: Duration,
    request_timeout: Duration,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|source| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            base,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            auth_token: None,
        })
    }

    pub fn from_config(cfg: &HrdeskConfig) -> Result<Self, ApiError> {
        let client = Self::new(&cfg.api_base_url)?
            .with_timeouts(cfg.connect_timeout(), cfg.request_timeout());
        Ok(match &cfg.auth_token {
            Some(token) => client.with_auth_token(token.clone()),
            None => client,
        })
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL of a collection, or of one record when `id` is given.
    pub fn url_for(&self, resource: Resource, id: Option<&str>) -> Result<Url, ApiError> {
        let path = match id {
            None => resource.path().to_string(),
            Some(id) => {
                let valid = !id.is_empty()
                    && id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if !valid {
                    return Err(ApiError::InvalidId(id.to_string()));
                }
                format!("{}/{}", resource.path(), id)
            }
        };
        self.base
            .join(&path)
            .map_err(|source| ApiError::InvalidBaseUrl {
                url: self.base.to_string(),
                source,
            })
    }

    /// Perform one request. Transport failures and non-2xx statuses come back
    /// as `RawFailure`.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, RawFailure> {
        let request = transfer::Request {
            method,
            url,
            body,
            auth_token: self.auth_token.clone(),
            connect_timeout: self.connect_timeout,
            timeout: self.request_timeout,
        };
        tokio::task::spawn_blocking(move || transfer::perform(&request))
            .await
            .unwrap_or_else(|e| {
                Err(RawFailure::default().with_message(format!("request task failed: {e}")))
            })
    }

    pub async fn get(&self, resource: Resource, id: Option<&str>) -> Result<ApiResponse, RawFailure> {
        match self.url_for(resource, id) {
            Ok(url) => self.send(Method::Get, url, None).await,
            Err(e) => Err(RawFailure::default().with_message(e.to_string())),
        }
    }

    /// Build a request for `resource` and run it through `runner` with retries.
    pub async fn request_with_retry<B: serde::Serialize>(
        &self,
        runner: &Runner<ApiResponse>,
        method: Method,
        resource: Resource,
        id: Option<&str>,
        body: Option<&B>,
        options: RunOptions<ApiResponse>,
    ) -> Result<RunOutcome<ApiResponse>, ApiError> {
        if method == Method::Get && body.is_some() {
            return Err(ApiError::BodyNotAllowed(method.as_str()));
        }
        let url = self.url_for(resource, id)?;
        let body = body.map(serde_json::to_vec).transpose()?;
        let client = self;
        let work = move || client.send(method, url.clone(), body.clone());
        Ok(runner.start(work, options).await?)
    }

    /// GET a collection (or one record) with retries.
    pub async fn fetch_with_retry(
        &self,
        runner: &Runner<ApiResponse>,
        resource: Resource,
        id: Option<&str>,
        options: RunOptions<ApiResponse>,
    ) -> Result<RunOutcome<ApiResponse>, ApiError> {
        self.request_with_retry::<()>(runner, Method::Get, resource, id, None, options)
            .await
    }
}
