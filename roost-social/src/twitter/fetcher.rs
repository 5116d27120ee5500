//! The fetch collaborator: one URL in, one raw JSON document out.
use async_trait::async_trait;
use roost_http::header::{HeaderMap, HeaderName, HeaderValue};
use roost_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid credential header {name}: {reason}")]
    Credentials { name: &'static str, reason: String },
    #[error("response missing `{0}`")]
    MissingKey(&'static str),
    #[error("unexpected response shape at `{0}`")]
    Shape(&'static str),
}

/// Anything that can turn a request URL into parsed JSON.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_data(&self, url: &Url) -> Result<Value, FetchError>;

    /// Base URL the request builders join their paths onto.
    fn base_url(&self) -> &Url;
}

/// Session credentials for the web API.
#[derive(Clone)]
pub struct Credentials {
    pub auth_token: String,
    pub csrf_token: String,
    pub cookie: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .field("cookie", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    fn headers(&self) -> Result<HeaderMap, FetchError> {
        fn value(name: &'static str, raw: &str) -> Result<HeaderValue, FetchError> {
            HeaderValue::from_str(raw.trim()).map_err(|e| FetchError::Credentials {
                name,
                reason: e.to_string(),
            })
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-csrf-token"),
            value("x-csrf-token", &self.csrf_token)?,
        );
        headers.insert(
            HeaderName::from_static("cookie"),
            value("cookie", &self.cookie)?,
        );
        headers.insert(
            HeaderName::from_static("x-twitter-active-user"),
            HeaderValue::from_static("yes"),
        );
        headers.insert(
            HeaderName::from_static("x-twitter-auth-type"),
            HeaderValue::from_static("OAuth2Session"),
        );
        Ok(headers)
    }
}

/// [`Fetcher`] backed by the shared HTTP client and session credentials.
#[derive(Clone)]
pub struct HttpFetcher {
    http: HttpClient,
    base: Url,
    bearer: String,
    headers: HeaderMap,
}

impl HttpFetcher {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, FetchError> {
        let http = HttpClient::new(base_url)?;
        Ok(Self {
            base: http.base().clone(),
            headers: credentials.headers()?,
            bearer: credentials.auth_token,
            http,
        })
    }

    /// Replace the underlying client, e.g. to tune retries or timeouts.
    pub fn with_client(mut self, http: HttpClient) -> Self {
        self.base = http.base().clone();
        self.http = http;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_data(&self, url: &Url) -> Result<Value, FetchError> {
        let opts = RequestOpts {
            auth: Some(Auth::Bearer(&self.bearer)),
            headers: Some(self.headers.clone()),
            allow_absolute: true,
            ..Default::default()
        };
        Ok(self.http.get_json(url.as_str(), opts).await?)
    }

    fn base_url(&self) -> &Url {
        &self.base
    }
}
