use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{ACCEPT, LOCATION, USER_AGENT},
    Method, StatusCode,
};
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    cache::DescribeCache,
    encode::{encode, EncodedRequest, Part},
    errors::{APIError, Error, Result, RetryMetadata, TransportError, TransportErrorKind},
    files::FileSet,
    http::{parse_api_error_parts, RetryConfig},
    types::{Params, WorkflowDefinition, WorkflowListResult},
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT,
    MAX_PER_PAGE,
};

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Override the User-Agent header (defaults to the SDK identifier).
    pub user_agent: Option<String>,
    pub http_client: Option<reqwest::Client>,
    /// Override the connect timeout (defaults to 5s).
    pub connect_timeout: Option<Duration>,
    /// Override the request timeout (defaults to 60s).
    pub timeout: Option<Duration>,
    /// Retry/backoff policy (defaults to 3 attempts, exponential backoff + jitter).
    pub retry: Option<RetryConfig>,
}

#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    base_url: String,
    api_key: String,
    user_agent: String,
    http: reqwest::Client,
    request_timeout: Duration,
    retry: RetryConfig,
    describe_cache: DescribeCache,
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self> {
        let base_url = cfg
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid base url: {err}")))?;

        let api_key = match cfg.api_key.filter(|s| !s.trim().is_empty()) {
            Some(key) => key,
            None => return Err(Error::Config("api key is required".to_string())),
        };

        let connect_timeout = cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let request_timeout = cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let retry = cfg.retry.unwrap_or_default();

        let http = match cfg.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .build()
                .map_err(|err| TransportError {
                    kind: TransportErrorKind::Connect,
                    message: "failed to build http client".to_string(),
                    source: Some(err),
                    retries: None,
                })?,
        };

        let user_agent = cfg
            .user_agent
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                api_key,
                user_agent,
                http,
                request_timeout,
                retry,
                describe_cache: DescribeCache::new(),
            }),
        })
    }

    pub fn workflows(&self) -> WorkflowsClient {
        WorkflowsClient {
            inner: self.inner.clone(),
        }
    }
}

/// Client for the `/custom` workflow endpoints: discovery, schema lookup,
/// and validated execution.
#[derive(Clone)]
pub struct WorkflowsClient {
    inner: Arc<ClientInner>,
}

impl WorkflowsClient {
    /// List the authenticated user's workflows, paginated.
    /// `per_page` is capped at 100 by the remote API.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<WorkflowListResult> {
        let per_page = per_page.min(MAX_PER_PAGE);
        let make_builder = || {
            Ok(self
                .inner
                .apply_headers(self.inner.request(Method::GET, "/custom")?)
                .query(&[("page", page), ("per_page", per_page)])
                .timeout(self.inner.request_timeout))
        };

        let resp = self
            .inner
            .send_with_retry(make_builder, Method::GET, self.inner.retry.clone())
            .await?;
        let value = self.inner.read_json(resp).await?;
        WorkflowListResult::from_response(&value)
    }

    /// Fetch one workflow's schema, serving repeat calls from the describe
    /// cache. An unrecognized slug yields [`Error::NotFound`].
    pub async fn describe(&self, slug: &str) -> Result<Arc<WorkflowDefinition>> {
        if let Some(definition) = self.inner.describe_cache.get(slug) {
            return Ok(definition);
        }

        let path = format!("/custom/{slug}");
        let make_builder = || {
            Ok(self
                .inner
                .apply_headers(self.inner.request(Method::GET, &path)?)
                .timeout(self.inner.request_timeout))
        };

        let resp = self
            .inner
            .send_with_retry(make_builder, Method::GET, self.inner.retry.clone())
            .await
            .map_err(|err| match err {
                Error::Api(api) if api.status == StatusCode::NOT_FOUND.as_u16() => {
                    Error::NotFound {
                        slug: slug.to_string(),
                    }
                }
                other => other,
            })?;

        let value = self.inner.read_json(resp).await?;
        let descriptor = value.get("data").unwrap_or(&value);
        let definition = WorkflowDefinition::from_descriptor(descriptor)?;
        Ok(self.inner.describe_cache.insert(definition))
    }

    /// Evict one slug from the describe cache, or everything when `None`.
    pub fn clear_describe_cache(&self, slug: Option<&str>) {
        match slug {
            Some(slug) => self.inner.describe_cache.evict(slug),
            None => self.inner.describe_cache.clear(),
        }
    }

    pub fn describe_cache(&self) -> &DescribeCache {
        &self.inner.describe_cache
    }

    /// Execute a workflow without client-side validation, returning the
    /// status URL to poll for the asynchronous result. The wire encoding is
    /// selected by [`encode`]: any file attachment means multipart,
    /// otherwise a single JSON body.
    pub async fn execute(&self, slug: &str, params: &Params, files: &FileSet) -> Result<String> {
        let encoded = encode(slug, params, files)?;
        self.dispatch(&encoded).await
    }

    /// Describe, validate client-side, then execute.
    ///
    /// The safest way to call a workflow: on validation failure this aborts
    /// with the full report before any POST is made, so the network is never
    /// used to discover a locally detectable payload error.
    pub async fn validate_and_execute(
        &self,
        slug: &str,
        params: &Params,
        files: &FileSet,
    ) -> Result<String> {
        let definition = self.describe(slug).await?;
        definition.validate(params, files)?;
        self.execute(slug, params, files).await
    }

    async fn dispatch(&self, encoded: &EncodedRequest) -> Result<String> {
        // Multipart bodies are not cloneable, so each retry attempt rebuilds
        // the request from the encoded form.
        let make_builder = || {
            let builder = self
                .inner
                .apply_headers(self.inner.request(Method::POST, encoded.path())?)
                .timeout(self.inner.request_timeout);
            Ok(match encoded {
                EncodedRequest::Json { body, .. } => builder.json(body),
                EncodedRequest::Multipart { parts, .. } => {
                    builder.multipart(multipart_form(parts))
                }
            })
        };

        let resp = self
            .inner
            .send_with_retry(make_builder, Method::POST, self.inner.retry.clone())
            .await?;
        self.inner.parse_status_handle(resp).await
    }
}

fn multipart_form(parts: &[Part]) -> reqwest::multipart::Form {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            Part::Text { name, value } => form.text(name.clone(), value.clone()),
            Part::File {
                name,
                file_name,
                content,
            } => form.part(
                name.clone(),
                reqwest::multipart::Part::bytes(content.clone()).file_name(file_name.clone()),
            ),
        };
    }
    form
}

impl ClientInner {
    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| Error::Config(format!("invalid path: {err}")))?;
        Ok(self.http.request(method, url))
    }

    fn apply_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .bearer_auth(&self.api_key)
    }

    async fn read_json(&self, resp: reqwest::Response) -> Result<Value> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| self.to_transport_error(err, None))?;
        serde_json::from_slice(&bytes).map_err(Error::Serialization)
    }

    /// Extract the opaque status-poll handle from a submission response:
    /// `status_url` in the body, falling back to the Location header.
    async fn parse_status_handle(&self, resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp
            .bytes()
            .await
            .map_err(|err| self.to_transport_error(err, None))?;
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            if let Some(url) = value.get("status_url").and_then(Value::as_str) {
                if !url.is_empty() {
                    return Ok(url.to_string());
                }
            }
        }
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            return Ok(location);
        }

        Err(APIError::new(status.as_u16(), "response did not contain a status URL").into())
    }

    async fn send_with_retry<F>(
        &self,
        make_builder: F,
        method: Method,
        retry: RetryConfig,
    ) -> Result<reqwest::Response>
    where
        F: Fn() -> Result<reqwest::RequestBuilder>,
    {
        let max_attempts = retry.max_attempts.max(1);
        let mut state = RetryState::new();

        for attempt in 1..=max_attempts {
            let builder = make_builder()?;
            #[cfg(feature = "tracing")]
            let span = tracing::debug_span!(
                "sharpapi.http",
                method = %method,
                attempt,
                max_attempts
            );
            #[cfg(feature = "tracing")]
            let _guard = span.enter();
            let result = builder.send().await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(status = %status, "request completed");
                        return Ok(resp);
                    }
                    state.record_attempt(attempt);
                    state.record_status(status);

                    let should_retry = retry.should_retry_status(&method, status);
                    if should_retry && attempt < max_attempts {
                        sleep(retry.backoff_delay(attempt)).await;
                        continue;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::warn!(status = %status, attempt, "request failed; returning error");
                    let body = resp.text().await.unwrap_or_default();
                    return Err(parse_api_error_parts(status, body, state.metadata()));
                }
                Err(err) => {
                    state.record_attempt(attempt);
                    state.record_error(&err);
                    let should_retry = retry.should_retry_error(&method, &err);
                    if should_retry && attempt < max_attempts {
                        sleep(retry.backoff_delay(attempt)).await;
                        continue;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, error = %err, "transport error");
                    return Err(self.to_transport_error(err, state.metadata()));
                }
            }
        }

        Err(Error::Transport(TransportError {
            kind: TransportErrorKind::Other,
            message: "request failed".to_string(),
            source: None,
            retries: state.metadata(),
        }))
    }

    fn to_transport_error(&self, err: reqwest::Error, retries: Option<RetryMetadata>) -> Error {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };

        TransportError {
            kind,
            message: err.to_string(),
            source: Some(err),
            retries,
        }
        .into()
    }
}

#[derive(Default)]
struct RetryState {
    attempts: u32,
    last_status: Option<u16>,
    last_error: Option<String>,
}

impl RetryState {
    fn new() -> Self {
        Self::default()
    }

    fn record_attempt(&mut self, attempt: u32) {
        self.attempts = attempt;
    }

    fn record_status(&mut self, status: StatusCode) {
        self.last_status = Some(status.as_u16());
    }

    fn record_error(&mut self, err: &reqwest::Error) {
        self.last_error = Some(err.to_string());
    }

    fn metadata(&self) -> Option<RetryMetadata> {
        if self.attempts <= 1 {
            None
        } else {
            Some(RetryMetadata {
                attempts: self.attempts,
                last_status: self.last_status,
                last_error: self.last_error.clone(),
            })
        }
    }
}
