use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::models::ApiError;
use super::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::config::ClientConfig;
use crate::error::{Result, SmartsheetError};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const ASSUME_USER_HEADER: &str = "Assume-User";
pub const CHANGE_AGENT_HEADER: &str = "Smartsheet-Change-Agent";

// ============= Request Descriptors =============

/// A single API call, independent of the retry attempt it is sent on.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<HttpEntity>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(HttpEntity::Json(serde_json::to_vec(body)?));
        Ok(self)
    }

    pub fn with_entity(mut self, entity: HttpEntity) -> Self {
        self.body = Some(entity);
        self
    }
}

/// Request payloads. Bodies are kept as owned bytes so every retry attempt
/// can rebuild an identical request.
#[derive(Debug, Clone)]
pub enum HttpEntity {
    Json(Vec<u8>),
    /// Raw file body sent with `Content-Disposition: attachment`.
    Binary {
        content_type: String,
        file_name: String,
        bytes: Vec<u8>,
    },
    Multipart(MultipartUpload),
}

/// A `multipart/form-data` upload: optional text fields plus one file part.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    pub fields: Vec<(String, String)>,
    pub file_field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MultipartUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            fields: Vec::new(),
            file_field: "file".to_string(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Attach a text field, e.g. the JSON description of a new comment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_file_field(mut self, name: impl Into<String>) -> Self {
        self.file_field = name.into();
        self
    }

    fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        let part = Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(|_| {
                SmartsheetError::InvalidInput(format!(
                    "invalid content type '{}'",
                    self.content_type
                ))
            })?;

        Ok(form.part(self.file_field.clone(), part))
    }
}

// ============= Response Descriptor =============

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Media types compare case-insensitively and ignore parameters such as `charset`.
    pub fn is_json(&self) -> bool {
        self.content_type().is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|media| media.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        // 204 and friends carry no body
        if self.body.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the structured error body, if the response carries one.
    ///
    /// `Ok(None)` means the body is not JSON at all.
    pub fn api_error(&self) -> Result<Option<ApiError>> {
        if !self.is_json() {
            return Ok(None);
        }

        serde_json::from_slice::<ApiError>(&self.body)
            .map(Some)
            .map_err(|source| SmartsheetError::MalformedErrorBody {
                status: self.status,
                source,
            })
    }
}

// ============= Transport =============

/// Shared HTTP execution layer.
///
/// Holds only the connection pool and immutable settings, so one instance can
/// serve any number of concurrent requests.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    config: ClientConfig,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(default_headers(config)?)
            .build()
            .map_err(SmartsheetError::Transport)?;

        Ok(Self {
            client,
            config: config.clone(),
            policy: RetryPolicy::new(config.max_retry_timeout),
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn url_for(&self, path: &str) -> String {
        self.config.endpoint_url(path)
    }

    /// Send a request, retrying transient API errors until the retry budget is spent.
    ///
    /// Returns the final response whether or not it succeeded; only connection
    /// failures and unreadable error bodies come back as `Err`.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = self.url_for(&request.path);
        let mut state = RetryState::new();

        loop {
            log::debug!(
                "{} {} (attempt {})",
                request.method,
                url,
                state.attempts + 1
            );

            let response = self.build(&url, request)?.send().await?;
            let response = HttpResponse::read(response).await?;

            match self.inspect(&state, response)? {
                RetryDecision::Done(response) => return Ok(response),
                RetryDecision::GiveUp { response, error } => {
                    state.record_terminal(error);
                    log::debug!(
                        "{} {} failed with HTTP {} (error code {:?}) after {} attempt(s) in {:?}",
                        request.method,
                        url,
                        response.status,
                        state.last_error.as_ref().map(|e| e.error_code),
                        state.attempts,
                        state.elapsed()
                    );
                    return Ok(response);
                }
                RetryDecision::Retry { delay, error } => {
                    log::warn!(
                        "{} {}: error {} ({}), retrying in {}ms (elapsed {}ms)",
                        request.method,
                        url,
                        error.error_code,
                        error.message,
                        delay.as_millis(),
                        state.elapsed().as_millis()
                    );
                    state.record_failure(error);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn inspect(&self, state: &RetryState, response: HttpResponse) -> Result<RetryDecision> {
        if response.is_success() {
            return Ok(RetryDecision::Done(response));
        }

        log::trace!("HTTP {} body: {}", response.status, response.text());

        let Some(error) = response.api_error()? else {
            return Ok(RetryDecision::GiveUp {
                response,
                error: None,
            });
        };

        match self.policy.next_delay(state, &error) {
            Some(delay) => Ok(RetryDecision::Retry { delay, error }),
            None => Ok(RetryDecision::GiveUp {
                response,
                error: Some(error),
            }),
        }
    }

    fn build(&self, url: &str, request: &HttpRequest) -> Result<RequestBuilder> {
        let mut builder = self.client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                SmartsheetError::InvalidInput(format!("invalid header name '{}'", name))
            })?;
            builder = builder.header(header_name, header_value(name, value)?);
        }

        builder = match &request.body {
            None => builder,
            Some(HttpEntity::Json(bytes)) => builder
                .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(bytes.clone()),
            Some(HttpEntity::Binary {
                content_type,
                file_name,
                bytes,
            }) => builder
                .header(
                    header::CONTENT_TYPE,
                    header_value("Content-Type", content_type)?,
                )
                .header(
                    header::CONTENT_DISPOSITION,
                    header_value(
                        "Content-Disposition",
                        &format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
                    )?,
                )
                .body(bytes.clone()),
            Some(HttpEntity::Multipart(upload)) => builder.multipart(upload.to_form()?),
        };

        Ok(builder)
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut auth = header_value("Authorization", &format!("Bearer {}", config.access_token.trim()))?;
    auth.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(
        header::USER_AGENT,
        header_value("User-Agent", &config.user_agent_header())?,
    );

    if let Some(user) = &config.assume_user {
        headers.insert(
            HeaderName::from_static("assume-user"),
            header_value(ASSUME_USER_HEADER, user)?,
        );
    }
    if let Some(agent) = &config.change_agent {
        headers.insert(
            HeaderName::from_static("smartsheet-change-agent"),
            header_value(CHANGE_AGENT_HEADER, agent)?,
        );
    }

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| SmartsheetError::InvalidInput(format!("invalid {} header value", name)))
}
