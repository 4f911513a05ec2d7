use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::models::*;
use super::transport::{HttpEntity, HttpRequest, HttpResponse, MultipartUpload, Transport};
use crate::config::ClientConfig;
use crate::error::{Result, SmartsheetError};

/// Entry point for talking to the API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct SmartsheetClient {
    config: Arc<ClientConfig>,
    transport: Transport,
}

impl fmt::Debug for SmartsheetClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartsheetClient")
            .field("config", &self.config)
            .finish()
    }
}

impl SmartsheetClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Run a request and turn any non-success response into an error.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.transport.execute(&request).await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(&response))
        }
    }

    async fn request<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    // ============= JSON Helpers =============

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(HttpRequest::get(path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&str, String)>,
    ) -> Result<T> {
        self.request(HttpRequest::get(path).with_query(query)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpRequest::post(path).with_json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpRequest::put(path).with_json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(HttpRequest::delete(path)).await
    }

    /// Fetch one page (or everything, with `PageParams::all()`) from a list endpoint.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        paging: &PageParams,
    ) -> Result<PagedResult<T>> {
        self.request(HttpRequest::get(path).with_query(paging.to_query()))
            .await
    }

    // ============= Uploads =============

    /// Upload a file as the raw request body, e.g. `sheets/{id}/attachments`.
    pub async fn attach_file<T: DeserializeOwned>(
        &self,
        path: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<T> {
        if file_name.trim().is_empty() {
            return Err(SmartsheetError::InvalidInput(
                "file name must not be empty".to_string(),
            ));
        }

        let entity = HttpEntity::Binary {
            content_type: content_type.to_string(),
            file_name: file_name.to_string(),
            bytes,
        };
        self.request(HttpRequest::post(path).with_entity(entity))
            .await
    }

    pub async fn attach_file_from_path<T: DeserializeOwned>(
        &self,
        path: &str,
        file_path: impl AsRef<Path>,
        content_type: &str,
    ) -> Result<T> {
        let file_path = file_path.as_ref();
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SmartsheetError::InvalidInput(format!(
                    "'{}' does not name a file",
                    file_path.display()
                ))
            })?
            .to_string();

        let bytes = tokio::fs::read(file_path).await?;
        log::debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        self.attach_file(path, &file_name, content_type, bytes)
            .await
    }

    /// Upload a `multipart/form-data` body, e.g. a comment with an attachment.
    pub async fn upload_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: MultipartUpload,
    ) -> Result<T> {
        self.request(HttpRequest::post(path).with_entity(HttpEntity::Multipart(upload)))
            .await
    }
}

/// Map a final failing response onto the caller-facing error taxonomy.
pub fn error_from_response(response: &HttpResponse) -> SmartsheetError {
    let error = match response.api_error() {
        Ok(Some(error)) => error,
        Ok(None) => {
            let text = response.text();
            if text.trim().is_empty() {
                ApiError::unstructured(format!("HTTP {}", response.status))
            } else {
                ApiError::unstructured(text)
            }
        }
        Err(e) => return e,
    };

    SmartsheetError::from_status(response.status, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SmartsheetClient {
        let config = ClientConfig::new("key")
            .with_base_uri(server.uri())
            .with_max_retry_timeout(Duration::ZERO);
        SmartsheetClient::new(config).unwrap()
    }

    #[test]
    fn test_client_new_with_default_base() {
        let client = SmartsheetClient::new(ClientConfig::new("test_token")).unwrap();

        assert_eq!(client.config().base_uri, "https://api.smartsheet.com/2.0/");
        assert_eq!(
            client.transport().policy().max_retry_timeout,
            Duration::from_millis(15_000)
        );
    }

    #[test]
    fn test_client_new_rejects_empty_token() {
        let result = SmartsheetClient::new(ClientConfig::new(""));
        assert_matches!(result, Err(SmartsheetError::InvalidInput(_)));
    }

    #[test]
    fn test_error_from_response_plain_text() {
        let response = HttpResponse {
            status: 502,
            headers: reqwest::header::HeaderMap::new(),
            body: b"Bad Gateway".to_vec(),
        };

        match error_from_response(&response) {
            SmartsheetError::Service { status, error } => {
                assert_eq!(status, 502);
                assert_eq!(error.error_code, 0);
                assert_eq!(error.message, "Bad Gateway");
            }
            other => panic!("Expected Service error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_response_empty_body() {
        let response = HttpResponse {
            status: 404,
            headers: reqwest::header::HeaderMap::new(),
            body: Vec::new(),
        };

        let err = error_from_response(&response);
        assert_matches!(err, SmartsheetError::ResourceNotFound { status: 404, .. });
        assert_eq!(err.api_error().unwrap().message, "HTTP 404");
    }

    #[tokio::test]
    async fn test_get_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sheets/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "name": "Roadmap"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);

        #[derive(serde::Deserialize)]
        struct Sheet {
            id: i64,
            name: String,
        }

        let sheet: Sheet = client.get("sheets/42").await.unwrap();
        assert_eq!(sheet.id, 42);
        assert_eq!(sheet.name, "Roadmap");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/home/folders"))
            .and(body_json(json!({"name": "Projects"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "SUCCESS",
                "resultCode": 0,
                "result": {"id": 9, "name": "Projects"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result: ApiResult<serde_json::Value> = client
            .post("home/folders", &json!({"name": "Projects"}))
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.result.unwrap()["id"], 9);
    }

    #[tokio::test]
    async fn test_list_sends_paging_params() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sheets"))
            .and(query_param("page", "2"))
            .and(query_param("pageSize", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pageNumber": 2,
                "pageSize": 1,
                "totalPages": 2,
                "totalCount": 2,
                "data": [{"id": 2}]
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let page: PagedResult<serde_json::Value> = client
            .list("sheets", &PageParams::page(2, 1))
            .await
            .unwrap();

        assert!(!page.has_more());
        assert_eq!(page.data[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_handle_response_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "errorCode": 1002,
                "message": "Your Access Token is invalid."
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result: Result<serde_json::Value> = client.get("users/me").await;

        match result.unwrap_err() {
            SmartsheetError::Authorization { status, error } => {
                assert_eq!(status, 401);
                assert_eq!(error.error_code, 1002);
                assert!(error.message.contains("invalid"));
            }
            other => panic!("Expected Authorization, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_body_decode_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sheets/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result: Result<serde_json::Value> = client.get("sheets/1").await;

        assert_matches!(result, Err(SmartsheetError::Json(_)));
    }

    #[tokio::test]
    async fn test_attach_file_rejects_empty_name() {
        let client = SmartsheetClient::new(ClientConfig::new("key")).unwrap();
        let result: Result<serde_json::Value> = client
            .attach_file("sheets/1/attachments", " ", "text/plain", b"x".to_vec())
            .await;

        assert_matches!(result, Err(SmartsheetError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_attach_file_from_missing_path() {
        let client = SmartsheetClient::new(ClientConfig::new("key")).unwrap();
        let result: Result<serde_json::Value> = client
            .attach_file_from_path(
                "sheets/1/attachments",
                "/definitely/not/here.txt",
                "text/plain",
            )
            .await;

        assert_matches!(result, Err(SmartsheetError::Io(_)));
    }
}
