//! HTTP client for the runbook backend.
//!
//! Every operation except the development login is authenticated: the session
//! token is attached as a bearer credential and a 401 answer clears the
//! session before the error is returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::ApiError;
use crate::models::{
    DevLoginRequest, EnvVarsRequest, ExecuteResponse, LoginResponse, RequiredEnv, RunbookContent,
    RunbookInfo, RunbookList, ValidateResponse,
};
use crate::session::SessionStore;

/// Whether a request carries the session and reacts to 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Authenticated,
    Public,
}

/// Typed client bound to one backend and one session store.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    dev_login_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client. `base_url` is the API root (e.g.
    /// `http://localhost:8083/api`); `dev_login_url` is the full login URL,
    /// which lives outside the API root.
    pub fn new(
        base_url: impl Into<String>,
        dev_login_url: impl Into<String>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dev_login_url: dev_login_url.into(),
            session,
        }
    }

    /// The session store this client reads credentials from.
    pub const fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// List all runbooks.
    pub async fn list_runbooks(&self) -> Result<Vec<RunbookInfo>, ApiError> {
        let list: RunbookList = self.get("/runbooks").await?;
        Ok(list.runbooks)
    }

    /// Fetch a runbook's content.
    pub async fn get_runbook(&self, filename: &str) -> Result<RunbookContent, ApiError> {
        self.get(&runbook_path(filename, "")).await
    }

    /// Execute a runbook with environment-variable overrides.
    pub async fn execute_runbook(
        &self,
        filename: &str,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<ExecuteResponse, ApiError> {
        let body = EnvVarsRequest::new(env_vars.clone());
        self.request(
            Method::POST,
            &runbook_path(filename, "/execute"),
            Some(&body),
            Access::Authenticated,
        )
        .await
    }

    /// Validate a runbook without running it.
    pub async fn validate_runbook(
        &self,
        filename: &str,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<ValidateResponse, ApiError> {
        let body = EnvVarsRequest::new(env_vars.clone());
        self.request(
            Method::PATCH,
            &runbook_path(filename, "/validate"),
            Some(&body),
            Access::Authenticated,
        )
        .await
    }

    /// Required, available and missing environment variables for a runbook.
    pub async fn required_env(&self, filename: &str) -> Result<RequiredEnv, ApiError> {
        self.get(&runbook_path(filename, "/required-env")).await
    }

    /// Obtain a session from the development login endpoint.
    ///
    /// Sent without credentials and never clears the session. The caller
    /// decides whether to store the result.
    pub async fn dev_login(&self, request: &DevLoginRequest) -> Result<LoginResponse, ApiError> {
        self.send(
            Method::POST,
            self.dev_login_url.clone(),
            Some(request),
            Access::Public,
        )
        .await
    }

    async fn get<T>(&self, endpoint: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        self.request::<T, ()>(Method::GET, endpoint, None, Access::Authenticated)
            .await
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        access: Access,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{endpoint}", self.base_url);
        self.send(method, url, body, access).await
    }

    async fn send<T, B>(
        &self,
        method: Method,
        url: String,
        body: Option<&B>,
        access: Access,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        tracing::debug!(%method, %url, "api request");

        let mut builder = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if access == Access::Authenticated {
            if let Some(token) = self.session.token() {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;

        if access == Access::Authenticated && resp.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%url, "authentication rejected, clearing session");
            self.session.clear_session();
        }

        decode(resp).await
    }
}

/// Resolve a response into a typed value or a normalized error.
async fn decode<T>(resp: Response) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let err = ApiError::from_response(status, &body);
        tracing::debug!(status = status.as_u16(), error = %err, "api error response");
        return Err(err);
    }

    if status == StatusCode::NO_CONTENT || has_zero_length(resp.headers()) {
        return Ok(T::default());
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn has_zero_length(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

fn runbook_path(filename: &str, suffix: &str) -> String {
    format!("/runbooks/{}{suffix}", urlencoding::encode(filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use axum::{
        extract::Path,
        http::{header::AUTHORIZATION, HeaderMap as AxumHeaders, StatusCode as AxumStatus},
        response::{IntoResponse, Response as AxumResponse},
        routing::{get, patch, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    const VALID_TOKEN: &str = "valid-token";

    fn is_authorized(headers: &AxumHeaders) -> bool {
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
            == Some(&format!("Bearer {VALID_TOKEN}")[..])
    }

    fn rejected() -> AxumResponse {
        (
            AxumStatus::UNAUTHORIZED,
            Json(json!({"error": "token expired", "success": false})),
        )
            .into_response()
    }

    async fn list_handler(headers: AxumHeaders) -> AxumResponse {
        if !is_authorized(&headers) {
            return rejected();
        }
        if headers.get("content-type").and_then(|v| v.to_str().ok()) != Some("application/json") {
            return AxumStatus::BAD_REQUEST.into_response();
        }
        Json(json!({
            "success": true,
            "runbooks": [
                {"filename": "deploy.md", "name": "Deploy", "path": "/runbooks/deploy.md"},
                {"filename": "rollback.md", "name": "Rollback", "path": "/runbooks/rollback.md"}
            ]
        }))
        .into_response()
    }

    async fn runbook_handler(headers: AxumHeaders, Path(filename): Path<String>) -> AxumResponse {
        if !is_authorized(&headers) {
            return rejected();
        }
        match filename.as_str() {
            "missing.md" => (
                AxumStatus::NOT_FOUND,
                Json(json!({"error": "not found", "success": false})),
            )
                .into_response(),
            "broken.md" => (AxumStatus::INTERNAL_SERVER_ERROR, "kaboom").into_response(),
            _ => Json(json!({
                "success": true,
                "filename": filename,
                "name": "Deploy",
                "content": "# Deploy\n"
            }))
            .into_response(),
        }
    }

    async fn execute_handler(
        headers: AxumHeaders,
        Path(filename): Path<String>,
        Json(body): Json<Value>,
    ) -> AxumResponse {
        if !is_authorized(&headers) {
            return rejected();
        }
        Json(json!({
            "success": true,
            "runbook": filename,
            "return_code": 0,
            "stdout": body["env_vars"]["GREETING"],
            "errors": [],
            "warnings": [],
            "viewer_link": "http://viewer.local/runs/1"
        }))
        .into_response()
    }

    async fn validate_handler(
        headers: AxumHeaders,
        Path(filename): Path<String>,
        Json(body): Json<Value>,
    ) -> AxumResponse {
        if !is_authorized(&headers) {
            return rejected();
        }
        if filename == "noop.md" {
            return AxumStatus::NO_CONTENT.into_response();
        }
        let warnings = if body["env_vars"].as_object().is_some_and(serde_json::Map::is_empty) {
            vec!["no environment overrides"]
        } else {
            Vec::new()
        };
        Json(json!({
            "success": true,
            "runbook": filename,
            "errors": [],
            "warnings": warnings
        }))
        .into_response()
    }

    async fn required_env_handler(
        headers: AxumHeaders,
        Path(filename): Path<String>,
    ) -> AxumResponse {
        if !is_authorized(&headers) {
            return rejected();
        }
        if filename == "empty.md" {
            return (AxumStatus::OK, [("content-length", "0")], "").into_response();
        }
        Json(json!({
            "required": [
                {"name": "REGION", "description": "Target region"},
                {"name": "API_KEY", "description": "Deploy key"}
            ],
            "available": [{"name": "REGION", "description": "Target region"}],
            "missing": [{"name": "API_KEY", "description": "Deploy key"}]
        }))
        .into_response()
    }

    async fn dev_login_handler(headers: AxumHeaders, Json(body): Json<Value>) -> AxumResponse {
        if headers.contains_key(AUTHORIZATION) {
            return (
                AxumStatus::BAD_REQUEST,
                Json(json!({"error": "login must be anonymous", "success": false})),
            )
                .into_response();
        }
        if body.get("subject").and_then(Value::as_str) == Some("locked-out") {
            return (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"error": "subject locked", "success": false})),
            )
                .into_response();
        }
        Json(json!({
            "access_token": VALID_TOKEN,
            "token_type": "bearer",
            "expires_at": "2999-01-01T00:00:00Z",
            "subject": body.get("subject").and_then(Value::as_str).unwrap_or("dev-user"),
            "roles": body.get("roles").cloned().unwrap_or_else(|| json!(["developer"]))
        }))
        .into_response()
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route("/api/runbooks", get(list_handler))
            .route("/api/runbooks/{filename}", get(runbook_handler))
            .route("/api/runbooks/{filename}/execute", post(execute_handler))
            .route("/api/runbooks/{filename}/validate", patch(validate_handler))
            .route(
                "/api/runbooks/{filename}/required-env",
                get(required_env_handler),
            )
            .route("/dev-login", post(dev_login_handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store_with_token(token: Option<&str>) -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::load(Arc::new(MemoryStorage::new())));
        if let Some(token) = token {
            store.set_session(&LoginResponse {
                access_token: token.to_string(),
                token_type: "bearer".to_string(),
                expires_at: "2999-01-01T00:00:00Z".to_string(),
                subject: "dev-user".to_string(),
                roles: vec!["developer".to_string()],
            });
        }
        store
    }

    async fn test_client(token: Option<&str>) -> ApiClient {
        let server = spawn_backend().await;
        ApiClient::new(
            format!("{server}/api/"),
            format!("{server}/dev-login"),
            store_with_token(token),
        )
    }

    #[tokio::test]
    async fn test_list_runbooks_with_bearer() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let runbooks = client.list_runbooks().await.unwrap();
        assert_eq!(runbooks.len(), 2);
        assert_eq!(runbooks[0].filename, "deploy.md");
        assert_eq!(runbooks[1].name, "Rollback");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let client = test_client(Some("stale-token")).await;
        assert!(client.session().is_authenticated());

        let err = client.list_runbooks().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "token expired");
        assert!(!client.session().is_authenticated());
        assert!(client.session().token().is_none());
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let client = test_client(None).await;
        let err = client.get_runbook("deploy.md").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_get_runbook_escapes_filename() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let content = client.get_runbook("ops guide #2.md").await.unwrap();
        assert_eq!(content.filename, "ops guide #2.md");
        assert_eq!(content.content, "# Deploy\n");
    }

    #[tokio::test]
    async fn test_structured_not_found() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let err = client.get_runbook("missing.md").await.unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(err.payload().is_some());
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_unstructured_server_error() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let err = client.get_runbook("broken.md").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.payload().is_none());
    }

    #[tokio::test]
    async fn test_execute_sends_env_vars() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let mut env = BTreeMap::new();
        env.insert("GREETING".to_string(), "hello".to_string());

        let result = client.execute_runbook("deploy.md", &env).await.unwrap();
        assert!(result.success);
        assert_eq!(result.runbook, "deploy.md");
        assert_eq!(result.return_code, Some(0));
        assert_eq!(result.stdout.as_deref(), Some("hello"));
        assert_eq!(
            result.viewer_link.as_deref(),
            Some("http://viewer.local/runs/1")
        );
    }

    #[tokio::test]
    async fn test_validate_no_content_is_empty_value() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let result = client
            .validate_runbook("noop.md", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(result, ValidateResponse::default());
    }

    #[tokio::test]
    async fn test_validate_returns_warnings() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let result = client
            .validate_runbook("deploy.md", &BTreeMap::new())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.warnings, vec!["no environment overrides"]);
    }

    #[tokio::test]
    async fn test_required_env_partitions() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let env = client.required_env("deploy.md").await.unwrap();
        assert_eq!(env.required.len(), 2);
        assert_eq!(env.available[0].name, "REGION");
        assert_eq!(env.missing[0].name, "API_KEY");
    }

    #[tokio::test]
    async fn test_zero_length_body_is_empty_value() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let env = client.required_env("empty.md").await.unwrap();
        assert_eq!(env, RequiredEnv::default());
    }

    #[tokio::test]
    async fn test_dev_login_is_anonymous() {
        let client = test_client(Some("stale-token")).await;
        let login = client
            .dev_login(&DevLoginRequest {
                subject: Some("alice".to_string()),
                roles: Some(vec!["admin".to_string()]),
            })
            .await
            .unwrap();

        assert_eq!(login.access_token, VALID_TOKEN);
        assert_eq!(login.subject, "alice");
        assert_eq!(login.roles, vec!["admin"]);
        // Login does not touch the stored session by itself.
        assert_eq!(client.session().token().as_deref(), Some("stale-token"));

        client.session().set_session(&login);
        assert!(client.session().has_role("admin"));
        assert_eq!(client.list_runbooks().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dev_login_rejection_keeps_session() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let err = client
            .dev_login(&DevLoginRequest {
                subject: Some("locked-out".to_string()),
                roles: None,
            })
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "subject locked");
        assert_eq!(client.session().token().as_deref(), Some(VALID_TOKEN));
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let client = test_client(Some(VALID_TOKEN)).await;
        let env = BTreeMap::new();
        let (list, missing, validate) = tokio::join!(
            client.list_runbooks(),
            client.get_runbook("missing.md"),
            client.validate_runbook("deploy.md", &env),
        );
        assert_eq!(list.unwrap().len(), 2);
        assert_eq!(missing.unwrap_err().status(), Some(StatusCode::NOT_FOUND));
        assert!(validate.unwrap().success);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_wrapped() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(
            format!("http://{addr}/api"),
            format!("http://{addr}/dev-login"),
            store_with_token(Some(VALID_TOKEN)),
        );
        let err = client.list_runbooks().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.status().is_none());
        assert!(client.session().is_authenticated());
    }
}
