//! REST client for the dashboard backend.
//!
//! Covers the token endpoint, user management and the acquisitions feed.
//! Every endpoint except `/token` expects a bearer token.

use crate::config::Config;
use crate::models::{Acquisition, LoginRequest, TokenResponse, User, UserUpdate};
use crate::session::{AuthContext, SessionError, SessionStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Create a new API configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone()).with_timeout(config.request_timeout)
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.base_url)
    }

    pub fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    /// URL of a single user, with `user_id` percent-encoded as one path segment.
    pub fn user_url(&self, user_id: &str) -> Result<String, ApiError> {
        let mut url = reqwest::Url::parse(&self.users_url())
            .map_err(|e| ApiError::Config(format!("Invalid base URL '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("Base URL '{}' cannot carry a path", self.base_url)))?
            .push(user_id);
        Ok(url.into())
    }

    pub fn acquisitions_url(&self) -> String {
        format!("{}/acquisitions", self.base_url)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_API_URL)
    }
}

/// API client error types.
#[derive(Debug)]
pub enum ApiError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
    /// Session state could not be read or written
    Session(String),
    /// The signed-in user may not perform this operation
    NotPermitted(String),
}

impl ApiError {
    /// True for 401/403 responses.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Server { status: 401 | 403, .. })
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Config(msg) => write!(f, "API config error: {msg}"),
            ApiError::Network(msg) => write!(f, "API network error: {msg}"),
            ApiError::Server { status, message } => {
                write!(f, "API server error ({status}): {message}")
            }
            ApiError::Serialization(msg) => write!(f, "API serialization error: {msg}"),
            ApiError::Session(msg) => write!(f, "Session error: {msg}"),
            ApiError::NotPermitted(msg) => write!(f, "Not permitted: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::Session(e.to_string())
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Async client for the dashboard backend.
pub struct ApiClient {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        tracing::info!(user_id = %username, "Requesting access token");
        let body = LoginRequest {
            user_id: username.to_string(),
            password: password.to_string(),
        };
        let request = self.client.post(self.config.token_url()).json(&body);
        self.send(request).await
    }

    /// List all users.
    pub async fn get_users(&self, token: &str) -> Result<Vec<User>, ApiError> {
        let request = self
            .client
            .get(self.config.users_url())
            .header("Authorization", bearer(token));
        self.send(request).await
    }

    /// Fetch a single user.
    pub async fn get_user(&self, user_id: &str, token: &str) -> Result<User, ApiError> {
        let request = self
            .client
            .get(self.config.user_url(user_id)?)
            .header("Authorization", bearer(token));
        self.send(request).await
    }

    /// Apply a partial update to a user.
    pub async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
        token: &str,
    ) -> Result<User, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Config("Nothing to update".to_string()));
        }
        tracing::info!(user_id = %user_id, "Updating user");
        self.post_json(&self.config.user_url(user_id)?, update, token)
            .await
    }

    /// Sign in with credentials, replacing whatever `session` held before.
    ///
    /// Fetches the user record with the fresh token and stores it without its
    /// password.
    pub async fn sign_in<S: SessionStore>(
        &self,
        session: &mut AuthContext<S>,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let token = self.login(username, password).await?.access;
        let user = self.get_user(username, &token).await?;
        let user = User {
            password: None,
            ..user
        };
        tracing::info!(user_id = %user.user_id, "Log in successful");
        session.set_auth(Some(user), Some(token))?;
        Ok(())
    }

    /// Update the signed-in user's own account and refresh the session user.
    ///
    /// Any other account is rejected with [`ApiError::NotPermitted`] before a
    /// request is made.
    pub async fn update_own_account<S: SessionStore>(
        &self,
        session: &mut AuthContext<S>,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<User, ApiError> {
        let token = session.require_token()?.to_string();
        match session.current_user() {
            Some(current) if current.user_id == user_id => {}
            Some(current) => {
                return Err(ApiError::NotPermitted(format!(
                    "signed in as '{}', cannot update '{user_id}'",
                    current.user_id
                )))
            }
            None => {
                return Err(ApiError::NotPermitted(
                    "sign in with username and password to update an account".to_string(),
                ))
            }
        }

        let updated = self.update_user(user_id, update, &token).await?;
        let updated = User {
            password: None,
            ..updated
        };
        session.set_auth(Some(updated.clone()), Some(token))?;
        Ok(updated)
    }

    /// Fetch every acquisition.
    pub async fn get_acquisitions(&self, token: &str) -> Result<Vec<Acquisition>, ApiError> {
        let request = self
            .client
            .get(self.config.acquisitions_url())
            .header("Authorization", bearer(token));
        let acquisitions: Vec<Acquisition> = self.send(request).await?;
        tracing::info!(count = acquisitions.len(), "Fetched acquisitions");
        Ok(acquisitions)
    }

    async fn post_json<B, T>(&self, url: &str, body: &B, token: &str) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(url)
            .header("Authorization", bearer(token))
            .json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = status.as_u16(), "API request failed");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

/// Blocking API client for use in synchronous contexts.
pub struct BlockingApiClient {
    inner: ApiClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingApiClient {
    /// Create a new blocking API client.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: ApiClient::new(config)?,
            runtime,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        self.inner.config()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        self.runtime.block_on(self.inner.login(username, password))
    }

    pub fn get_users(&self, token: &str) -> Result<Vec<User>, ApiError> {
        self.runtime.block_on(self.inner.get_users(token))
    }

    pub fn get_user(&self, user_id: &str, token: &str) -> Result<User, ApiError> {
        self.runtime.block_on(self.inner.get_user(user_id, token))
    }

    pub fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
        token: &str,
    ) -> Result<User, ApiError> {
        self.runtime
            .block_on(self.inner.update_user(user_id, update, token))
    }

    pub fn get_acquisitions(&self, token: &str) -> Result<Vec<Acquisition>, ApiError> {
        self.runtime.block_on(self.inner.get_acquisitions(token))
    }

    pub fn sign_in<S: SessionStore>(
        &self,
        session: &mut AuthContext<S>,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        self.runtime
            .block_on(self.inner.sign_in(session, username, password))
    }

    pub fn update_own_account<S: SessionStore>(
        &self,
        session: &mut AuthContext<S>,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<User, ApiError> {
        self.runtime
            .block_on(self.inner.update_own_account(session, user_id, update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type RequestLog = Arc<Mutex<Vec<String>>>;

    /// Serve one canned `(status, body)` response per connection, in order,
    /// recording each raw request.
    async fn canned_backend(responses: Vec<(u16, &'static str)>) -> (ApiClient, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status} Canned\r\n\
                     content-type: application/json\r\n\
                     content-length: {}\r\n\
                     connection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });

        let config = ApiConfig::new(format!("http://{addr}")).with_timeout(Duration::from_secs(5));
        (ApiClient::new(config).unwrap(), log)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        line.to_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().to_string())
                    })
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn signed_in(user_id: &str, token: &str) -> AuthContext<MemorySessionStore> {
        let mut session = AuthContext::new(MemorySessionStore::new());
        session
            .set_auth(
                Some(User {
                    user_id: user_id.to_string(),
                    name: "Jane Doe".to_string(),
                    password: None,
                }),
                Some(token.to_string()),
            )
            .unwrap();
        session
    }

    #[test]
    fn test_api_config_urls() {
        let config = ApiConfig::new("http://127.0.0.1:8080/");
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.token_url(), "http://127.0.0.1:8080/token");
        assert_eq!(config.users_url(), "http://127.0.0.1:8080/users");
        assert_eq!(config.user_url("jdoe").unwrap(), "http://127.0.0.1:8080/users/jdoe");
        assert_eq!(config.acquisitions_url(), "http://127.0.0.1:8080/acquisitions");
    }

    #[test]
    fn test_user_url_encodes_id() {
        let config = ApiConfig::new("http://127.0.0.1:8080");
        assert_eq!(
            config.user_url("a/b?c#d").unwrap(),
            "http://127.0.0.1:8080/users/a%2Fb%3Fc%23d"
        );

        let nested = ApiConfig::new("http://127.0.0.1:8080/api/");
        assert_eq!(nested.user_url("jdoe").unwrap(), "http://127.0.0.1:8080/api/users/jdoe");

        assert!(matches!(
            ApiConfig::new("not a url").user_url("jdoe"),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn test_api_config_from_config() {
        let mut config = Config::default();
        config.request_timeout = Duration::from_secs(3);
        let api = ApiConfig::from_config(&config);
        assert_eq!(api.base_url, "http://localhost:8080");
        assert_eq!(api.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Server {
            status: 401,
            message: "Invalid token".to_string(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "API server error (401): Invalid token");
        assert!(!ApiError::Network("refused".to_string()).is_unauthorized());
    }

    #[test]
    fn test_login_request_body() {
        let body = LoginRequest {
            user_id: "jdoe".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"user_id":"jdoe","password":"secret"}"#
        );
    }

    #[tokio::test]
    async fn test_update_user_rejects_empty_update() {
        let client = ApiClient::new(ApiConfig::default()).unwrap();
        let result = client
            .update_user("jdoe", &UserUpdate::default(), "token")
            .await;
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn test_acquisitions_decoded_with_bearer_header() {
        let (client, log) = canned_backend(vec![(
            200,
            r#"[{"timestamp":1700000000,"ore_sites":12},{"timestamp":1699990000,"ore_sites":4}]"#,
        )])
        .await;

        let acquisitions = client.get_acquisitions("token-123").await.unwrap();
        assert_eq!(
            acquisitions,
            vec![
                Acquisition::new(1_700_000_000, 12),
                Acquisition::new(1_699_990_000, 4)
            ]
        );

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /acquisitions "));
        assert!(requests[0]
            .to_lowercase()
            .contains("authorization: bearer token-123"));
    }

    #[tokio::test]
    async fn test_error_status_becomes_server_error() {
        let (client, _log) = canned_backend(vec![(401, "Invalid token")]).await;

        match client.get_users("expired").await {
            Err(ApiError::Server { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid token");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let (client, _log) = canned_backend(vec![(200, r#"{"unexpected": true}"#)]).await;
        let result = client.get_acquisitions("token").await;
        assert!(matches!(result, Err(ApiError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_sign_in_replaces_existing_token() {
        let (client, log) = canned_backend(vec![
            (200, r#"{"access":"fresh"}"#),
            (200, r#"{"user_id":"jdoe","name":"Jane Doe","password":"secret"}"#),
        ])
        .await;

        let mut session = AuthContext::new(MemorySessionStore::new());
        session.set_auth(None, Some("stale".to_string())).unwrap();

        client.sign_in(&mut session, "jdoe", "secret").await.unwrap();

        assert_eq!(session.current_token(), Some("fresh"));
        let user = session.current_user().unwrap();
        assert_eq!(user.user_id, "jdoe");
        assert_eq!(user.password, None);

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /token "));
        assert!(requests[0].contains(r#""password":"secret""#));
        assert!(requests[1].starts_with("GET /users/jdoe "));
        assert!(requests[1].to_lowercase().contains("authorization: bearer fresh"));
    }

    #[tokio::test]
    async fn test_sign_in_with_bad_credentials_keeps_session() {
        let (client, _log) = canned_backend(vec![(401, "Bad credentials")]).await;
        let mut session = signed_in("jdoe", "old");

        let result = client.sign_in(&mut session, "jdoe", "wrong").await;
        assert!(matches!(result, Err(ApiError::Server { status: 401, .. })));
        assert_eq!(session.current_token(), Some("old"));
    }

    #[tokio::test]
    async fn test_update_own_account_refreshes_session_user() {
        let (client, log) = canned_backend(vec![(
            200,
            r#"{"user_id":"jdoe","name":"New Name","password":"hunter2"}"#,
        )])
        .await;
        let mut session = signed_in("jdoe", "token-123");

        let update = UserUpdate {
            name: Some("New Name".to_string()),
            password: None,
        };
        let updated = client
            .update_own_account(&mut session, "jdoe", &update)
            .await
            .unwrap();

        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.password, None);
        assert_eq!(session.current_user().unwrap().name, "New Name");
        assert_eq!(session.current_token(), Some("token-123"));

        let requests = log.lock().unwrap();
        assert!(requests[0].starts_with("POST /users/jdoe "));
        assert!(requests[0].contains(r#"{"name":"New Name"}"#));
    }

    #[tokio::test]
    async fn test_update_other_account_is_not_permitted() {
        // No backend: the check must fail before any request
        let client = ApiClient::new(ApiConfig::new("http://127.0.0.1:9")).unwrap();
        let update = UserUpdate {
            name: Some("Mallory".to_string()),
            password: None,
        };

        let mut session = signed_in("jdoe", "token-123");
        let result = client
            .update_own_account(&mut session, "someone-else", &update)
            .await;
        assert!(matches!(result, Err(ApiError::NotPermitted(_))));
        assert_eq!(session.current_user().unwrap().name, "Jane Doe");

        let mut token_only = AuthContext::new(MemorySessionStore::new());
        token_only.set_auth(None, Some("token-123".to_string())).unwrap();
        let result = client
            .update_own_account(&mut token_only, "jdoe", &update)
            .await;
        assert!(matches!(result, Err(ApiError::NotPermitted(_))));
    }
}
