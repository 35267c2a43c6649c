use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use url::Url;

use super::hooks::Navigator;
use crate::auth::guard::LOGIN_PATH;
use crate::auth::store::TokenStore;
use crate::auth::tokens::{RefreshResponse, TokenPair};
use crate::config::ClientConfig;
use crate::error::ClientError;

pub const LOGIN_ENDPOINT: &str = "login/";
pub const REFRESH_ENDPOINT: &str = "refresh/";
pub const LOGOUT_ENDPOINT: &str = "logout";

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenPair, ClientError>>>;

/// Credential calls (login, refresh, logout) never carry a bearer and never
/// enter the refresh-and-retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Resource,
    Credential,
}

/// A request in replayable form: the body is kept as JSON so the same
/// request can be re-issued after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub kind: RequestKind,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            kind: RequestKind::Resource,
            retried: false,
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

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(self.with_body(value))
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn credential(mut self) -> Self {
        self.kind = RequestKind::Credential;
        self
    }

    pub fn is_mutating(&self) -> bool {
        self.method == Method::POST
            || self.method == Method::PUT
            || self.method == Method::PATCH
            || self.method == Method::DELETE
    }

    pub fn was_retried(&self) -> bool {
        self.retried
    }
}

/// Everything needed to put a request on the wire. Cloned into the shared
/// refresh future, which must own its state.
#[derive(Clone)]
struct Egress {
    http: reqwest::Client,
    base: Url,
    cookies: Arc<Jar>,
    csrf_cookie: String,
    csrf_header: String,
}

impl Egress {
    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn csrf_token(&self, url: &Url) -> Option<String> {
        let header = self.cookies.cookies(url)?;
        cookie_value(header.to_str().ok()?, &self.csrf_cookie)
    }

    async fn dispatch(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<Response, ClientError> {
        let url = self.url(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if request.is_mutating() {
            if let Some(csrf) = self.csrf_token(&url) {
                builder = builder.header(self.csrf_header.as_str(), csrf);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            bearer = bearer.is_some(),
            retried = request.retried,
            "Dispatching request"
        );

        Ok(builder.send().await?)
    }
}

#[derive(Default)]
struct InflightRefresh {
    next_id: u64,
    pending: Option<(u64, SharedRefresh)>,
}

/// Single egress point for backend calls.
///
/// Reads the token pair from the store on every request, attaches bearer and
/// CSRF headers, and recovers from an expired access token by refreshing once
/// and replaying the request. Concurrent refreshes share one in-flight call.
pub struct ApiClient {
    egress: Egress,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    inflight: Mutex<InflightRefresh>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(&config.api.api_root)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.api.api_root, e)))?;
        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            egress: Egress {
                http,
                base,
                cookies,
                csrf_cookie: config.api.csrf_cookie_name.clone(),
                csrf_header: config.api.csrf_header_name.clone(),
            },
            store,
            navigator,
            inflight: Mutex::new(InflightRefresh::default()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.egress.base
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Seed a cookie for the API host, e.g. a CSRF token obtained elsewhere.
    /// Cookies set by the server are captured automatically.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.egress
            .cookies
            .add_cookie_str(&format!("{}={}; Path=/", name, value), &self.egress.base);
    }

    /// Issue a request through the interceptors. Returns the response only
    /// when its status is a success.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Response, ClientError> {
        let bearer = match request.kind {
            RequestKind::Resource => self
                .store
                .load()
                .await
                .filter(TokenPair::has_access)
                .map(|pair| pair.access),
            RequestKind::Credential => None,
        };

        let response = self.egress.dispatch(&request, bearer.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED
            || request.retried
            || request.kind == RequestKind::Credential
        {
            return ensure_success(response).await;
        }

        let original = error_from_response(response).await;

        let Some(stored) = self.store.load().await.filter(TokenPair::has_refresh) else {
            tracing::debug!(path = %request.path, "401 with no refresh token stored, not retrying");
            return Err(original);
        };

        // Another task or process may already have replaced the token we sent
        let fresh = if stored.has_access() && bearer.as_deref() != Some(stored.access.as_str()) {
            tracing::debug!(path = %request.path, "Access token changed while request was in flight");
            stored
        } else {
            self.refresh_access().await?
        };

        request.retried = true;
        let response = self.egress.dispatch(&request, Some(&fresh.access)).await?;
        ensure_success(response).await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// At most one refresh call is in flight; callers arriving while it runs
    /// await the same result. On failure the store is cleared and the client
    /// is sent to the login route before the error is returned.
    pub async fn refresh_access(&self) -> Result<TokenPair, ClientError> {
        let (id, pending) = {
            let mut inflight = self.inflight.lock().await;
            let existing = inflight
                .pending
                .as_ref()
                .map(|(id, pending)| (*id, pending.clone()));

            match existing {
                Some(joined) => {
                    tracing::debug!("Joining in-flight token refresh");
                    joined
                }
                None => {
                    let id = inflight.next_id;
                    inflight.next_id += 1;
                    // Spawned so the refresh completes even if every waiter goes away
                    let task = tokio::spawn(refresh_once(
                        self.egress.clone(),
                        self.store.clone(),
                        self.navigator.clone(),
                    ));
                    let pending = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(ClientError::RefreshFailed(format!("refresh task failed: {}", e)))
                        })
                    }
                    .boxed()
                    .shared();
                    inflight.pending = Some((id, pending.clone()));
                    (id, pending)
                }
            }
        };

        let result = pending.await;

        let mut inflight = self.inflight.lock().await;
        if matches!(&inflight.pending, Some((current, _)) if *current == id) {
            inflight.pending = None;
        }

        result
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.fetch_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch_json(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch_json(ApiRequest::put(path).with_json(body)?).await
    }

    /// DELETE; returns the response body when the server sent one
    pub async fn delete(&self, path: &str) -> Result<Option<Value>, ClientError> {
        let response = self.send(ApiRequest::delete(path)).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&text).ok())
    }

    /// POST to a credential endpoint (login, logout)
    pub async fn post_credentials<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch_json(ApiRequest::post(path).credential().with_json(body)?).await
    }

    /// POST to a credential endpoint, ignoring whatever body comes back
    pub async fn post_credentials_unit<B>(&self, path: &str, body: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).credential().with_json(body)?).await?;
        Ok(())
    }
}

async fn refresh_once(
    egress: Egress,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
) -> Result<TokenPair, ClientError> {
    match request_new_access(&egress, store.as_ref()).await {
        Ok(pair) => {
            tracing::info!("Access token refreshed");
            Ok(pair)
        }
        Err(ClientError::SessionChanged) => {
            tracing::debug!("Discarding refreshed token, session changed meanwhile");
            Err(ClientError::SessionChanged)
        }
        Err(err) => {
            tracing::error!("Token refresh failed: {}", err);
            if let Err(e) = store.clear().await {
                tracing::warn!("Failed to clear token storage after refresh failure: {}", e);
            }
            navigator.navigate(LOGIN_PATH);
            Err(err)
        }
    }
}

async fn request_new_access(egress: &Egress, store: &dyn TokenStore) -> Result<TokenPair, ClientError> {
    let current = store
        .load()
        .await
        .filter(TokenPair::has_refresh)
        .ok_or_else(|| ClientError::RefreshFailed("no refresh token stored".to_string()))?;

    let request = ApiRequest::post(REFRESH_ENDPOINT)
        .credential()
        .with_body(json!({ "refresh": current.refresh }));

    let response = egress
        .dispatch(&request, None)
        .await
        .map_err(|e| ClientError::RefreshFailed(e.to_string()))?;
    let response = ensure_success(response)
        .await
        .map_err(|e| ClientError::RefreshFailed(e.to_string()))?;
    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|e| ClientError::RefreshFailed(e.to_string()))?;

    // A logout or new login while the call was out owns the store now
    let latest = store.load().await;
    if latest.as_ref().map(|pair| pair.refresh.as_str()) != Some(current.refresh.as_str()) {
        return Err(ClientError::SessionChanged);
    }

    let updated = current.with_access(body.access);
    store.save(&updated).await?;
    Ok(updated)
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(&text).ok());
    ClientError::from_status(status, body)
}

/// Value of cookie `name` in a `Cookie` header string
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryTokenStore;
    use crate::testing::RecordingNavigator;

    #[test]
    fn cookie_lookup_finds_named_value() {
        let header = "sessionid=abc; csrftoken=tok123; theme=dark";
        assert_eq!(cookie_value(header, "csrftoken"), Some("tok123".to_string()));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("csrftoken", "csrftoken"), None);
    }

    #[test]
    fn mutating_methods_are_detected() {
        assert!(ApiRequest::post("tasks/").is_mutating());
        assert!(ApiRequest::put("tasks/1/").is_mutating());
        assert!(ApiRequest::delete("tasks/1/").is_mutating());
        assert!(ApiRequest::new(Method::PATCH, "tasks/1/").is_mutating());
        assert!(!ApiRequest::get("tasks/").is_mutating());
    }

    #[test]
    fn fresh_requests_are_not_retried() {
        let request = ApiRequest::get("tasks/").with_query("status", "Pending");
        assert!(!request.was_retried());
        assert_eq!(request.kind, RequestKind::Resource);
        assert_eq!(request.query, vec![("status".to_string(), "Pending".to_string())]);
    }

    #[test]
    fn paths_join_under_the_api_root() {
        let config = ClientConfig::development().with_api_root("http://127.0.0.1:9/api");
        let client = ApiClient::new(
            &config,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::default()),
        )
        .unwrap();

        let url = client.egress.url("/tasks/7/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/api/tasks/7/");
    }

    #[test]
    fn seeded_csrf_cookie_is_visible_to_the_interceptor() {
        let config = ClientConfig::development().with_api_root("http://127.0.0.1:9/api/");
        let client = ApiClient::new(
            &config,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::default()),
        )
        .unwrap();

        client.set_cookie("csrftoken", "abc123");
        let url = client.egress.url("tasks/").unwrap();
        assert_eq!(client.egress.csrf_token(&url), Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn refresh_without_stored_token_tears_down() {
        let config = ClientConfig::development().with_api_root("http://127.0.0.1:9/api/");
        let navigator = Arc::new(RecordingNavigator::default());
        let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("a", "")));
        let client = ApiClient::new(&config, store.clone(), navigator.clone()).unwrap();

        let err = client.refresh_access().await.unwrap_err();

        assert!(matches!(err, ClientError::RefreshFailed(_)));
        assert_eq!(store.load().await, None);
        assert_eq!(navigator.visits(), vec!["/login".to_string()]);
    }
}
