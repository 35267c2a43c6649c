use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::permissions::Capability;
use super::tokens::TokenPair;
use crate::api::users::USER_INFO_ENDPOINT;
use crate::error::ClientError;
use crate::http::client::{ApiClient, LOGIN_ENDPOINT, LOGOUT_ENDPOINT};
use crate::http::hooks::{Notice, Notifier};

/// Profile of the signed-in user as returned by `users/info/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default, alias = "is_superadmin")]
    pub is_superuser: bool,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Authentication state owned by the [`SessionManager`]. Everyone else works
/// on snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub tokens: Option<TokenPair>,
    pub user_info: Option<UserProfile>,
    pub permissions: BTreeSet<String>,
    pub loading: bool,
}

impl SessionState {
    /// Signed out, bootstrap finished
    pub fn empty() -> Self {
        Self {
            tokens: None,
            user_info: None,
            permissions: BTreeSet::new(),
            loading: false,
        }
    }

    /// State before `bootstrap` has run
    pub fn bootstrapping() -> Self {
        Self {
            loading: true,
            ..Self::empty()
        }
    }

    fn established(tokens: TokenPair, profile: Option<UserProfile>) -> Self {
        let permissions = profile
            .as_ref()
            .map(|p| p.permissions.iter().cloned().collect())
            .unwrap_or_default();
        Self {
            tokens: Some(tokens),
            user_info: profile,
            permissions,
            loading: false,
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.tokens.as_ref().map_or(false, TokenPair::has_access)
    }

    pub fn can(&self, capability: Capability) -> bool {
        capability.allowed(&self.permissions)
    }
}

/// Owns the session: login, logout, bootstrap and the refresh schedule.
///
/// Construct one per application and share it by `Arc`.
pub struct SessionManager {
    client: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<SessionState>,
    refresh_interval: Duration,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, notifier: Arc<dyn Notifier>, refresh_interval: Duration) -> Self {
        Self {
            client,
            notifier,
            state: RwLock::new(SessionState::bootstrapping()),
            refresh_interval,
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Copy of the current state. Tokens are re-read from the store so a
    /// teardown performed by the HTTP layer is visible immediately.
    pub async fn snapshot(&self) -> SessionState {
        let mut snapshot = self.state.read().await.clone();
        if snapshot.tokens.is_none() {
            return snapshot;
        }

        match self.client.store().load().await {
            Some(pair) => snapshot.tokens = Some(pair),
            None => {
                tracing::debug!("Token storage emptied outside the session manager");
                snapshot = SessionState::empty();
                *self.state.write().await = snapshot.clone();
            }
        }
        snapshot
    }

    pub async fn is_active(&self) -> bool {
        let state = self.state.read().await;
        !state.loading && state.tokens.is_some()
    }

    /// Exchange credentials for a token pair and establish the session.
    ///
    /// The profile fetch that follows is best-effort: a failure leaves a
    /// session with tokens but no profile and no permissions.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ClientError> {
        let credentials = json!({ "username": username, "password": password });

        let tokens: TokenPair = match self.client.post_credentials(LOGIN_ENDPOINT, &credentials).await {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::warn!("Login failed for '{}': {}", username, err);
                let err = match err.status_code() {
                    Some(400) | Some(401) => ClientError::InvalidCredentials,
                    _ => err,
                };
                let message = match &err {
                    ClientError::InvalidCredentials => "Invalid credentials".to_string(),
                    other => format!("Login failed: {}", other),
                };
                self.notifier.notify(Notice::error(message));
                return Err(err);
            }
        };

        if !tokens.has_access() || !tokens.has_refresh() {
            let err = ClientError::Decode("login response is missing access or refresh token".to_string());
            self.notifier.notify(Notice::error(format!("Login failed: {}", err)));
            return Err(err);
        }

        self.client.store().save(&tokens).await?;

        let profile = match self.fetch_profile().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Logged in but failed to fetch user info: {}", e);
                None
            }
        };

        tracing::info!(
            "Logged in as '{}' ({} permissions)",
            username,
            profile.as_ref().map_or(0, |p| p.permissions.len())
        );
        *self.state.write().await = SessionState::established(tokens.clone(), profile);

        Ok(tokens)
    }

    /// End the session. The server is asked to blacklist the refresh token on
    /// a best-effort basis; local state is always cleared. Only a failure to
    /// clear the token storage is returned.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if let Some(pair) = self.client.store().load().await.filter(TokenPair::has_refresh) {
            let body = json!({ "refresh": pair.refresh });
            if let Err(e) = self.client.post_credentials_unit(LOGOUT_ENDPOINT, &body).await {
                tracing::warn!("Logout failed or token already blacklisted: {}", e);
            }
        }

        let cleared = self.client.store().clear().await;
        *self.state.write().await = SessionState::empty();
        tracing::info!("Session cleared");

        cleared.map_err(ClientError::from)
    }

    /// Restore a persisted session at start-up. Always ends with
    /// `loading == false`.
    pub async fn bootstrap(&self) {
        if self.client.store().load().await.is_none() {
            tracing::debug!("No persisted session");
            *self.state.write().await = SessionState::empty();
            return;
        }

        let restored = match self.fetch_profile().await {
            // The fetch may have refreshed the access token; take the latest pair
            Ok(profile) => match self.client.store().load().await {
                Some(tokens) => {
                    tracing::info!("Restored session for '{}'", profile.username);
                    SessionState::established(tokens, Some(profile))
                }
                None => SessionState::empty(),
            },
            Err(e) => {
                tracing::warn!("Persisted session could not be validated: {}", e);
                SessionState::empty()
            }
        };

        *self.state.write().await = restored;
    }

    /// Refresh the access token now. On failure the session is torn down
    /// through the logout path and the error returned, unless the session
    /// was already replaced while the refresh ran.
    pub async fn refresh(&self) -> Result<TokenPair, ClientError> {
        match self.client.refresh_access().await {
            Ok(pair) => {
                let mut state = self.state.write().await;
                if state.tokens.is_some() {
                    state.tokens = Some(pair.clone());
                }
                Ok(pair)
            }
            Err(ClientError::SessionChanged) => Err(ClientError::SessionChanged),
            Err(err) => {
                if let Err(e) = self.logout().await {
                    tracing::warn!("Failed to clear session after refresh failure: {}", e);
                }
                Err(err)
            }
        }
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        self.client.get_json(USER_INFO_ENDPOINT).await
    }

    /// Start the periodic background refresh. The timer stops when the
    /// returned handle is stopped or dropped, or when the manager goes away.
    pub fn start_refresh_loop(self: &Arc<Self>) -> RefreshLoop {
        let session: Weak<Self> = Arc::downgrade(self);
        let interval = self.refresh_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                if !session.is_active().await {
                    tracing::debug!("No active session, skipping background refresh");
                    continue;
                }
                if let Err(e) = session.refresh().await {
                    tracing::warn!("Background token refresh failed: {}", e);
                }
            }
        });

        tracing::debug!("Background refresh every {:?}", interval);
        RefreshLoop { handle }
    }
}

/// Handle to the background refresh task
pub struct RefreshLoop {
    handle: JoinHandle<()>,
}

impl RefreshLoop {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
