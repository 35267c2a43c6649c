use std::sync::Arc;

use crate::auth::guard::{authorize_route, GuardDecision, Route, LOGIN_PATH};
use crate::auth::permissions::Capability;
use crate::auth::session::{SessionManager, SessionState};
use crate::cli::config as cli_config;
use crate::cli::OutputFormat;
use crate::config::ClientConfig;
use crate::http::client::ApiClient;
use crate::http::hooks::{LogNavigator, LogNotifier, Navigator, Notice, NoticeLevel, Notifier};

/// Prints notices on stderr. Error notices are left to the command's exit
/// error and only logged.
pub struct TerminalNotifier {
    output_format: OutputFormat,
}

impl TerminalNotifier {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match (notice.level, &self.output_format) {
            (NoticeLevel::Error, _) => tracing::debug!("{}", notice.message),
            (_, OutputFormat::Json) => LogNotifier.notify(notice),
            (NoticeLevel::Success, OutputFormat::Text) => eprintln!("✓ {}", notice.message),
            (NoticeLevel::Info, OutputFormat::Text) => eprintln!("{}", notice.message),
        }
    }
}

/// Turns redirects into hints, there is no page to move to
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        if path == LOGIN_PATH {
            eprintln!("Session expired. Run 'taskdesk auth login <username>' to sign in again.");
        } else {
            LogNavigator.navigate(path);
        }
    }
}

/// Everything a command needs to talk to the backend
pub struct CliContext {
    pub config: ClientConfig,
    pub session: Arc<SessionManager>,
    pub output_format: OutputFormat,
}

impl CliContext {
    /// Build the client stack and restore any persisted session
    pub async fn connect(api_root: Option<&str>, output_format: OutputFormat) -> anyhow::Result<Self> {
        Self::from_config(cli_config::resolve_client_config(api_root)?, output_format).await
    }

    pub async fn from_config(config: ClientConfig, output_format: OutputFormat) -> anyhow::Result<Self> {
        let store = Arc::new(cli_config::token_store(&config)?);
        let client = Arc::new(ApiClient::new(&config, store, Arc::new(TerminalNavigator))?);
        let notifier = Arc::new(TerminalNotifier::new(output_format.clone()));
        let session = Arc::new(SessionManager::new(client, notifier, config.refresh_interval()));

        session.bootstrap().await;

        Ok(Self { config, session, output_format })
    }

    pub fn client(&self) -> &ApiClient {
        self.session.client()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.session.notifier().as_ref()
    }

    /// Gate a command on the route it corresponds to
    pub async fn require(&self, route: Route) -> anyhow::Result<SessionState> {
        let state = self.session.snapshot().await;

        let decision = authorize_route(&state, route);
        if let Some(target) = decision.redirect_path() {
            tracing::debug!("{} redirects to {}", route.path(), target);
        }

        match decision {
            GuardDecision::Render => Ok(state),
            GuardDecision::RedirectToLogin { .. } => Err(anyhow::anyhow!(
                "Not logged in. Run 'taskdesk auth login <username>' first"
            )),
            GuardDecision::RedirectToUnauthorized => {
                let missing = route.requirement().missing(&state.permissions).join(", ");
                Err(anyhow::anyhow!(
                    "You are not authorized to access {} (missing: {})",
                    route.title(),
                    missing
                ))
            }
            GuardDecision::Pending => Err(anyhow::anyhow!("Session is still loading")),
        }
    }

    /// Gate a mutating action on top of its route
    pub async fn require_capability(&self, route: Route, capability: Capability) -> anyhow::Result<SessionState> {
        let state = self.require(route).await?;
        if !state.can(capability) {
            let missing = capability.requirement().missing(&state.permissions).join(", ");
            return Err(anyhow::anyhow!("Permission denied (missing: {})", missing));
        }
        Ok(state)
    }
}
