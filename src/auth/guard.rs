use std::collections::BTreeSet;

use super::permissions::{has_permissions, PermissionRequirement, VIEW_TASK, VIEW_USER};
use super::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Navigable destinations of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Unauthorized,
    Dashboard,
    MyTasks,
    Config,
}

/// Sidebar order
pub const NAVIGATION: [Route; 3] = [Route::Dashboard, Route::MyTasks, Route::Config];

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Unauthorized => UNAUTHORIZED_PATH,
            Route::Dashboard => "/dashboard",
            Route::MyTasks => "/my_task",
            Route::Config => "/config",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Unauthorized => "Unauthorized",
            Route::Dashboard => "Dashboard",
            Route::MyTasks => "My Tasks",
            Route::Config => "Configuration",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        [Route::Login, Route::Unauthorized, Route::Dashboard, Route::MyTasks, Route::Config]
            .into_iter()
            .find(|route| route.path() == path)
    }

    pub fn is_public(self) -> bool {
        matches!(self, Route::Login | Route::Unauthorized)
    }

    pub fn requirement(self) -> PermissionRequirement {
        match self {
            Route::MyTasks => PermissionRequirement::all_of([VIEW_TASK]),
            Route::Config => PermissionRequirement::all_of([VIEW_USER]),
            Route::Login | Route::Unauthorized | Route::Dashboard => PermissionRequirement::none(),
        }
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session bootstrap still running; show a placeholder
    Pending,
    Render,
    /// Not signed in; `from` is where to go after login
    RedirectToLogin { from: String },
    RedirectToUnauthorized,
}

impl GuardDecision {
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            GuardDecision::RedirectToLogin { .. } => Some(LOGIN_PATH),
            GuardDecision::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
            GuardDecision::Pending | GuardDecision::Render => None,
        }
    }
}

/// Decide whether `destination` may be shown for the given session snapshot.
pub fn authorize(
    state: &SessionState,
    requirement: &PermissionRequirement,
    destination: &str,
) -> GuardDecision {
    if state.loading {
        return GuardDecision::Pending;
    }

    if !state.has_access_token() {
        return GuardDecision::RedirectToLogin {
            from: destination.to_string(),
        };
    }

    if !has_permissions(&state.permissions, requirement) {
        return GuardDecision::RedirectToUnauthorized;
    }

    GuardDecision::Render
}

pub fn authorize_route(state: &SessionState, route: Route) -> GuardDecision {
    if route.is_public() {
        return GuardDecision::Render;
    }
    authorize(state, &route.requirement(), route.path())
}

/// Navigation entries the holder of `permissions` may see
pub fn visible_routes(permissions: &BTreeSet<String>) -> Vec<Route> {
    NAVIGATION
        .into_iter()
        .filter(|route| has_permissions(permissions, &route.requirement()))
        .collect()
}
