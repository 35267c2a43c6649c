pub mod guard;
pub mod permissions;
pub mod session;
pub mod store;
pub mod tokens;

pub use guard::{authorize, authorize_route, visible_routes, GuardDecision, Route};
pub use permissions::{has_permissions, Capability, PermissionRequirement};
pub use session::{RefreshLoop, SessionManager, SessionState, UserProfile};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use tokens::TokenPair;
