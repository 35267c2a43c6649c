pub mod client;
pub mod hooks;

pub use client::{ApiClient, ApiRequest, RequestKind};
pub use hooks::{LogNavigator, LogNotifier, Navigator, Notice, NoticeLevel, Notifier};
