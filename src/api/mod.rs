use crate::error::ClientError;
use crate::http::hooks::{Notice, Notifier};

pub mod dashboard;
pub mod tasks;
pub mod users;

pub use dashboard::DashboardSummary;
pub use tasks::{Priority, Task, TaskDraft, TaskFilter, TaskStatus};
pub use users::{NewUser, UserSummary, UserUpdate};

/// Surface the outcome of a feature call as a notice and hand the result back.
///
/// Failures use the server's message when it sent one, otherwise `fallback`.
pub fn report<T>(
    notifier: &dyn Notifier,
    result: Result<T, ClientError>,
    success: Option<&str>,
    fallback: &str,
) -> Result<T, ClientError> {
    match &result {
        Ok(_) => {
            if let Some(message) = success {
                notifier.notify(Notice::success(message));
            }
        }
        Err(err) => notifier.notify(Notice::error(err.notice_message(fallback))),
    }
    result
}
