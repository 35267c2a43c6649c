use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tasks::{Priority, TaskStatus};
use crate::error::ClientError;
use crate::http::client::ApiClient;

pub const DASHBOARD_ENDPOINT: &str = "tasks/dashboard";

/// Aggregate counts behind the dashboard cards and charts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_tasks: u64,
    #[serde(default)]
    pub tasks_by_status: BTreeMap<String, u64>,
    /// Excludes completed tasks
    #[serde(default)]
    pub tasks_by_priority: BTreeMap<String, u64>,
    #[serde(default)]
    pub tasks_due_today: u64,
    #[serde(default)]
    pub tasks_assigned_to_user: u64,
}

impl DashboardSummary {
    /// Counts in workflow order, zero-filled
    pub fn status_counts(&self) -> Vec<(TaskStatus, u64)> {
        TaskStatus::ALL
            .into_iter()
            .map(|status| (status, self.tasks_by_status.get(status.as_str()).copied().unwrap_or(0)))
            .collect()
    }

    pub fn priority_counts(&self) -> Vec<(Priority, u64)> {
        Priority::ALL
            .into_iter()
            .map(|priority| (priority, self.tasks_by_priority.get(priority.as_str()).copied().unwrap_or(0)))
            .collect()
    }

    pub fn open_tasks(&self) -> u64 {
        let completed = self
            .tasks_by_status
            .get(TaskStatus::Completed.as_str())
            .copied()
            .unwrap_or(0);
        self.total_tasks.saturating_sub(completed)
    }
}

pub async fn fetch_dashboard(client: &ApiClient) -> Result<DashboardSummary, ClientError> {
    client.get_json(DASHBOARD_ENDPOINT).await
}
