use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::http::client::{ApiClient, ApiRequest};

pub const TASKS_ENDPOINT: &str = "tasks/";

pub fn task_endpoint(id: i64) -> String {
    format!("tasks/{}/", id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Pending,
    #[serde(rename = "On Hold")]
    OnHold,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Pending,
        TaskStatus::OnHold,
        TaskStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Pending => "Pending",
            TaskStatus::OnHold => "On Hold",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts the wire label in any case, with spaces, dashes or underscores
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        TaskStatus::ALL
            .into_iter()
            .find(|status| normalize_label(status.as_str()) == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown status '{}' (expected one of: {})",
                    s,
                    TaskStatus::ALL.map(TaskStatus::as_str).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        Priority::ALL
            .into_iter()
            .find(|priority| normalize_label(priority.as_str()) == wanted)
            .ok_or_else(|| format!("unknown priority '{}' (expected Low, Medium or High)", s))
    }
}

fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub priority_label: Option<String>,
    #[serde(default)]
    pub status_label: Option<String>,
    #[serde(default)]
    pub assigned_to_username: Option<String>,
    #[serde(default)]
    pub created_by_username: Option<String>,
}

/// Writable task fields, sent whole on create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub assigned_to: Option<i64>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date: None,
            priority: Priority::Low,
            status: TaskStatus::NotStarted,
            assigned_to: None,
        }
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: task.priority,
            status: task.status,
            assigned_to: task.assigned_to,
        }
    }
}

/// Server-side list filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

impl TaskFilter {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(status) = self.status {
            request = request.with_query("status", status.as_str());
        }
        if let Some(priority) = self.priority {
            request = request.with_query("priority", priority.as_str());
        }
        if let Some(user) = self.assigned_to {
            request = request.with_query("assigned_to", user.to_string());
        }
        if let Some(date) = self.due_date {
            request = request.with_query("due_date", date.format("%Y-%m-%d").to_string());
        }
        request
    }
}

pub async fn list_tasks(client: &ApiClient, filter: &TaskFilter) -> Result<Vec<Task>, ClientError> {
    client.fetch_json(filter.apply(ApiRequest::get(TASKS_ENDPOINT))).await
}

pub async fn get_task(client: &ApiClient, id: i64) -> Result<Task, ClientError> {
    client.get_json(&task_endpoint(id)).await
}

pub async fn create_task(client: &ApiClient, draft: &TaskDraft) -> Result<Task, ClientError> {
    client.post_json(TASKS_ENDPOINT, draft).await
}

pub async fn update_task(client: &ApiClient, id: i64, draft: &TaskDraft) -> Result<Task, ClientError> {
    client.put_json(&task_endpoint(id), draft).await
}

pub async fn delete_task(client: &ApiClient, id: i64) -> Result<(), ClientError> {
    client.delete(&task_endpoint(id)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parses_loosely() {
        assert_eq!("in progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("on-hold".parse::<TaskStatus>(), Ok(TaskStatus::OnHold));
        assert_eq!("NOT_STARTED".parse::<TaskStatus>(), Ok(TaskStatus::NotStarted));
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
    }

    #[test]
    fn task_decodes_from_server_shape() {
        let task: Task = serde_json::from_value(json!({
            "id": 12,
            "title": "Ship release",
            "description": "",
            "due_date": "2025-03-01",
            "priority": "High",
            "status": "In Progress",
            "created_by": 1,
            "assigned_to": null,
            "created_on": "2025-02-20T09:15:00.123456",
            "priority_label": "High",
            "status_label": "In Progress"
        }))
        .unwrap();

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(task.assigned_to, None);
    }

    #[test]
    fn draft_serializes_wire_labels() {
        let mut draft = TaskDraft::new("Write docs");
        draft.status = TaskStatus::OnHold;
        let value = serde_json::to_value(&draft).unwrap();

        assert_eq!(value["status"], "On Hold");
        assert_eq!(value["priority"], "Low");
        assert_eq!(value["due_date"], serde_json::Value::Null);
    }

    #[test]
    fn filter_becomes_query_parameters() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            ..TaskFilter::default()
        };
        let request = filter.apply(ApiRequest::get(TASKS_ENDPOINT));

        assert_eq!(
            request.query,
            vec![
                ("status".to_string(), "Pending".to_string()),
                ("due_date".to_string(), "2025-01-31".to_string()),
            ]
        );
    }
}
