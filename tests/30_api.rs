mod common;

use std::sync::Arc;

use common::{MockBackend, RecordingNavigator, RecordingNotifier};
use taskdesk::api::dashboard::fetch_dashboard;
use taskdesk::api::tasks::{self, Priority, TaskDraft, TaskFilter, TaskStatus};
use taskdesk::api::{report, users};
use taskdesk::auth::store::MemoryTokenStore;
use taskdesk::http::{Notice, NoticeLevel};

#[tokio::test]
async fn filters_reach_the_backend() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let store = Arc::new(MemoryTokenStore::with_pair(backend.state.issue_pair()));
    let client = backend.client(store, Arc::new(RecordingNavigator::default()));

    let mut draft = TaskDraft::new("Book venue");
    draft.priority = Priority::Medium;
    tasks::create_task(&client, &draft).await?;

    let pending = TaskFilter { status: Some(TaskStatus::Pending), ..TaskFilter::default() };
    let medium = TaskFilter { priority: Some(Priority::Medium), ..TaskFilter::default() };

    let by_status = tasks::list_tasks(&client, &pending).await?;
    let by_priority = tasks::list_tasks(&client, &medium).await?;

    assert_eq!(by_status.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1]);
    assert_eq!(by_priority.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["Book venue"]);
    Ok(())
}

#[tokio::test]
async fn user_list_and_dashboard_decode() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let store = Arc::new(MemoryTokenStore::with_pair(backend.state.issue_pair()));
    let client = backend.client(store, Arc::new(RecordingNavigator::default()));

    let found = users::list_users(&client).await?;
    let summary = fetch_dashboard(&client).await?;

    assert_eq!(found.len(), 2);
    assert!(found[1].is_superuser);
    assert_eq!(summary.open_tasks(), 1);
    assert_eq!(summary.status_counts()[2], (TaskStatus::Pending, 1));
    Ok(())
}

#[tokio::test]
async fn feature_failures_become_notices() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let store = Arc::new(MemoryTokenStore::with_pair(backend.state.issue_pair()));
    let client = backend.client(store, Arc::new(RecordingNavigator::default()));
    let notifier = RecordingNotifier::default();

    let created = report(
        &notifier,
        tasks::create_task(&client, &TaskDraft::new("Ship it")).await,
        Some("Task created successfully."),
        "Failed to create task.",
    );
    let rejected = report(
        &notifier,
        tasks::create_task(&client, &TaskDraft::new("")).await,
        Some("Task created successfully."),
        "Failed to create task.",
    );

    assert!(created.is_ok());
    assert!(rejected.is_err());
    assert_eq!(
        notifier.notices(),
        vec![
            Notice::success("Task created successfully."),
            Notice { level: NoticeLevel::Error, message: "This field may not be blank.".to_string() },
        ]
    );
    Ok(())
}
