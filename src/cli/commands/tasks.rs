use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::api::report;
use crate::api::tasks::{self, Priority, Task, TaskDraft, TaskFilter, TaskStatus};
use crate::auth::guard::Route;
use crate::auth::permissions::Capability;
use crate::cli::context::CliContext;
use crate::cli::utils::{output_empty_collection, output_json, output_success, print_fields, truncate};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TaskCommands {
    #[command(about = "List tasks")]
    List {
        #[arg(long, help = "Only tasks with this status")]
        status: Option<TaskStatus>,
        #[arg(long, help = "Only tasks with this priority")]
        priority: Option<Priority>,
        #[arg(long, help = "Only tasks assigned to this user id")]
        assigned_to: Option<i64>,
        #[arg(long, help = "Only tasks due on this date (YYYY-MM-DD)")]
        due: Option<NaiveDate>,
    },

    #[command(about = "Show a single task")]
    Show {
        #[arg(help = "Task id")]
        id: i64,
    },

    #[command(about = "Create a task")]
    Create {
        #[arg(help = "Title")]
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },

    #[command(about = "Update a task")]
    Update {
        #[arg(help = "Task id")]
        id: i64,
        #[arg(long, help = "New title")]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },

    #[command(about = "Delete a task")]
    Delete {
        #[arg(help = "Task id")]
        id: i64,
    },
}

#[derive(Args)]
pub struct TaskFields {
    #[arg(long, help = "Description")]
    pub description: Option<String>,
    #[arg(long, help = "Due date (YYYY-MM-DD)")]
    pub due: Option<NaiveDate>,
    #[arg(long, help = "Low, Medium or High")]
    pub priority: Option<Priority>,
    #[arg(long, help = "Not Started, In Progress, Pending, On Hold or Completed")]
    pub status: Option<TaskStatus>,
    #[arg(long, help = "Assignee user id")]
    pub assign: Option<i64>,
}

impl TaskFields {
    fn apply(self, draft: &mut TaskDraft) {
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(due) = self.due {
            draft.due_date = Some(due);
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(user) = self.assign {
            draft.assigned_to = Some(user);
        }
    }
}

pub async fn handle(cmd: TaskCommands, api_root: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::connect(api_root, output_format).await?;

    match cmd {
        TaskCommands::List { status, priority, assigned_to, due } => {
            ctx.require(Route::MyTasks).await?;
            let filter = TaskFilter { status, priority, assigned_to, due_date: due };

            let found = report(
                ctx.notifier(),
                tasks::list_tasks(ctx.client(), &filter).await,
                None,
                "Failed to load tasks.",
            )?;

            if found.is_empty() {
                return output_empty_collection(&ctx.output_format, "tasks", "No tasks found");
            }
            match ctx.output_format {
                OutputFormat::Json => output_json(&json!({ "tasks": found })),
                OutputFormat::Text => {
                    print_task_table(&found);
                    Ok(())
                }
            }
        }
        TaskCommands::Show { id } => {
            ctx.require(Route::MyTasks).await?;
            let task = report(
                ctx.notifier(),
                tasks::get_task(ctx.client(), id).await,
                None,
                "Failed to load task.",
            )?;

            match ctx.output_format {
                OutputFormat::Json => output_json(&task),
                OutputFormat::Text => {
                    print_task(&task);
                    Ok(())
                }
            }
        }
        TaskCommands::Create { title, fields } => {
            ctx.require_capability(Route::MyTasks, Capability::CreateTask).await?;
            let mut draft = TaskDraft::new(title);
            fields.apply(&mut draft);

            let task = report(
                ctx.notifier(),
                tasks::create_task(ctx.client(), &draft).await,
                Some("Task created successfully."),
                "Failed to create task.",
            )?;

            output_success(
                &ctx.output_format,
                &format!("Created task #{}", task.id),
                Some(json!({ "task": task })),
            )
        }
        TaskCommands::Update { id, title, fields } => {
            ctx.require_capability(Route::MyTasks, Capability::EditTask).await?;

            let current = report(
                ctx.notifier(),
                tasks::get_task(ctx.client(), id).await,
                None,
                "Failed to load task.",
            )?;
            let mut draft = TaskDraft::from(&current);
            if let Some(title) = title {
                draft.title = title;
            }
            fields.apply(&mut draft);

            let task = report(
                ctx.notifier(),
                tasks::update_task(ctx.client(), id, &draft).await,
                Some("Task updated successfully."),
                "Failed to update task.",
            )?;

            output_success(
                &ctx.output_format,
                &format!("Updated task #{}", task.id),
                Some(json!({ "task": task })),
            )
        }
        TaskCommands::Delete { id } => {
            ctx.require_capability(Route::MyTasks, Capability::DeleteTask).await?;

            report(
                ctx.notifier(),
                tasks::delete_task(ctx.client(), id).await,
                Some("Task deleted successfully."),
                "Failed to delete task.",
            )?;

            output_success(&ctx.output_format, &format!("Deleted task #{}", id), Some(json!({ "id": id })))
        }
    }
}

fn print_task_table(found: &[Task]) {
    println!("{:>5}  {:<32}  {:<12}  {:<8}  {:<10}  {}", "ID", "TITLE", "STATUS", "PRIORITY", "DUE", "ASSIGNEE");
    for task in found {
        println!(
            "{:>5}  {:<32}  {:<12}  {:<8}  {:<10}  {}",
            task.id,
            truncate(&task.title, 32),
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            assignee(task),
        );
    }
}

fn print_task(task: &Task) {
    print_fields(&[
        ("Task", format!("#{} {}", task.id, task.title)),
        ("Status", task.status.to_string()),
        ("Priority", task.priority.to_string()),
        ("Due", task.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())),
        ("Assignee", assignee(task)),
        (
            "Created by",
            task.created_by_username
                .clone()
                .or_else(|| task.created_by.map(|id| format!("#{}", id)))
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Created on", task.created_on.clone().unwrap_or_else(|| "-".to_string())),
        ("Description", task.description.clone()),
    ]);
}

fn assignee(task: &Task) -> String {
    task.assigned_to_username
        .clone()
        .or_else(|| task.assigned_to.map(|id| format!("#{}", id)))
        .unwrap_or_else(|| "-".to_string())
}
