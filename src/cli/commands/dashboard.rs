use crate::api::dashboard::{fetch_dashboard, DashboardSummary};
use crate::api::report;
use crate::auth::guard::Route;
use crate::cli::context::CliContext;
use crate::cli::utils::{output_json, print_fields};
use crate::cli::OutputFormat;

pub async fn handle(api_root: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::connect(api_root, output_format).await?;
    ctx.require(Route::Dashboard).await?;

    let summary = report(
        ctx.notifier(),
        fetch_dashboard(ctx.client()).await,
        None,
        "Failed to load dashboard.",
    )?;

    match ctx.output_format {
        OutputFormat::Json => output_json(&summary),
        OutputFormat::Text => {
            print_summary(&summary);
            Ok(())
        }
    }
}

fn print_summary(summary: &DashboardSummary) {
    print_fields(&[
        ("Total tasks", summary.total_tasks.to_string()),
        ("Open", summary.open_tasks().to_string()),
        ("Due today", summary.tasks_due_today.to_string()),
        ("Assigned to me", summary.tasks_assigned_to_user.to_string()),
    ]);

    println!();
    println!("By status:");
    for (status, count) in summary.status_counts() {
        println!("  {:<12} {:>4}", status.as_str(), count);
    }

    println!();
    println!("Open by priority:");
    for (priority, count) in summary.priority_counts() {
        println!("  {:<12} {:>4}", priority.as_str(), count);
    }
}
