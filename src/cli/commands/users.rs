use clap::Subcommand;
use serde_json::json;

use crate::api::report;
use crate::api::users::{self, NewUser, UserSummary, UserUpdate};
use crate::auth::guard::Route;
use crate::auth::permissions::Capability;
use crate::cli::context::CliContext;
use crate::cli::utils::{output_empty_collection, output_json, output_success, prompt_if_missing, truncate};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List users")]
    List,

    #[command(about = "Register a new user")]
    Create {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, default_value = "", help = "First name")]
        first_name: String,
        #[arg(long, default_value = "", help = "Last name")]
        last_name: String,
        #[arg(long, help = "Grant staff status")]
        staff: bool,
        #[arg(long, help = "Grant superuser status")]
        superuser: bool,
    },

    #[command(about = "Update a user's profile")]
    Update {
        #[arg(help = "User id")]
        id: i64,
        #[arg(long, help = "New email")]
        email: Option<String>,
        #[arg(long, help = "New first name")]
        first_name: Option<String>,
        #[arg(long, help = "New last name")]
        last_name: Option<String>,
    },

    #[command(about = "Delete a user")]
    Delete {
        #[arg(help = "User id")]
        id: i64,
    },
}

pub async fn handle(cmd: UserCommands, api_root: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::List => {
            let ctx = CliContext::connect(api_root, output_format).await?;
            ctx.require(Route::Config).await?;

            let found = report(
                ctx.notifier(),
                users::list_users(ctx.client()).await,
                None,
                "Failed to load users.",
            )?;

            if found.is_empty() {
                return output_empty_collection(&ctx.output_format, "users", "No users found");
            }
            match ctx.output_format {
                OutputFormat::Json => output_json(&json!({ "users": found })),
                OutputFormat::Text => {
                    print_user_table(&found);
                    Ok(())
                }
            }
        }
        UserCommands::Create { username, email, password, first_name, last_name, staff, superuser } => {
            let password = prompt_if_missing(password, "Password")?;
            let ctx = CliContext::connect(api_root, output_format).await?;
            ctx.require_capability(Route::Config, Capability::CreateUser).await?;

            let user = NewUser {
                username,
                email,
                password,
                first_name,
                last_name,
                is_staff: staff,
                is_superuser: superuser,
            };
            let created = report(
                ctx.notifier(),
                users::create_user(ctx.client(), &user).await,
                Some("User created successfully."),
                "Failed to create user.",
            )?;

            output_success(
                &ctx.output_format,
                &format!("Created user '{}' (#{})", created.username, created.id),
                Some(json!({ "user": created })),
            )
        }
        UserCommands::Update { id, email, first_name, last_name } => {
            let update = UserUpdate { email, first_name, last_name };
            if update.is_empty() {
                return Err(anyhow::anyhow!("Nothing to update: pass --email, --first-name or --last-name"));
            }

            let ctx = CliContext::connect(api_root, output_format).await?;
            ctx.require_capability(Route::Config, Capability::EditUser).await?;

            let message = report(
                ctx.notifier(),
                users::update_user(ctx.client(), id, &update).await,
                None,
                "Failed to update user.",
            )?;

            output_success(&ctx.output_format, &message, Some(json!({ "id": id })))
        }
        UserCommands::Delete { id } => {
            let ctx = CliContext::connect(api_root, output_format).await?;
            ctx.require_capability(Route::Config, Capability::DeleteUser).await?;

            let message = report(
                ctx.notifier(),
                users::delete_user(ctx.client(), id).await,
                None,
                "Failed to delete user.",
            )?;

            output_success(&ctx.output_format, &message, Some(json!({ "id": id })))
        }
    }
}

fn print_user_table(found: &[UserSummary]) {
    println!("{:>5}  {:<20}  {:<28}  {:<24}  {}", "ID", "USERNAME", "EMAIL", "NAME", "ROLE");
    for user in found {
        let name = format!("{} {}", user.first_name, user.last_name);
        let role = match (user.is_superuser, user.is_staff) {
            (true, _) => "superuser",
            (false, true) => "staff",
            (false, false) => "user",
        };
        println!(
            "{:>5}  {:<20}  {:<28}  {:<24}  {}",
            user.id,
            truncate(&user.username, 20),
            truncate(&user.email, 28),
            truncate(name.trim(), 24),
            role,
        );
    }
}
