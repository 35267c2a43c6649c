use std::time::Duration;

use clap::Subcommand;
use serde_json::json;

use crate::auth::guard::{visible_routes, Route};
use crate::auth::session::SessionState;
use crate::cli::config::resolve_client_config;
use crate::cli::context::CliContext;
use crate::cli::utils::{output_json, output_success, print_fields, prompt_if_missing};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from server")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Keep the session alive by refreshing in the background until interrupted")]
    Keepalive {
        #[arg(long, help = "Refresh interval in seconds (defaults to the configured interval)")]
        interval: Option<u64>,
    },
}

pub async fn handle(cmd: AuthCommands, api_root: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password } => {
            let password = prompt_if_missing(password, "Password")?;
            let ctx = CliContext::connect(api_root, output_format).await?;

            ctx.session.login(&username, &password).await?;
            let state = ctx.session.snapshot().await;

            output_success(
                &ctx.output_format,
                &format!("Logged in as '{}'", username),
                Some(status_json(&ctx, &state)),
            )
        }
        AuthCommands::Logout => {
            let ctx = CliContext::connect(api_root, output_format).await?;
            ctx.session.logout().await?;
            output_success(&ctx.output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let ctx = CliContext::connect(api_root, output_format).await?;
            let state = ctx.session.snapshot().await;

            match ctx.output_format {
                OutputFormat::Json => output_json(&status_json(&ctx, &state)),
                OutputFormat::Text => {
                    print_status(&ctx, &state);
                    Ok(())
                }
            }
        }
        AuthCommands::Refresh => {
            let ctx = CliContext::connect(api_root, output_format).await?;
            ctx.require(Route::Dashboard).await?;

            let pair = ctx.session.refresh().await?;
            let expires = pair.access_expires_at().map(|t| t.to_rfc3339());

            output_success(
                &ctx.output_format,
                "Access token refreshed",
                Some(json!({ "access_expires_at": expires })),
            )
        }
        AuthCommands::Whoami => {
            let ctx = CliContext::connect(api_root, output_format).await?;
            let state = ctx.require(Route::Dashboard).await?;
            let profile = state
                .user_info
                .ok_or_else(|| anyhow::anyhow!("User information is not available for this session"))?;

            match ctx.output_format {
                OutputFormat::Json => output_json(&profile),
                OutputFormat::Text => {
                    print_fields(&[
                        ("User", format!("{} (#{})", profile.username, profile.id)),
                        ("Name", profile.display_name()),
                        ("Email", profile.email.clone()),
                        ("Staff", profile.is_staff.to_string()),
                        ("Superuser", profile.is_superuser.to_string()),
                        ("Groups", profile.groups.join(", ")),
                        ("Permissions", profile.permissions.join(", ")),
                    ]);
                    Ok(())
                }
            }
        }
        AuthCommands::Keepalive { interval } => {
            let mut config = resolve_client_config(api_root)?;
            if let Some(secs) = interval {
                config = config.with_refresh_interval(Duration::from_secs(secs.max(1)));
            }
            let ctx = CliContext::from_config(config, output_format).await?;
            ctx.require(Route::Dashboard).await?;

            keepalive(&ctx).await
        }
    }
}

async fn keepalive(ctx: &CliContext) -> anyhow::Result<()> {
    let refresher = ctx.session.start_refresh_loop();
    eprintln!(
        "Refreshing every {}s, press Ctrl-C to stop",
        ctx.session.refresh_interval().as_secs()
    );

    let ended = async {
        let mut poll = tokio::time::interval(Duration::from_secs(5));
        loop {
            poll.tick().await;
            if !ctx.session.snapshot().await.has_access_token() {
                break;
            }
        }
    };

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            Ok("Stopped background refresh")
        }
        _ = ended => Err(anyhow::anyhow!("Session ended, background refresh stopped")),
    };
    refresher.stop();

    output_success(&ctx.output_format, outcome?, None)
}

fn status_json(ctx: &CliContext, state: &SessionState) -> serde_json::Value {
    let expires = state
        .tokens
        .as_ref()
        .and_then(|pair| pair.access_expires_at())
        .map(|t| t.to_rfc3339());
    let navigation: Vec<&str> = if state.has_access_token() {
        visible_routes(&state.permissions)
            .into_iter()
            .map(|route| route.path())
            .collect()
    } else {
        Vec::new()
    };

    json!({
        "authenticated": state.has_access_token(),
        "api_root": ctx.config.api.api_root,
        "username": state.user_info.as_ref().map(|p| p.username.clone()),
        "access_expires_at": expires,
        "permissions": state.permissions,
        "navigation": navigation,
    })
}

fn print_status(ctx: &CliContext, state: &SessionState) {
    if !state.has_access_token() {
        print_fields(&[
            ("Server", ctx.config.api.api_root.clone()),
            ("Status", "not logged in".to_string()),
        ]);
        return;
    }

    let expires = match state.tokens.as_ref().and_then(|pair| pair.access_expires_at()) {
        Some(at) => {
            let remaining = at - chrono::Utc::now();
            if remaining.num_seconds() > 0 {
                format!("{} (in {}s)", at.to_rfc3339(), remaining.num_seconds())
            } else {
                format!("{} (expired)", at.to_rfc3339())
            }
        }
        None => "unknown".to_string(),
    };
    let navigation: Vec<&str> = visible_routes(&state.permissions)
        .into_iter()
        .map(|route| route.title())
        .collect();

    print_fields(&[
        ("Server", ctx.config.api.api_root.clone()),
        ("Status", "logged in".to_string()),
        (
            "User",
            state
                .user_info
                .as_ref()
                .map(|p| p.username.clone())
                .unwrap_or_else(|| "(profile unavailable)".to_string()),
        ),
        ("Access expires", expires),
        ("Permissions", state.permissions.len().to_string()),
        ("Navigation", navigation.join(", ")),
    ]);
}
