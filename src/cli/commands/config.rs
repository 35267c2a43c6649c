use clap::Subcommand;
use serde_json::json;
use url::Url;

use crate::cli::config::{get_config_dir, load_settings, resolve_client_config, save_settings, storage_path};
use crate::cli::utils::{output_json, output_success, print_fields};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the effective client configuration")]
    Show,

    #[command(about = "Persist the API root used by later commands")]
    SetServer {
        #[arg(help = "API root URL, e.g. http://localhost:8000/api/")]
        url: String,
    },
}

pub async fn handle(cmd: ConfigCommands, api_root: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = resolve_client_config(api_root)?;
            let config_dir = get_config_dir()?;
            let storage = storage_path()?;

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "config": config,
                    "config_dir": config_dir,
                    "storage_file": storage,
                })),
                OutputFormat::Text => {
                    print_fields(&[
                        ("Environment", format!("{:?}", config.environment)),
                        ("API root", config.api.api_root.clone()),
                        ("Request timeout", format!("{}s", config.api.request_timeout_secs)),
                        ("Refresh interval", format!("{}s", config.refresh_interval().as_secs())),
                        ("CSRF cookie", config.api.csrf_cookie_name.clone()),
                        ("Config dir", config_dir.display().to_string()),
                        ("Token storage", storage.display().to_string()),
                    ]);
                    Ok(())
                }
            }
        }
        ConfigCommands::SetServer { url } => {
            let parsed = Url::parse(url.trim()).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow::anyhow!("Unsupported scheme '{}', expected http or https", parsed.scheme()));
            }

            let mut settings = load_settings()?;
            settings.set_api_root(parsed.as_str());
            save_settings(&settings)?;

            if std::env::var("TASKDESK_API_ROOT").is_ok() {
                tracing::warn!("TASKDESK_API_ROOT is set and takes precedence over the saved server");
            }

            output_success(
                &output_format,
                &format!("API root set to {}", parsed),
                Some(json!({ "api_root": parsed.as_str() })),
            )
        }
    }
}
