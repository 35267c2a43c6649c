use clap::Parser;
use taskdesk::cli::utils::output_error;
use taskdesk::cli::{Cli, OutputFormat};
use taskdesk::error::ClientError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskdesk=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = taskdesk::cli::run(cli).await {
        match (&output_format, std::env::var("CLI_VERBOSE").as_deref()) {
            (OutputFormat::Json, _) => {
                let code = e.downcast_ref::<ClientError>().map(ClientError::error_code);
                output_error(&output_format, &e.to_string(), code)?;
            }
            (OutputFormat::Text, Ok("true") | Ok("1")) => eprintln!("Error: {e:?}"),
            (OutputFormat::Text, _) => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
