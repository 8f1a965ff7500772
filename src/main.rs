use anyhow::{Context, Result};
use clap::Parser;
use disco::{
    auth::default_chain,
    cli::{Cli, Commands, RunCommands},
    config::Config,
    gcp::GcpClient,
    scanner::Scanner,
    service::{DiscoService, ImagesQuery, VulnsQuery},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr, RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { command } => {
            let config = Config::load(cli.config.as_deref())?;
            info!("disco {}", env!("CARGO_PKG_VERSION"));

            let client = GcpClient::new(config.endpoints.clone(), &default_chain())?;
            let scanner = Scanner::new(&config.scanner);
            let service =
                DiscoService::new(Box::new(client), scanner).with_run_api(config.run_api.clone());

            let default_project = config.default_project.as_deref();
            let default_format = config.default_format.as_deref();

            match command {
                RunCommands::Images { common, digest } => {
                    let query = ImagesQuery::from_args(
                        common.to_query(default_project, default_format),
                        digest,
                    );
                    service
                        .discover_images(Some(&query))
                        .await
                        .context("error discovering images")?;
                }
                RunCommands::Vulnerabilities { common, cve, ca } => {
                    if ca {
                        info!("Note: Container Analysis scans currently are limited to base OS only");
                    }
                    let query = VulnsQuery::from_args(
                        common.to_query(default_project, default_format),
                        cve,
                        ca,
                    );
                    service
                        .discover_vulns(Some(&query))
                        .await
                        .context("error executing command")?;
                }
                RunCommands::Licenses { common } => {
                    let query = common.to_query(default_project, default_format);
                    service
                        .discover_licenses(Some(&query))
                        .await
                        .context("error discovering licenses")?;
                }
            }
        }
        Commands::Version => {
            println!("disco {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
