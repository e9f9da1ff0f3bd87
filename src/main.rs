use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use thumbnail_studio::{config, server, ReferenceStore, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "thumbnail-studio", version, about = "AI thumbnail generation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        assets_dir: Option<PathBuf>,
    },
    /// Render the blank reference PNGs for every aspect ratio.
    RenderReferences {
        #[arg(long, env = "REFERENCE_ASSETS_DIR", default_value = "assets/references")]
        dir: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
}

#[actix_web::main]
async fn main() -> ExitCode {
    config::load_env_files();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Command::RenderReferences { dir, overwrite }) => ReferenceStore::new(dir)
            .write_all(overwrite)
            .map(|written| tracing::info!(count = written.len(), "reference images rendered")),
        Some(Command::Serve {
            host,
            port,
            assets_dir,
        }) => {
            let mut config = ServerConfig::from_env();
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if let Some(dir) = assets_dir {
                config = config.with_assets_dir(dir);
            }
            server::run(config).await
        }
        None => server::run(ServerConfig::from_env()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
