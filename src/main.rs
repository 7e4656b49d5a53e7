use std::{net::IpAddr, path::PathBuf};

use clap::Parser;
use in_memory_idp::{
    InMemoryIdp,
    config::{ConfigError, IdpSettings},
    observability,
};

/// CLI arguments for the in-memory IdP
#[derive(Parser, Debug)]
#[command(version, about = "In-memory SAML 2.0 Identity Provider", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to a TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port to listen on and advertise in metadata
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Entity ID of the IdP
    #[arg(long, global = true)]
    entity_id: Option<String>,

    /// Address to bind
    #[arg(long, global = true)]
    host: Option<IpAddr>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the IdP until interrupted (default)
    Serve,
    /// Print the IdP metadata and exit
    Metadata,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.command {
        Some(Command::Metadata) => match build_idp(&settings).metadata() {
            Ok(metadata) => println!("{}", metadata),
            Err(e) => {
                eprintln!("Failed to serialize metadata: {}", e);
                std::process::exit(1);
            }
        },
        Some(Command::Serve) | None => run_server(&settings).await,
    }
}

fn load_settings(args: &Args) -> Result<IdpSettings, ConfigError> {
    let mut settings = match &args.config {
        Some(path) => IdpSettings::from_file(path)?,
        None => IdpSettings::default(),
    };

    if let Some(port) = args.port {
        settings.idp.port = port;
    }
    if let Some(entity_id) = &args.entity_id {
        settings.idp.entity_id = entity_id.clone();
    }
    if let Some(host) = args.host {
        settings.idp.host = host;
    }

    settings.validate()?;
    Ok(settings)
}

fn build_idp(settings: &IdpSettings) -> InMemoryIdp {
    let builder = match settings.idp_builder() {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match builder.build() {
        Ok(idp) => idp,
        Err(e) => {
            eprintln!("Failed to build IdP: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_server(settings: &IdpSettings) {
    observability::init_tracing(&settings.observability.logging)
        .expect("Failed to initialize tracing");

    let mut idp = build_idp(settings);
    if let Err(e) = idp.start().await {
        tracing::error!(error = %e, "Failed to start IdP");
        std::process::exit(1);
    }

    tracing::info!(
        metadata_url = %format!("http://localhost:{}/metadata", idp.config().port()),
        sso_url = %idp.config().sso_url(),
        "Ready for AuthnRequests"
    );

    shutdown_signal().await;
    idp.stop().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
