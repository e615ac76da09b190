//! REST-only binary entry point
//!
//! Runs the agent routes without the one-shot CLI mode.

use clap::Parser;
use sf_agent_gateway::config::AppConfig;
use sf_agent_gateway::{build_service, init_tracing, server};
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "sf-agent-rest", about = "sf-agent REST API server")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// REST API bind address (overrides config if specified)
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_tracing();
    info!("Starting sf-agent REST API server");

    let config_path = args.config.as_deref().map(Path::new);
    let config = Arc::new(AppConfig::load(config_path)?);
    debug!(provider = %config.default_provider, model = %config.model, "Configuration loaded");

    let addr = match args.addr {
        Some(addr) => addr,
        None => config.bind_addr()?,
    };

    let service = Arc::new(build_service(Arc::clone(&config)));
    server::serve(service, addr, &config.rest_server.cors_origins).await?;

    Ok(())
}
