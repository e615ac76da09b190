pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, session, tooling, trace};
pub use cli::{Cli, RunMode};
pub use config::{AppConfig, ModelProviderConfig};
pub use domain::types;
pub use infrastructure::{model, server};

use application::service::AgentService;
use application::tooling::StdioConnector;
use application::trace::{FileTraceSink, TraceDirectory};
use domain::types::Requester;
use infrastructure::model::DynamicModelProvider;
use serde_json::json;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting sf-agent");
    debug!(mode = ?cli.mode, config = ?cli.config, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let config = Arc::new(AppConfig::load(config_path)?);
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration from default path");
    }

    let service = Arc::new(build_service(Arc::clone(&config)));

    match cli.mode {
        RunMode::Rest => {
            let addr = match cli.rest_addr {
                Some(addr) => addr,
                None => config.bind_addr()?,
            };
            info!(%addr, "Starting REST server");
            server::serve(service, addr, &config.rest_server.cors_origins).await?;
        }
        RunMode::Cli => {
            let prompt = cli::load_prompt(&cli)?;
            info!(agent = %cli.agent, "Running single agent query");
            let requester = Requester::new(cli.user_id.clone(), cli.ticket_id.clone());
            let outcome = service.run(&cli.agent, requester, &prompt).await?;
            let output = json!({
                "summary": outcome.summary,
                "model_calls": outcome.model_calls,
                "tool_calls": outcome.tool_calls,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    info!("sf-agent finished");
    Ok(())
}

/// Wires the configured providers, the stdio connector and the file trace
/// sink into an [`AgentService`].
pub fn build_service(config: Arc<AppConfig>) -> AgentService<DynamicModelProvider> {
    debug!(
        providers = config.providers.len(),
        agents = config.agents.len(),
        "Initializing agent service"
    );
    let provider = Arc::new(DynamicModelProvider::from_configs(&config.providers));
    let trace = Arc::new(FileTraceSink::new(TraceDirectory::new(
        config.trace.directory.clone(),
    )));
    AgentService::new(provider, Arc::new(StdioConnector), config, trace)
}

pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
