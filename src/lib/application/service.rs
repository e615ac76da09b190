use super::agent::{Agent, AgentError, AgentOptions, AgentOutcome};
use super::session::{SessionParams, run_in_session};
use super::tooling::RegistryConnector;
use super::trace::TraceSink;
use crate::config::AppConfig;
use crate::domain::types::Requester;
use crate::model::ModelProvider;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

/// Runs configured agent profiles. One session per call; nothing is shared
/// between calls except the provider, the connector and the trace sink.
pub struct AgentService<P: ModelProvider> {
    provider: Arc<P>,
    connector: Arc<dyn RegistryConnector>,
    config: Arc<AppConfig>,
    trace: Arc<dyn TraceSink>,
}

impl<P: ModelProvider> AgentService<P> {
    pub fn new(
        provider: Arc<P>,
        connector: Arc<dyn RegistryConnector>,
        config: Arc<AppConfig>,
        trace: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            provider,
            connector,
            config,
            trace,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Launches the profile's tool server for `requester`, runs the loop for
    /// `query` and releases the server before returning.
    pub async fn run(
        &self,
        agent: &str,
        requester: Requester,
        query: &str,
    ) -> Result<AgentOutcome, AgentError> {
        if requester.user_id.trim().is_empty() {
            return Err(AgentError::Validation("user_id must not be empty".into()));
        }
        if query.trim().is_empty() {
            return Err(AgentError::Validation("description must not be empty".into()));
        }

        let profile = self
            .config
            .agent(agent)
            .ok_or_else(|| AgentError::UnknownAgent(agent.to_string()))?;
        let server = self
            .config
            .server(&profile.server)
            .ok_or_else(|| AgentError::UnknownAgent(agent.to_string()))?;

        let options = AgentOptions::from_profile(&self.config, profile);
        let span = info_span!("agent_run", run_id = %Uuid::new_v4(), agent);
        info!(
            parent: &span,
            agent,
            server = %server.name,
            user_id = %requester.user_id,
            ticket_id = %requester.ticket_id,
            "Dispatching agent run"
        );

        let runner = Agent::new(Arc::clone(&self.provider), options);
        let params = SessionParams {
            server,
            prompt: profile.prompt.as_deref(),
            requester,
            trace: Arc::clone(&self.trace),
        };
        let result = run_in_session(self.connector.as_ref(), params, |session| async move {
            runner.run(query, &session).await
        })
        .instrument(span.clone())
        .await;

        if let Err(err) = &result {
            error!(parent: &span, agent, %err, "Agent run failed");
        }
        result
    }
}
