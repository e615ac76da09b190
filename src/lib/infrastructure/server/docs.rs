use super::dto::{AgentRequest, ErrorResponse, HealthResponse};
use super::routes;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::agent::analysis_agent_handler,
        routes::agent::chat_agent_handler,
        routes::agent::execution_agent_handler,
        routes::health::health_handler
    ),
    components(schemas(AgentRequest, ErrorResponse, HealthResponse)),
    tags(
        (name = "agent", description = "Run an MCP tool-calling agent for a requester"),
        (name = "health", description = "Liveness check")
    )
)]
pub(super) struct ApiDoc;
