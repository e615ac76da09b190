use super::super::dto::{AgentRequest, ErrorResponse};
use super::super::state::ServerState;
use crate::agent::AgentError;
use crate::constants::{ANALYSIS_AGENT, EXECUTION_AGENT};
use crate::domain::types::Requester;
use crate::model::ModelProvider;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{error, info};

type ApiError = (StatusCode, Json<ErrorResponse>);

#[utoipa::path(
    post,
    path = "/analysis-agent",
    tag = "agent",
    request_body = AgentRequest,
    responses(
        (status = 200, description = "Summary produced by the analysis agent", body = String),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Agent profile not configured", body = ErrorResponse),
        (status = 502, description = "Tool server or model gateway unreachable", body = ErrorResponse),
        (status = 504, description = "Agent exceeded its turn limit or deadline", body = ErrorResponse)
    )
)]
pub async fn analysis_agent_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<String>, ApiError> {
    dispatch(&state, "/analysis-agent", ANALYSIS_AGENT, payload).await
}

/// Same agent as `/analysis-agent`, kept for chat-style clients.
#[utoipa::path(
    post,
    path = "/chat-agent",
    tag = "agent",
    request_body = AgentRequest,
    responses(
        (status = 200, description = "Summary produced by the analysis agent", body = String),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Agent profile not configured", body = ErrorResponse),
        (status = 502, description = "Tool server or model gateway unreachable", body = ErrorResponse),
        (status = 504, description = "Agent exceeded its turn limit or deadline", body = ErrorResponse)
    )
)]
pub async fn chat_agent_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<String>, ApiError> {
    dispatch(&state, "/chat-agent", ANALYSIS_AGENT, payload).await
}

#[utoipa::path(
    post,
    path = "/execution-agent",
    tag = "agent",
    request_body = AgentRequest,
    responses(
        (status = 200, description = "Summary produced by the execution agent", body = String),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Agent profile not configured", body = ErrorResponse),
        (status = 502, description = "Tool server or model gateway unreachable", body = ErrorResponse),
        (status = 504, description = "Agent exceeded its turn limit or deadline", body = ErrorResponse)
    )
)]
pub async fn execution_agent_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<String>, ApiError> {
    dispatch(&state, "/execution-agent", EXECUTION_AGENT, payload).await
}

async fn dispatch<P: ModelProvider>(
    state: &ServerState<P>,
    route: &str,
    agent: &str,
    payload: AgentRequest,
) -> Result<Json<String>, ApiError> {
    let AgentRequest {
        user_id,
        description,
        ticket_id,
    } = payload;
    info!(
        route,
        agent,
        user_id = %user_id,
        ticket_id = %ticket_id,
        "Received agent request"
    );

    let requester = Requester::new(user_id, ticket_id);
    match state.service().run(agent, requester, &description).await {
        Ok(outcome) => {
            info!(
                route,
                model_calls = outcome.model_calls,
                tool_calls = outcome.tool_calls,
                "Agent request completed"
            );
            Ok(Json(outcome.summary))
        }
        Err(err) => {
            let status = status_for(&err);
            error!(route, %err, status = status.as_u16(), "Agent request failed");
            Err((
                status,
                Json(ErrorResponse {
                    error: err.user_message(),
                }),
            ))
        }
    }
}

fn status_for(err: &AgentError) -> StatusCode {
    match err {
        AgentError::Validation(_) => StatusCode::BAD_REQUEST,
        AgentError::UnknownAgent(_) => StatusCode::NOT_FOUND,
        AgentError::Connection(_) | AgentError::Gateway(_) => StatusCode::BAD_GATEWAY,
        AgentError::TurnLimitExceeded { .. } | AgentError::DeadlineExceeded { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
    }
}
