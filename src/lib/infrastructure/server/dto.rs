use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body accepted by every agent route.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AgentRequest {
    /// Salesforce user the run acts for
    pub user_id: String,
    /// Free-text query for the agent
    pub description: String,
    pub ticket_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
