mod docs;
mod dto;
mod error;
mod router;
mod routes;
mod state;

pub use dto::{AgentRequest, ErrorResponse, HealthResponse};
pub use error::ServerError;
pub use router::build_router;

use crate::application::service::AgentService;
use crate::model::ModelProvider;
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn serve<P>(
    service: Arc<AgentService<P>>,
    addr: SocketAddr,
    cors_origins: &[String],
) -> Result<(), ServerError>
where
    P: ModelProvider + 'static,
{
    router::serve(service, addr, cors_origins).await
}
