use super::error::ServerError;
use super::routes;
use super::state::ServerState;
use crate::application::service::AgentService;
use crate::model::ModelProvider;
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn build_router<P>(service: Arc<AgentService<P>>, cors_origins: &[String]) -> Router
where
    P: ModelProvider + 'static,
{
    let state = Arc::new(ServerState::new(service));
    Router::new()
        .route(
            "/analysis-agent",
            post(routes::agent::analysis_agent_handler::<P>),
        )
        .route("/chat-agent", post(routes::agent::chat_agent_handler::<P>))
        .route(
            "/execution-agent",
            post(routes::agent::execution_agent_handler::<P>),
        )
        .route("/health", get(routes::health::health_handler))
        .route(
            "/api-doc/openapi.json",
            get(routes::health::openapi_handler),
        )
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub(super) async fn serve<P>(
    service: Arc<AgentService<P>>,
    addr: SocketAddr,
    cors_origins: &[String],
) -> Result<(), ServerError>
where
    P: ModelProvider + 'static,
{
    info!(%addr, "Binding REST server");
    let app = build_router(service, cors_origins);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "REST server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
