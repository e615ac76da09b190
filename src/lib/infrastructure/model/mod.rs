//! Model infrastructure module
//!
//! Provides LLM model providers with factory pattern for easy extensibility.
//!
//! # Structure
//! - `types` - Request, Response, Error types
//! - `traits` - ModelProvider, ModelClient traits
//! - `retry` - Bounded exponential backoff for provider calls
//! - `factory` - Provider factory for creating clients
//! - `clients` - Anthropic and OpenAI-compatible clients
//! - `provider` - DynamicModelProvider for routing

pub mod clients;
pub mod factory;
pub mod provider;
pub mod retry;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use provider::DynamicModelProvider;
pub use traits::{ModelClient, ModelProvider};
pub use types::{ModelError, ModelRequest, ModelResponse, StopReason};
