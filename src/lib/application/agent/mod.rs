//! # Agent Module
//!
//! The tool-calling conversation loop.
//!
//! ## Key Types
//!
//! - [`Agent`] - Drives the loop against a [`Session`](crate::application::session::Session)
//! - [`AgentOptions`] - Provider, model and loop bounds
//! - [`AgentOutcome`] - Summary plus the transcript and counters of the run
//! - [`AgentError`] - Errors that end a run
//!
//! ## Agent Loop
//!
//! 1. Send the transcript, the catalog and the system prompt to the model
//! 2. Record text blocks; on the first tool call, commit the assistant turn,
//!    run the tool and commit its result, then go back to 1
//! 3. When a response has no tool call, ask the model (without tools) for a
//!    summary of the transcript and return it

mod errors;
mod models;
mod runner;


pub use errors::{AgentError, ToolError};
pub use models::{AgentOptions, AgentOutcome};
pub use runner::Agent;
