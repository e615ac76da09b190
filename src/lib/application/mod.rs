//! # Application Module
//!
//! Core logic of the gateway.
//!
//! ## Submodules
//!
//! - [`agent`] - Tool-calling conversation loop
//! - [`session`] - Per-request ownership of one tool server
//! - [`service`] - Runs configured agent profiles end to end
//! - [`tooling`] - MCP stdio transport and launch resolution
//! - [`trace`] - Per-requester activity trace

pub mod agent;
pub mod service;
pub mod session;
pub mod tooling;
pub mod trace;
