//! Query routing, per-turn orchestration, configuration loading and bootstrap.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod router;
pub mod secret;

pub use config::Config;
pub use error::AssistantError;
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use router::{QueryRouter, Route, RouteDecision, RouteMethod};
pub use secret::Secret;
