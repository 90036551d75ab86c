//! HTTP gateway: document upload, question answering and health endpoints with bearer auth.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use router::build_router;
pub use server::{AppState, GatewayServer};
