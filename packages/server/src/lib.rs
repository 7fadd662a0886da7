// Tattva - API Core
//
// HTTP surface for the grounded question-answering engine: configuration,
// dependency wiring and the axum router.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
