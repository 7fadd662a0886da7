//! Kernel module - dependency wiring for the answer engine.

pub mod deps;

pub use deps::{build_engine, build_provider_chain};
