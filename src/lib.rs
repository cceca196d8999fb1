// Core modules
pub mod batch;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod input;
pub mod models;
pub mod provider;
pub mod strategy;

// Re-export commonly used types
pub use engine::RecommendationEngine;
pub use error::{EngineError, FetchError, StrategyError};
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
