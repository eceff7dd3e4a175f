//! Model provider implementations

pub mod google;

use k2so_core::{K2soResult, Model, ModelConfig, ModelProvider};

/// Build a boxed model for the configured provider
pub fn create(config: ModelConfig) -> K2soResult<Box<dyn Model>> {
    match config.provider {
        ModelProvider::Google => google::GoogleProvider::create(config),
    }
}
