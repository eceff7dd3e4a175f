//! K2SO LLM - language-model providers
//!
//! ```rust,ignore
//! use k2so_core::{Model, ModelConfig};
//!
//! let model = k2so_llm::create_model(ModelConfig::default())?;
//! let reply = model.generate("Say hi", model.default_options()).await?;
//! ```

pub mod provider;

pub use provider::create as create_model;
pub use provider::google::GoogleProvider;
