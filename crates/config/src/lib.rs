//! Configuration loading, schema, and env substitution.
//!
//! Config files: `voxbi.toml`, `voxbi.yaml`, or `voxbi.json`
//! Searched in `./` then `~/.config/voxbi/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, find_or_default_config_path, load_config},
    schema::{
        AgentConfig, AnalyticsConfig, LlmConfig, ServerConfig, SpeechConfig, SttConfig,
        StoreConfig, TtsConfig, VoxbiConfig,
    },
};
