//! The orchestrator: webhook server, tenant/dataset resolution, complexity
//! classification, the per-turn pipeline, and response sanitization.

pub mod classifier;
pub mod phrases;
pub mod sanitize;
pub mod selector;
pub mod server;
pub mod state;
pub mod turn;

pub use {
    server::{build_app, start_gateway},
    state::AppState,
};
