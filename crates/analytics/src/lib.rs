//! Analytics query engine client and the agent tool that exposes it.
//!
//! The engine speaks a two-step protocol: a client-credentials token
//! exchange, then `POST /query` calls scoped to a (connection, dataset)
//! pair. Tokens are cached until shortly before expiry and refreshed once
//! on a 401.

mod client;
mod tool;

pub use {
    client::{AnalyticsClient, AnalyticsError},
    tool::QueryDatasetTool,
};
