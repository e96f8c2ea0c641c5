//! LLM provider abstraction, tool registry, and the bounded agent loop.

pub mod model;
pub mod prompt;
pub mod providers;
pub mod runner;
pub mod tier;
pub mod tool_registry;

pub use {
    model::{ChatMessage, CompletionResponse, LlmProvider, ToolCall, Usage},
    runner::{AgentRunResult, run_agent_loop},
    tier::EffortTier,
    tool_registry::{AgentTool, ToolRegistry},
};
