//! The bounded agent loop: submit the transcript, execute requested tool
//! calls, resubmit, until the model answers in plain text or the tier's
//! round budget runs out.
//!
//! The loop is deliberately bounded: the query tool runs against a billed
//! external engine and must never spin freely. An exhausted budget is not
//! an error — the loop hands back whatever text the model produced last.

use std::fmt::Write as _;

use {futures::future::join_all, tracing::{debug, info, warn}};

use crate::{
    model::{ChatMessage, LlmProvider, Usage},
    tier::EffortTier,
    tool_registry::ToolRegistry,
};

/// Result of running the agent loop.
#[derive(Debug)]
pub struct AgentRunResult {
    /// Final answer text. May be empty when the model produced none; the
    /// response sanitizer downstream guarantees the user still sees a reply.
    pub text: String,
    /// Completion rounds actually spent.
    pub rounds: usize,
    /// Total tool calls executed.
    pub tool_calls_made: usize,
    /// Sum of usage across all completion rounds.
    pub usage: Usage,
}

/// Tag that starts a base64 data URI.
const BASE64_TAG: &str = "data:";
/// Marker between MIME type and base64 payload.
const BASE64_MARKER: &str = ";base64,";
/// Minimum length of a blob payload to be worth stripping.
const BLOB_MIN_LEN: usize = 200;

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Strip base64 data-URI blobs embedded in a tool result and replace them
/// with a short placeholder. Only targets payloads ≥ 200 chars.
fn strip_base64_blobs(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(BASE64_TAG) {
        result.push_str(&rest[..start]);
        let after_tag = &rest[start + BASE64_TAG.len()..];

        if let Some(marker_pos) = after_tag.find(BASE64_MARKER) {
            let mime_part = &after_tag[..marker_pos];
            let payload_start = marker_pos + BASE64_MARKER.len();
            let payload = &after_tag[payload_start..];
            let payload_len = payload.bytes().take_while(|b| is_base64_byte(*b)).count();

            if payload_len >= BLOB_MIN_LEN {
                let total_uri_len = BASE64_TAG.len() + payload_start + payload_len;
                let _ = write!(result, "[{mime_part} data removed — {total_uri_len} bytes]");
                rest = &rest[start + total_uri_len..];
                continue;
            }
        }

        result.push_str(BASE64_TAG);
        rest = after_tag;
    }
    result.push_str(rest);
    result
}

/// Sanitize a tool result string before feeding it to the LLM: strip binary
/// blobs, then truncate to `max_bytes` at a char boundary with a marker.
#[must_use]
pub fn sanitize_tool_result(input: &str, max_bytes: usize) -> String {
    let mut result = strip_base64_blobs(input);

    if result.len() <= max_bytes {
        return result;
    }

    let original_len = result.len();
    let mut end = max_bytes;
    while end > 0 && !result.is_char_boundary(end) {
        end -= 1;
    }
    result.truncate(end);
    let _ = write!(result, "\n\n[truncated — {original_len} bytes total]");
    result
}

/// Run the agent loop.
///
/// `history` is inserted between the system prompt and the current user
/// message. The tier bounds the number of completion rounds; tool calls in
/// one round run concurrently against the registry.
pub async fn run_agent_loop(
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    system_prompt: &str,
    history: Vec<ChatMessage>,
    user_text: &str,
    tier: EffortTier,
    max_tool_result_bytes: usize,
) -> anyhow::Result<AgentRunResult> {
    let tool_schemas = tools.list_schemas();
    let max_rounds = tier.max_rounds();

    info!(
        provider = provider.name(),
        model = provider.id(),
        tier = ?tier,
        max_rounds,
        tools_count = tool_schemas.len(),
        "starting agent loop"
    );

    let mut messages: Vec<ChatMessage> = vec![ChatMessage::system(system_prompt)];
    messages.extend(history);
    messages.push(ChatMessage::user(user_text));

    let mut total_usage = Usage::default();
    let mut total_tool_calls = 0;
    let mut last_text = String::new();

    for round in 1..=max_rounds {
        debug!(round, messages_count = messages.len(), "calling LLM");

        let response = provider.complete(&messages, &tool_schemas).await?;
        total_usage.add(&response.usage);

        info!(
            round,
            has_text = response.text.is_some(),
            tool_calls_count = response.tool_calls.len(),
            "LLM response received"
        );

        let round_text = response.text.clone();
        if let Some(text) = response.text {
            if !text.trim().is_empty() {
                last_text = text;
            }
        }

        // Plain text (or an empty round) terminates the loop.
        if response.tool_calls.is_empty() {
            return Ok(AgentRunResult {
                text: last_text,
                rounds: round,
                tool_calls_made: total_tool_calls,
                usage: total_usage,
            });
        }

        // The budget is spent: there is no further round to report tool
        // results into, so executing them now would be wasted billing.
        if round == max_rounds {
            warn!(max_rounds, "round budget exhausted, returning partial answer");
            break;
        }

        messages.push(ChatMessage::assistant_with_tools(
            round_text,
            response.tool_calls.clone(),
        ));

        total_tool_calls += response.tool_calls.len();

        // Tool calls within one round are independent reads; run them
        // concurrently and append results in request order.
        let futures: Vec<_> = response
            .tool_calls
            .iter()
            .map(|tc| {
                let tool = tools.get(&tc.name);
                let args = tc.arguments.clone();
                let name = tc.name.clone();
                async move {
                    match tool {
                        Some(tool) => match tool.execute(args).await {
                            Ok(value) => serde_json::json!({ "result": value }),
                            Err(e) => {
                                // The error text becomes the tool result so
                                // the model can adapt or retry; it is never
                                // surfaced to the user directly.
                                warn!(tool = %name, error = %e, "tool execution failed");
                                serde_json::json!({ "error": e.to_string() })
                            },
                        },
                        None => serde_json::json!({ "error": format!("unknown tool: {name}") }),
                    }
                }
            })
            .collect();

        let results = join_all(futures).await;
        for (tc, result) in response.tool_calls.iter().zip(results) {
            let content = sanitize_tool_result(&result.to_string(), max_tool_result_bytes);
            messages.push(ChatMessage::tool(&tc.id, content));
        }
    }

    Ok(AgentRunResult {
        text: last_text,
        rounds: max_rounds,
        tool_calls_made: total_tool_calls,
        usage: total_usage,
    })
}
