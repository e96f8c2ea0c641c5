//! Anthropic Messages API provider.

use {
    async_trait::async_trait,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use crate::model::{ChatMessage, CompletionResponse, LlmProvider, ToolCall, Usage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    client: Client,
    api_key: Secret<String>,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: Secret<String>, base_url: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model,
        }
    }
}

/// Split the transcript into Anthropic's (system, messages) shape.
///
/// Tool results become `tool_result` content blocks on a user message;
/// assistant tool calls become `tool_use` blocks.
fn to_anthropic_messages(
    messages: &[ChatMessage],
) -> (Option<String>, Vec<serde_json::Value>) {
    let mut system_text: Option<String> = None;
    let mut out: Vec<serde_json::Value> = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg {
            ChatMessage::System { content } => match system_text {
                Some(ref mut sys) => {
                    sys.push_str("\n\n");
                    sys.push_str(content);
                },
                None => system_text = Some(content.clone()),
            },
            ChatMessage::User { content } => {
                out.push(serde_json::json!({ "role": "user", "content": content }));
            },
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut blocks: Vec<serde_json::Value> = Vec::new();
                if let Some(text) = content {
                    if !text.is_empty() {
                        blocks.push(serde_json::json!({ "type": "text", "text": text }));
                    }
                }
                for tc in tool_calls {
                    blocks.push(serde_json::json!({
                        "type": "tool_use",
                        "id": tc.id,
                        "name": tc.name,
                        "input": tc.arguments,
                    }));
                }
                out.push(serde_json::json!({ "role": "assistant", "content": blocks }));
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => {
                out.push(serde_json::json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": tool_call_id,
                        "content": content,
                    }],
                }));
            },
        }
    }

    (system_text, out)
}

/// Convert registry schemas (`name`/`description`/`parameters`) to
/// Anthropic's `input_schema` shape.
fn to_anthropic_tools(tools: &[serde_json::Value]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t["name"],
                "description": t["description"],
                "input_schema": t["parameters"],
            })
        })
        .collect()
}

fn parse_tool_calls(content: &[serde_json::Value]) -> Vec<ToolCall> {
    content
        .iter()
        .filter(|b| b["type"].as_str() == Some("tool_use"))
        .filter_map(|b| {
            Some(ToolCall {
                id: b["id"].as_str()?.to_string(),
                name: b["name"].as_str()?.to_string(),
                arguments: b["input"].clone(),
            })
        })
        .collect()
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<CompletionResponse> {
        let (system_text, anthropic_messages) = to_anthropic_messages(messages);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": anthropic_messages,
        });

        if let Some(ref sys) = system_text {
            body["system"] = serde_json::Value::String(sys.clone());
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(to_anthropic_tools(tools));
        }

        debug!(
            model = %self.model,
            messages_count = anthropic_messages.len(),
            tools_count = tools.len(),
            "anthropic complete request"
        );

        let http_resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "anthropic API error");
            anyhow::bail!("Anthropic API error HTTP {status}: {body_text}");
        }

        let resp = http_resp.json::<serde_json::Value>().await?;

        let content = resp["content"].as_array().cloned().unwrap_or_default();

        let text = content
            .iter()
            .filter_map(|b| {
                if b["type"].as_str() == Some("text") {
                    b["text"].as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .reduce(|a, b| a + &b);

        let tool_calls = parse_tool_calls(&content);

        let usage = Usage {
            input_tokens: resp["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(CompletionResponse {
            text,
            tool_calls,
            usage,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    #[test]
    fn system_messages_are_extracted() {
        let messages = [
            ChatMessage::system("regras"),
            ChatMessage::user("pergunta"),
        ];
        let (system, out) = to_anthropic_messages(&messages);
        assert_eq!(system.as_deref(), Some("regras"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["role"], "user");
    }

    #[test]
    fn tool_results_become_user_blocks() {
        let messages = [ChatMessage::tool("call_1", "{\"rows\":[]}")];
        let (_, out) = to_anthropic_messages(&messages);
        assert_eq!(out[0]["role"], "user");
        assert_eq!(out[0]["content"][0]["type"], "tool_result");
        assert_eq!(out[0]["content"][0]["tool_use_id"], "call_1");
    }

    #[tokio::test]
    async fn complete_parses_tool_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    { "type": "text", "text": "Vou consultar." },
                    {
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "query_dataset",
                        "input": { "query": "total de vendas em 2025" }
                    }
                ],
                "usage": { "input_tokens": 120, "output_tokens": 30 }
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(
            Secret::new("key".into()),
            Some(server.uri()),
            "claude-sonnet-4-20250514".into(),
        );
        let resp = provider
            .complete(&[ChatMessage::user("total?")], &[])
            .await
            .unwrap();
        assert_eq!(resp.text.as_deref(), Some("Vou consultar."));
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "query_dataset");
        assert_eq!(resp.usage.input_tokens, 120);
    }

    #[tokio::test]
    async fn complete_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(
            Secret::new("key".into()),
            Some(server.uri()),
            "claude-sonnet-4-20250514".into(),
        );
        let err = provider
            .complete(&[ChatMessage::user("oi")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
