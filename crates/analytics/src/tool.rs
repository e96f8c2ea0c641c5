//! The single tool the agent may call: execute one analytical query.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait, tracing::info};

use {
    voxbi_agents::tool_registry::AgentTool,
    voxbi_common::types::DatasetRef,
};

use crate::client::AnalyticsClient;

/// Agent tool that runs a free-text analytical query against the resolved
/// (connection, dataset) scope. The scope is fixed at construction; the
/// model only ever supplies the query text.
pub struct QueryDatasetTool {
    client: Arc<AnalyticsClient>,
    scope: DatasetRef,
}

impl QueryDatasetTool {
    #[must_use]
    pub fn new(client: Arc<AnalyticsClient>, scope: DatasetRef) -> Self {
        Self { client, scope }
    }
}

#[async_trait]
impl AgentTool for QueryDatasetTool {
    fn name(&self) -> &str {
        "query_dataset"
    }

    fn description(&self) -> &str {
        "Executa uma consulta analítica sobre o conjunto de dados da conversa \
         e retorna as linhas de resultado. Descreva em texto livre a métrica, \
         as dimensões e o período desejados."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Consulta analítica em texto livre."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let query = params["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing query parameter"))?;

        info!(dataset = %self.scope.dataset_name, "executing analytical query");

        let rows = self
            .client
            .execute_query(&self.scope.connection_id, &self.scope.dataset_id, query)
            .await?;

        Ok(serde_json::json!({
            "rows": rows,
            "row_count": rows.len(),
        }))
    }
}
