//! Tool registry: maps a tool type to the async builder that turns a spec
//! into a [`BoxTool`].
//!
//! The registry is populated once at startup through [`ToolRegistryBuilder`]
//! and is read-only afterwards. It is passed into the engine explicitly
//! (usually as `Arc<ToolRegistry>`), never reached through a global.

use std::collections::HashMap;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use agentry_types::agent::AgentConfig;
use agentry_types::error::AgentError;
use agentry_types::tool::ToolSpec;

use super::{BoxTool, ToolBuildContext};

type BuildFuture = Pin<Box<dyn Future<Output = Result<BoxTool, AgentError>> + Send>>;

/// Boxed async builder for one tool type.
pub type ToolBuilder = Box<dyn Fn(ToolSpec, ToolBuildContext) -> BuildFuture + Send + Sync>;

/// Collects builders before the registry is frozen.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    builders: HashMap<String, ToolBuilder>,
    order: Vec<String>,
}

impl ToolRegistryBuilder {
    /// Register a builder for `tool_type`. A later registration for the same
    /// type replaces the earlier one.
    pub fn register<F, Fut>(mut self, tool_type: impl Into<String>, builder: F) -> Self
    where
        F: Fn(ToolSpec, ToolBuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BoxTool, AgentError>> + Send + 'static,
    {
        let tool_type = tool_type.into();
        let boxed: ToolBuilder = Box::new(move |spec, ctx| Box::pin(builder(spec, ctx)));
        if self.builders.insert(tool_type.clone(), boxed).is_none() {
            self.order.push(tool_type);
        }
        self
    }

    pub fn build(self) -> ToolRegistry {
        tracing::debug!(tool_types = ?self.order, "tool registry initialized");
        ToolRegistry {
            builders: self.builders,
            order: self.order,
        }
    }
}

/// Read-only map from tool type to builder.
pub struct ToolRegistry {
    builders: HashMap<String, ToolBuilder>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registered tool types in registration order.
    pub fn tool_types(&self) -> &[String] {
        &self.order
    }

    /// The builder registered for `tool_type`, if any.
    pub fn get_builder(&self, tool_type: &str) -> Option<&ToolBuilder> {
        self.builders.get(tool_type)
    }

    /// Build one tool from its spec.
    ///
    /// An unregistered type is logged and yields `Ok(None)`. Builder errors
    /// (`Config`, `Credential`) are returned to the caller.
    pub async fn create_tool(
        &self,
        spec: &ToolSpec,
        ctx: &ToolBuildContext,
    ) -> Result<Option<BoxTool>, AgentError> {
        let Some(builder) = self.builders.get(&spec.tool_type) else {
            tracing::warn!(tool_type = %spec.tool_type, "unknown tool type, skipping");
            return Ok(None);
        };
        builder(spec.clone(), ctx.clone()).await.map(Some)
    }

    /// Build every tool of an agent config. v1 knowledge bases are upgraded
    /// to `vectorSearch` specs first.
    ///
    /// Tools that fail to build are logged and dropped; the rest are
    /// returned in config order. A tool whose name collides with an earlier
    /// one is dropped as well.
    pub async fn create_tools_from_config(
        &self,
        config: &AgentConfig,
        ctx: &ToolBuildContext,
    ) -> Vec<BoxTool> {
        let mut tools = Vec::new();
        let mut names = HashSet::new();

        for spec in config.tool_specs() {
            match self.create_tool(&spec, ctx).await {
                Ok(Some(tool)) => {
                    if names.insert(tool.name().to_string()) {
                        tools.push(tool);
                    } else {
                        tracing::warn!(tool = tool.name(), "duplicate tool name, skipping");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        account_id = ctx.account_id,
                        tool_type = %spec.tool_type,
                        error_kind = e.kind(),
                        error = %e,
                        "failed to build tool, skipping"
                    );
                }
            }
        }

        tracing::debug!(count = tools.len(), "tools built for run");
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use agentry_types::agent::AgentConfigData;
    use agentry_types::tool::{ToolDefinition, ToolOutput};
    use serde_json::json;

    use crate::service::credential::tests::MemoryCredentials;
    use crate::tools::Tool;

    struct Named(ToolDefinition);

    impl Tool for Named {
        fn definition(&self) -> &ToolDefinition {
            &self.0
        }

        async fn invoke(&self, _input: serde_json::Value) -> ToolOutput {
            ToolOutput::empty("nothing")
        }
    }

    async fn named_from_param(spec: ToolSpec, _ctx: ToolBuildContext) -> Result<BoxTool, AgentError> {
        let name = spec
            .params
            .get("namespace")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::Config("namespace required".to_string()))?;
        Ok(BoxTool::new(Named(ToolDefinition {
            name: format!("search_{name}"),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        })))
    }

    async fn missing_credential(_spec: ToolSpec, _ctx: ToolBuildContext) -> Result<BoxTool, AgentError> {
        Err(AgentError::Credential("Pinecone API key required".to_string()))
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::builder()
            .register("vectorSearch", named_from_param)
            .register("dbWrite", missing_credential)
            .build()
    }

    fn ctx() -> ToolBuildContext {
        ToolBuildContext {
            account_id: 1,
            credentials: std::sync::Arc::new(MemoryCredentials::default().into_service()),
            auth_token: None,
        }
    }

    fn spec(value: serde_json::Value) -> ToolSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_every_registered_type_has_a_builder() {
        let registry = registry();
        assert_eq!(registry.tool_types(), ["vectorSearch", "dbWrite"]);
        for tool_type in registry.tool_types() {
            assert!(registry.get_builder(tool_type).is_some());
        }
        assert!(registry.get_builder("webScrape").is_none());
    }

    #[tokio::test]
    async fn test_unknown_type_returns_none() {
        let tool = registry()
            .create_tool(&spec(json!({"type": "webScrape"})), &ctx())
            .await
            .unwrap();
        assert!(tool.is_none());
    }

    #[tokio::test]
    async fn test_v1_knowledge_bases_become_search_tools() {
        let config: AgentConfig = serde_json::from_value(json!({
            "schema": "agent_config",
            "version": 1,
            "data": {
                "systemPrompt": "help",
                "knowledgeBases": [
                    {"provider": "pinecone", "index": "kb", "namespace": "docs"},
                    {"provider": "pinecone", "index": "kb", "namespace": "faq"},
                    {"provider": "pinecone", "index": "kb", "namespace": "blog"}
                ]
            }
        }))
        .unwrap();

        let tools = registry().create_tools_from_config(&config, &ctx()).await;
        let names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["search_docs", "search_faq", "search_blog"]);
    }

    #[tokio::test]
    async fn test_failing_tools_are_dropped_not_fatal() {
        let config = AgentConfig {
            schema: "agent_config".to_string(),
            version: 2,
            data: AgentConfigData {
                tools: vec![
                    spec(json!({"type": "dbWrite", "table": "leads"})),
                    spec(json!({"type": "vectorSearch"})),
                    spec(json!({"type": "unknown"})),
                    spec(json!({"type": "vectorSearch", "namespace": "docs"})),
                    spec(json!({"type": "vectorSearch", "namespace": "docs"})),
                ],
                ..Default::default()
            },
        };

        let tools = registry().create_tools_from_config(&config, &ctx()).await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "search_docs");
    }
}
