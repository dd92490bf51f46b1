//! Executable capabilities ("tools") and the registry that builds them.
//!
//! A [`Tool`] is a named, schema-described action the model may request
//! during a run. Tools are built per request from declarative
//! [`ToolSpec`](agentry_types::tool::ToolSpec)s by the [`registry::ToolRegistry`].
//!
//! `Tool` uses RPITIT and so cannot be a trait object; [`BoxTool`] provides
//! type erasure through the blanket-implemented [`ToolDyn`].

pub mod registry;
pub mod retrieval;
pub mod schema;
pub mod vector_search;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use agentry_types::tool::{ToolDefinition, ToolOutput};

use crate::service::credential::CredentialService;

/// An invocable capability.
///
/// `invoke` never fails: every failure is reported as
/// [`ToolOutput::Error`] so the run can continue and the model can see it.
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    fn invoke(&self, input: serde_json::Value) -> impl Future<Output = ToolOutput> + Send;
}

/// Object-safe version of [`Tool`] with boxed futures.
pub trait ToolDyn: Send + Sync {
    fn definition_dyn(&self) -> &ToolDefinition;

    fn invoke_boxed(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send + '_>>;
}

impl<T: Tool> ToolDyn for T {
    fn definition_dyn(&self) -> &ToolDefinition {
        self.definition()
    }

    fn invoke_boxed(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send + '_>> {
        Box::pin(self.invoke(input))
    }
}

/// Type-erased tool.
pub struct BoxTool {
    inner: Box<dyn ToolDyn>,
}

impl BoxTool {
    pub fn new<T: Tool + 'static>(tool: T) -> Self {
        Self {
            inner: Box::new(tool),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.definition_dyn().name
    }

    pub fn definition(&self) -> &ToolDefinition {
        self.inner.definition_dyn()
    }

    pub async fn invoke(&self, input: serde_json::Value) -> ToolOutput {
        self.inner.invoke_boxed(input).await
    }
}

impl std::fmt::Debug for BoxTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTool").field("name", &self.name()).finish()
    }
}

/// Per-request inputs available to every tool builder.
#[derive(Clone)]
pub struct ToolBuildContext {
    pub account_id: i64,
    pub credentials: Arc<CredentialService>,
    /// Caller's bearer token, forwarded to the embedding and rerank services.
    pub auth_token: Option<String>,
}
