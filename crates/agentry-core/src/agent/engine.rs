//! Orchestration engine.
//!
//! `CompletionEngine` assembles one run: it checks access, loads the agent,
//! resolves the model and tools, provisions the session, seeds the history
//! and then drives the executor. Every internal event goes through the
//! state machine; the engine applies the resulting persistence effects and
//! forwards the external records to the caller.
//!
//! Failures before the executor starts produce a single `error` record and
//! persist nothing.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::info_span;
use uuid::Uuid;

use agentry_types::chat::{ChatMessage, ChatRole, StoredMessage};
use agentry_types::config::AppConfig;
use agentry_types::error::AgentError;
use agentry_types::event::StreamRecord;
use agentry_types::llm::Message;

use super::executor::Executor;
use super::state::{Effect, RunState, transition};
use super::template::{TemplateContext, resolve_template_variables};
use crate::chat::repository::ChatRepository;
use crate::llm::factory::{ModelFactory, ResolvedModel};
use crate::repository::agent::{AccessRepository, AgentRepository};
use crate::service::credential::CredentialService;
use crate::tools::ToolBuildContext;
use crate::tools::registry::ToolRegistry;

/// Stream of external records for one completion.
pub type RecordStream = Pin<Box<dyn Stream<Item = StreamRecord> + Send>>;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub max_iterations: u32,
    pub max_tokens: u32,
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// One inbound completion request.
#[derive(Debug, Clone)]
pub struct CompletionInput {
    pub account_id: i64,
    pub agent_id: i64,
    /// External session id; must be a UUID.
    pub session_id: String,
    pub prompt: String,
    pub auth_token: Option<String>,
}

/// A run that passed every pre-stream check.
struct PreparedRun {
    session_id: i64,
    model: ResolvedModel,
    executor: Executor,
    history: Vec<Message>,
}

pub struct CompletionEngine<R, C, M> {
    agents: Arc<R>,
    chat: Arc<C>,
    models: Arc<M>,
    tools: Arc<ToolRegistry>,
    credentials: Arc<CredentialService>,
    settings: EngineSettings,
}

impl<R, C, M> Clone for CompletionEngine<R, C, M> {
    fn clone(&self) -> Self {
        Self {
            agents: Arc::clone(&self.agents),
            chat: Arc::clone(&self.chat),
            models: Arc::clone(&self.models),
            tools: Arc::clone(&self.tools),
            credentials: Arc::clone(&self.credentials),
            settings: self.settings,
        }
    }
}

impl<R, C, M> CompletionEngine<R, C, M>
where
    R: AgentRepository + AccessRepository + 'static,
    C: ChatRepository + 'static,
    M: ModelFactory + 'static,
{
    pub fn new(
        agents: Arc<R>,
        chat: Arc<C>,
        models: Arc<M>,
        tools: Arc<ToolRegistry>,
        credentials: Arc<CredentialService>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            agents,
            chat,
            models,
            tools,
            credentials,
            settings,
        }
    }

    /// Stream one completion as external records.
    ///
    /// The stream always ends with exactly one terminal record
    /// (`on_chain_end` or `error`). Dropping it abandons the run.
    pub fn stream_completion(&self, input: CompletionInput) -> RecordStream {
        let span = info_span!(
            "agent.run",
            agent.id = input.agent_id,
            account.id = input.account_id,
            gen_ai.system = tracing::field::Empty,
            gen_ai.request.model = tracing::field::Empty,
        );
        let engine = self.clone();

        let records = async_stream::stream! {
            let prepared = match engine.prepare(&input).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::warn!(error_kind = e.kind(), error = %e, "completion rejected");
                    yield StreamRecord::error(e.kind(), e.message());
                    return;
                }
            };

            let run_span = tracing::Span::current();
            run_span.record("gen_ai.system", prepared.model.kind.as_str());
            run_span.record("gen_ai.request.model", prepared.model.model.as_str());

            let session_id = prepared.session_id;
            let mut events = prepared.executor.run(prepared.history, input.prompt.clone());
            let mut state = RunState::default();

            while let Some(event) = events.next().await {
                let (next, out) = transition(state, event);
                state = next;

                for effect in out.effects {
                    if let Err(e) = engine.apply(session_id, &input.prompt, effect).await {
                        tracing::error!(error = %e, "failed to persist chat message");
                        yield StreamRecord::error(e.kind(), e.message());
                        return;
                    }
                }
                for record in out.records {
                    yield record;
                }
                if state.is_terminal() {
                    tracing::info!(
                        model_turns = state.model_turns,
                        tool_calls = state.tool_calls.len(),
                        "agent run finished"
                    );
                    return;
                }
            }

            tracing::warn!("executor stopped without a terminal event");
            yield StreamRecord::error(
                "external_service_error",
                "Agent run ended unexpectedly",
            );
        };

        Box::pin(StreamInSpan {
            inner: Box::pin(records),
            span,
        })
    }

    async fn prepare(&self, input: &CompletionInput) -> Result<PreparedRun, AgentError> {
        let session_uuid = Uuid::parse_str(&input.session_id)
            .map_err(|_| AgentError::Validation(format!("Invalid session id: {}", input.session_id)))?;
        if input.prompt.trim().is_empty() {
            return Err(AgentError::Validation("Prompt must not be empty".to_string()));
        }

        if !self.agents.can_access(input.account_id, input.agent_id).await? {
            return Err(AgentError::AgentNotFound);
        }
        let agent = self
            .agents
            .get_agent(input.agent_id)
            .await?
            .ok_or(AgentError::AgentNotFound)?;

        let model = self
            .models
            .resolve(&agent.config.model_spec(), input.account_id, &self.credentials)
            .await?;

        let ctx = ToolBuildContext {
            account_id: input.account_id,
            credentials: Arc::clone(&self.credentials),
            auth_token: input.auth_token.clone(),
        };
        let tools = self.tools.create_tools_from_config(&agent.config, &ctx).await;

        let session = match self.chat.get_session(input.account_id, &session_uuid).await? {
            Some(session) => session,
            None => {
                tracing::info!(session_id = %session_uuid, "creating chat session");
                self.chat
                    .create_session(
                        input.account_id,
                        Some(input.agent_id),
                        &session_uuid,
                        &format!("Chat with Agent {}", input.agent_id),
                    )
                    .await?
            }
        };

        let history = self
            .chat
            .list_messages(session.id)
            .await?
            .into_iter()
            .map(to_llm_message)
            .collect();

        tracing::debug!(
            provider = model.kind.as_str(),
            model = %model.model,
            tools = tools.len(),
            "agent run prepared"
        );

        Ok(PreparedRun {
            session_id: session.id,
            executor: Executor {
                provider: Arc::clone(&model.provider),
                model: model.model.clone(),
                system_prompt: resolve_template_variables(
                    agent.config.system_prompt(),
                    &TemplateContext::now(&agent.name),
                ),
                tools,
                max_iterations: self.settings.max_iterations,
                max_tokens: self.settings.max_tokens,
            },
            model,
            history,
        })
    }

    async fn apply(&self, session_id: i64, prompt: &str, effect: Effect) -> Result<(), AgentError> {
        let message = match effect {
            Effect::PersistHuman => StoredMessage::human(prompt),
            Effect::PersistAi {
                content,
                tool_calls,
            } => StoredMessage::ai(content, tool_calls),
        };
        self.chat.append_message(session_id, &message).await?;
        Ok(())
    }
}

fn to_llm_message(message: ChatMessage) -> Message {
    match message.message.role {
        ChatRole::Human => Message::user(message.message.content),
        ChatRole::Ai => Message::assistant(message.message.content),
    }
}

/// Keeps `span` entered while the inner stream is polled, so every log line
/// of the run carries the run's fields.
struct StreamInSpan {
    inner: RecordStream,
    span: tracing::Span,
}

impl Stream for StreamInSpan {
    type Item = StreamRecord;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use agentry_types::chat::ChatRole;
    use agentry_types::event::EventKind;
    use agentry_types::llm::LlmError;
    use agentry_types::tool::{ToolDefinition, ToolOutput, ToolSpec};
    use serde_json::json;

    use crate::service::credential::tests::MemoryCredentials;
    use crate::testing::{
        FixedModels, MemoryAgents, MemoryChat, ScriptedProvider, text_turn, tool_turn,
    };
    use crate::tools::{BoxTool, Tool};

    const SESSION: &str = "6f1c1c9e-8a4b-4c1e-9d52-3f0f8f2d6a10";

    struct DocsSearch(ToolDefinition);

    impl Tool for DocsSearch {
        fn definition(&self) -> &ToolDefinition {
            &self.0
        }

        async fn invoke(&self, input: serde_json::Value) -> ToolOutput {
            let mut payload = serde_json::Map::new();
            payload.insert(
                "results".into(),
                json!([{"id": "d1", "score": 0.9, "metadata": {"content": input["query"]}}]),
            );
            payload.insert("namespace".into(), "docs".into());
            payload.insert("index".into(), "kb".into());
            ToolOutput::Success(payload)
        }
    }

    async fn build_docs_search(_spec: ToolSpec, _ctx: ToolBuildContext) -> Result<BoxTool, AgentError> {
        Ok(BoxTool::new(DocsSearch(ToolDefinition {
            name: "search_docs".to_string(),
            description: "Search docs".to_string(),
            input_schema: json!({"type": "object"}),
        })))
    }

    fn ollama_config(tools: serde_json::Value) -> serde_json::Value {
        json!({
            "schema": "agent_config",
            "version": 3,
            "data": {
                "systemPrompt": "You are helpful.",
                "tools": tools,
                "model": {"provider": "ollama", "model": "llama3"}
            }
        })
    }

    struct Harness {
        engine: CompletionEngine<MemoryAgents, MemoryChat, FixedModels>,
        agents: Arc<MemoryAgents>,
        chat: Arc<MemoryChat>,
        provider: Arc<ScriptedProvider>,
    }

    fn harness(agents: MemoryAgents, provider: ScriptedProvider, max_iterations: u32) -> Harness {
        let agents = Arc::new(agents);
        let chat = Arc::new(MemoryChat::default());
        let provider = Arc::new(provider);
        let registry = ToolRegistry::builder()
            .register("vectorSearch", build_docs_search)
            .build();
        let engine = CompletionEngine::new(
            Arc::clone(&agents),
            Arc::clone(&chat),
            Arc::new(FixedModels(provider.clone())),
            Arc::new(registry),
            Arc::new(MemoryCredentials::default().into_service()),
            EngineSettings {
                max_iterations,
                max_tokens: 1024,
            },
        );
        Harness {
            engine,
            agents,
            chat,
            provider,
        }
    }

    fn input(account_id: i64, agent_id: i64, prompt: &str) -> CompletionInput {
        CompletionInput {
            account_id,
            agent_id,
            session_id: SESSION.to_string(),
            prompt: prompt.to_string(),
            auth_token: Some("token".to_string()),
        }
    }

    async fn collect(engine: &CompletionEngine<MemoryAgents, MemoryChat, FixedModels>, input: CompletionInput) -> Vec<StreamRecord> {
        engine.stream_completion(input).collect().await
    }

    fn kinds(records: &[StreamRecord]) -> Vec<EventKind> {
        records.iter().map(|r| r.event).collect()
    }

    #[tokio::test]
    async fn test_zero_tool_run_takes_reduced_path() {
        let h = harness(
            MemoryAgents::default().with_agent(7, 1, ollama_config(json!([]))),
            ScriptedProvider::new(vec![text_turn(&["Hel", "lo", " there"])]),
            10,
        );

        let records = collect(&h.engine, input(1, 7, "hi")).await;
        assert_eq!(
            kinds(&records),
            [
                EventKind::ChatModelStart,
                EventKind::ChatModelStream,
                EventKind::ChatModelStream,
                EventKind::ChatModelStream,
                EventKind::ChainEnd,
            ]
        );
        assert_eq!(records.last().unwrap().data, Some(json!("Hello there")));

        let stored = h.chat.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], StoredMessage::human("hi"));
        assert_eq!(stored[1], StoredMessage::ai("Hello there", vec![]));

        let sessions = h.chat.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title.as_deref(), Some("Chat with Agent 7"));
    }

    #[tokio::test]
    async fn test_single_tool_run_persists_one_pair() {
        let h = harness(
            MemoryAgents::default().with_agent(
                7,
                1,
                ollama_config(json!([{"type": "vectorSearch", "provider": "pinecone", "index": "kb", "namespace": "docs"}])),
            ),
            ScriptedProvider::new(vec![
                tool_turn("call_1", "search_docs", json!({"query": "rust"})),
                text_turn(&["Found it."]),
            ]),
            10,
        );

        let records = collect(&h.engine, input(1, 7, "find rust")).await;
        assert_eq!(
            kinds(&records),
            [
                EventKind::ChainStart,
                EventKind::ChatModelStart,
                EventKind::ToolStart,
                EventKind::ToolEnd,
                EventKind::ChatModelStart,
                EventKind::ChatModelStream,
                EventKind::ChainEnd,
            ]
        );
        let chain_end = records.last().unwrap();
        assert_eq!(chain_end.tool_calls.as_ref().unwrap()[0].tool_name, "search_docs");

        let stored = h.chat.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, ChatRole::Human);
        assert_eq!(stored[1].role, ChatRole::Ai);
        assert_eq!(stored[1].tool_calls.as_ref().map(Vec::len), Some(1));

        let requests = h.provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_openai_credential_fails_before_streaming() {
        let h = harness(
            MemoryAgents::default().with_agent(
                7,
                1,
                json!({"schema": "agent_config", "version": 2, "data": {"systemPrompt": "x", "tools": []}}),
            ),
            ScriptedProvider::new(vec![]),
            10,
        );

        let records = collect(&h.engine, input(1, 7, "hi")).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, EventKind::Error);
        assert_eq!(records[0].data.as_ref().unwrap()["error"], "credential_error");
        assert_eq!(records[0].data.as_ref().unwrap()["message"], "Openai API key required");
        assert!(h.chat.stored().is_empty());
        assert!(h.chat.sessions.lock().unwrap().is_empty());
        assert_eq!(h.provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_access_is_checked_on_every_run() {
        let h = harness(
            MemoryAgents::default().with_agent(7, 1, ollama_config(json!([]))),
            ScriptedProvider::new(vec![]),
            10,
        );

        let denied = collect(&h.engine, input(2, 7, "hi")).await;
        assert_eq!(kinds(&denied), [EventKind::Error]);
        assert_eq!(denied[0].data.as_ref().unwrap()["error"], "agent_not_found");

        h.agents.grant(2, 7);
        let allowed = collect(&h.engine, input(2, 7, "hi")).await;
        assert_eq!(allowed.last().unwrap().event, EventKind::ChainEnd);

        let missing = collect(&h.engine, input(1, 99, "hi")).await;
        assert_eq!(missing[0].data.as_ref().unwrap()["error"], "agent_not_found");
    }

    #[tokio::test]
    async fn test_malformed_session_id_is_rejected() {
        let h = harness(
            MemoryAgents::default().with_agent(7, 1, ollama_config(json!([]))),
            ScriptedProvider::new(vec![]),
            10,
        );
        let mut bad = input(1, 7, "hi");
        bad.session_id = "not-a-uuid".to_string();

        let records = collect(&h.engine, bad).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data.as_ref().unwrap()["error"], "validation_error");
        assert_eq!(h.provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_does_not_persist_partial_answer() {
        let h = harness(
            MemoryAgents::default().with_agent(7, 1, ollama_config(json!([]))),
            ScriptedProvider::new(vec![vec![
                Ok(agentry_types::llm::StreamEvent::TextDelta { text: "partial".to_string() }),
                Err(LlmError::Stream("connection reset".to_string())),
            ]]),
            10,
        );

        let records = collect(&h.engine, input(1, 7, "hi")).await;
        assert_eq!(
            kinds(&records),
            [EventKind::ChatModelStart, EventKind::ChatModelStream, EventKind::Error]
        );
        let stored = h.chat.stored();
        assert_eq!(stored, [StoredMessage::human("hi")]);
    }

    #[tokio::test]
    async fn test_history_seeds_next_run() {
        let h = harness(
            MemoryAgents::default().with_agent(7, 1, ollama_config(json!([]))),
            ScriptedProvider::new(vec![text_turn(&["first"]), text_turn(&["second"])]),
            10,
        );

        collect(&h.engine, input(1, 7, "one")).await;
        collect(&h.engine, input(1, 7, "two")).await;

        let requests = h.provider.requests.lock().unwrap();
        let second = &requests[1];
        let contents: Vec<_> = second.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "first", "two"]);
        assert_eq!(second.system.as_deref(), Some("You are helpful."));
        assert_eq!(h.chat.sessions.lock().unwrap().len(), 1);
        assert_eq!(h.chat.stored().len(), 4);
    }

    #[tokio::test]
    async fn test_system_prompt_variables_resolved_per_run() {
        let config = json!({
            "schema": "agent_config",
            "version": 3,
            "data": {
                "systemPrompt": "You are {{ agent_name }}. Keep {{ unknown }} as is.",
                "tools": [],
                "model": {"provider": "ollama", "model": "llama3"}
            }
        });
        let h = harness(
            MemoryAgents::default().with_agent(7, 1, config),
            ScriptedProvider::new(vec![text_turn(&["ok"])]),
            10,
        );

        collect(&h.engine, input(1, 7, "hi")).await;

        let requests = h.provider.requests.lock().unwrap();
        assert_eq!(
            requests[0].system.as_deref(),
            Some("You are agent-7. Keep {{ unknown }} as is.")
        );
    }

    #[tokio::test]
    async fn test_max_iterations_ends_chain() {
        let h = harness(
            MemoryAgents::default().with_agent(
                7,
                1,
                ollama_config(json!([{"type": "vectorSearch", "namespace": "docs"}])),
            ),
            ScriptedProvider::new(vec![])
                .with_fallback(|| tool_turn("call", "search_docs", json!({"query": "again"}))),
            2,
        );

        let records = collect(&h.engine, input(1, 7, "loop")).await;
        let end = records.last().unwrap();
        assert_eq!(end.event, EventKind::ChainEnd);
        assert_eq!(end.data, Some(json!(crate::agent::executor::MAX_ITERATIONS_MESSAGE)));
        assert_eq!(end.tool_calls.as_ref().map(Vec::len), Some(2));
        assert_eq!(h.provider.request_count(), 2);

        let stored = h.chat.stored();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].content, "Agent stopped due to max iterations.");
    }

    #[tokio::test]
    async fn test_unknown_tool_request_is_reported_to_model() {
        let h = harness(
            MemoryAgents::default().with_agent(
                7,
                1,
                ollama_config(json!([{"type": "vectorSearch", "namespace": "docs"}])),
            ),
            ScriptedProvider::new(vec![
                tool_turn("call_1", "delete_everything", json!({})),
                text_turn(&["Sorry."]),
            ]),
            10,
        );

        let records = collect(&h.engine, input(1, 7, "go")).await;
        assert_eq!(records.last().unwrap().event, EventKind::ChainEnd);

        let requests = h.provider.requests.lock().unwrap();
        let tool_message = requests[1].messages.last().unwrap();
        assert!(tool_message.content.contains("Tool not found: delete_everything"));
    }
}
