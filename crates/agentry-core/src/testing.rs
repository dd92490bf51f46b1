//! In-memory doubles of the ports, shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use agentry_types::agent::{Agent, AgentConfig, ModelSpec};
use agentry_types::chat::{ChatMessage, ChatSession, StoredMessage};
use agentry_types::error::{AgentError, RepositoryError};
use agentry_types::llm::{CompletionRequest, LlmError, StreamEvent};

use crate::chat::repository::ChatRepository;
use crate::llm::factory::{ModelFactory, ModelProviderKind, ResolvedModel, provider_api_key};
use crate::llm::provider::{DynLlmProvider, LlmEventStream, LlmProvider};
use crate::repository::agent::{AccessRepository, AgentRepository};
use crate::service::credential::CredentialService;

pub type Turn = Vec<Result<StreamEvent, LlmError>>;

/// Provider that replays one scripted turn per request. When the script
/// runs out, `fallback` is replayed.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Turn>>,
    fallback: fn() -> Turn,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fallback: || text_turn(&["ok"]),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: fn() -> Turn) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        self.requests.lock().unwrap().push(request);
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback);
        Box::pin(futures_util::stream::iter(turn))
    }
}

pub fn text_turn(chunks: &[&str]) -> Turn {
    let mut turn = vec![Ok(StreamEvent::Connected)];
    turn.extend(chunks.iter().map(|c| Ok(StreamEvent::TextDelta { text: c.to_string() })));
    turn.push(Ok(StreamEvent::Done));
    turn
}

pub fn tool_turn(id: &str, name: &str, input: serde_json::Value) -> Turn {
    vec![
        Ok(StreamEvent::Connected),
        Ok(StreamEvent::ToolUseComplete {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }),
        Ok(StreamEvent::Done),
    ]
}

/// Model factory that checks credentials like the real one but always
/// hands out the same provider.
pub struct FixedModels(pub DynLlmProvider);

impl ModelFactory for FixedModels {
    async fn resolve(
        &self,
        spec: &ModelSpec,
        account_id: i64,
        credentials: &CredentialService,
    ) -> Result<ResolvedModel, AgentError> {
        let kind: ModelProviderKind = spec.provider.parse()?;
        provider_api_key(kind, account_id, credentials).await?;
        Ok(ResolvedModel {
            provider: self.0.clone(),
            kind,
            model: spec.model.clone(),
        })
    }
}

/// Agents plus the sharing graph, flattened to `(account, agent)` grants.
#[derive(Default)]
pub struct MemoryAgents {
    agents: HashMap<i64, Agent>,
    grants: Mutex<HashSet<(i64, i64)>>,
}

impl MemoryAgents {
    pub fn with_agent(mut self, id: i64, owner: i64, config: serde_json::Value) -> Self {
        let config: AgentConfig = serde_json::from_value(config).unwrap();
        let now = Utc::now();
        self.agents.insert(
            id,
            Agent {
                id,
                account_id: owner,
                name: format!("agent-{id}"),
                config,
                created_at: now,
                updated_at: now,
            },
        );
        self
    }

    pub fn grant(&self, account_id: i64, agent_id: i64) {
        self.grants.lock().unwrap().insert((account_id, agent_id));
    }
}

impl AgentRepository for MemoryAgents {
    async fn get_agent(&self, agent_id: i64) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.agents.get(&agent_id).cloned())
    }
}

impl AccessRepository for MemoryAgents {
    async fn can_access(&self, account_id: i64, agent_id: i64) -> Result<bool, RepositoryError> {
        let owner = self.agents.get(&agent_id).map(|a| a.account_id);
        Ok(owner == Some(account_id)
            || self.grants.lock().unwrap().contains(&(account_id, agent_id)))
    }
}

#[derive(Default)]
pub struct MemoryChat {
    pub sessions: Mutex<Vec<ChatSession>>,
    pub messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryChat {
    pub fn stored(&self) -> Vec<StoredMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.message.clone())
            .collect()
    }
}

impl ChatRepository for MemoryChat {
    async fn get_session(
        &self,
        account_id: i64,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.account_id == account_id && s.session_id == *session_id)
            .cloned())
    }

    async fn create_session(
        &self,
        account_id: i64,
        agent_id: Option<i64>,
        session_id: &Uuid,
        title: &str,
    ) -> Result<ChatSession, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = ChatSession {
            id: sessions.len() as i64 + 1,
            session_id: *session_id,
            account_id,
            agent_id,
            title: Some(title.to_string()),
            created_at: Utc::now(),
        };
        sessions.push(session.clone());
        Ok(session)
    }

    async fn append_message(
        &self,
        session_id: i64,
        message: &StoredMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.lock().unwrap();
        let row = ChatMessage {
            id: messages.len() as i64 + 1,
            session_id,
            message: message.clone(),
            created_at: Utc::now(),
        };
        messages.push(row.clone());
        Ok(row)
    }

    async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }
}
