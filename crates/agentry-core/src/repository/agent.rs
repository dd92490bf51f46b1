//! Agent and access-control repository trait definitions.

use agentry_types::agent::Agent;
use agentry_types::error::RepositoryError;

/// Read access to stored agents.
pub trait AgentRepository: Send + Sync {
    /// Get an agent by id, regardless of owner.
    fn get_agent(
        &self,
        agent_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Agent>, RepositoryError>> + Send;
}

/// Authorization check for running an agent.
pub trait AccessRepository: Send + Sync {
    /// True when `account_id` owns the agent, or is a member of a group that
    /// holds a grant for it.
    ///
    /// Evaluated against the store on every call with no caching, so a
    /// revoked grant or membership takes effect on the next call.
    fn can_access(
        &self,
        account_id: i64,
        agent_id: i64,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
