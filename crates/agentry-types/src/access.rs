//! Agent sharing graph: groups, memberships and grants.
//!
//! An account may run an agent it owns, or any agent granted to a group the
//! account is a member of.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGroup {
    pub id: i64,
    pub name: String,
    pub owner_account_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGroupMember {
    pub id: i64,
    pub access_group_id: i64,
    pub account_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAccessGrant {
    pub id: i64,
    pub agent_id: i64,
    pub access_group_id: i64,
    pub created_at: DateTime<Utc>,
}
