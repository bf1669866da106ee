use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person the user tracks and wants to periodically contact.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: i64,
    pub user_id: i64,
    pub connection_name: String,
    pub reach_out_priority: i64,
    pub reminder_frequency_days: i64,
    pub connection_type: Option<String>,
    pub know_from: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Advanced only by the reached-out action; `created_at` stands in while
    /// this is `NULL`.
    pub last_contacted_at: Option<DateTime<Utc>>,
}

/// Payload for creating a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConnection {
    pub connection_name: String,
    #[serde(default)]
    pub reach_out_priority: i64,
    #[serde(default = "default_reminder_frequency_days")]
    pub reminder_frequency_days: i64,
    pub connection_type: Option<String>,
    pub know_from: Option<String>,
    pub notes: Option<String>,
}

fn default_reminder_frequency_days() -> i64 {
    30
}

/// Typed partial update. Absent fields are left unchanged; there is no
/// dynamic key/value patching anywhere in the write path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionPatch {
    pub connection_name: Option<String>,
    pub reach_out_priority: Option<i64>,
    pub reminder_frequency_days: Option<i64>,
    pub connection_type: Option<String>,
    pub know_from: Option<String>,
    pub notes: Option<String>,
}

/// One page of a ranked listing, plus the signal for "is there more".
#[derive(Debug)]
pub struct RankedPage {
    pub connections: Vec<Connection>,
    pub page: u32,
    pub has_next: bool,
}

/// Per-user connection storage. Every method is scoped to an owning user id;
/// a row owned by someone else behaves exactly like a missing row.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert a connection for `user_id` and return the stored row.
    async fn create_connection(
        &self,
        user_id: i64,
        new: &NewConnection,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Connection>;

    /// Fetch a single connection, `None` when absent or foreign-owned.
    async fn get_connection(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Connection>>;

    /// One page of the user's connections ordered by ranking score (desc),
    /// then name (case-insensitive asc). Fetches `page_size + 1` rows to
    /// derive `has_next` and returns at most `page_size`.
    async fn list_ranked(
        &self,
        user_id: i64,
        page: u32,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RankedPage>;

    /// Case-insensitive substring search on name, ranked like the listing,
    /// capped at `limit` rows with no pagination.
    async fn search_by_name(
        &self,
        user_id: i64,
        query: &str,
        limit: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Connection>>;

    /// Apply a typed patch. `None` when absent or foreign-owned.
    async fn update_connection(
        &self,
        user_id: i64,
        id: i64,
        patch: &ConnectionPatch,
    ) -> anyhow::Result<Option<Connection>>;

    /// Delete a connection; `false` when absent or foreign-owned.
    async fn delete_connection(&self, user_id: i64, id: i64) -> anyhow::Result<bool>;

    /// Record a reach-out: advances `last_contacted_at` to `now`, never
    /// backwards. `None` when absent or foreign-owned.
    async fn mark_reached_out(
        &self,
        user_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Connection>>;
}
