use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An account holder.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
    pub personality_type: Option<String>,
    pub nearest_city: Option<String>,
    pub hobbies: Option<String>,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Payload for creating an account. The password is already hashed by the
/// time it reaches the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
}

/// Typed partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub personality_type: Option<String>,
    pub nearest_city: Option<String>,
    pub hobbies: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account and return the stored row. Fails on duplicate
    /// email or username (enforced by unique indexes).
    async fn create_user(&self, new: &NewUser, now: DateTime<Utc>) -> anyhow::Result<User>;

    async fn get_user(&self, id: i64) -> anyhow::Result<Option<User>>;

    /// Case-insensitive email lookup.
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Case-insensitive username lookup.
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    /// Apply a typed profile patch. `None` when the account is gone.
    async fn update_profile(&self, id: i64, patch: &ProfilePatch)
        -> anyhow::Result<Option<User>>;

    /// Record a successful login.
    async fn touch_last_login(&self, id: i64, now: DateTime<Utc>) -> anyhow::Result<()>;

    /// Delete the account and everything it owns; `false` when already gone.
    async fn delete_user(&self, id: i64) -> anyhow::Result<bool>;
}
