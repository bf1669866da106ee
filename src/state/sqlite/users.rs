use super::*;

use crate::traits::{NewUser, ProfilePatch};

const USER_COLUMNS: &str = "id, email, username, display_name, password_hash, bio, \
     personality_type, nearest_city, hobbies, profile_picture_url, created_at, last_login_at";

#[async_trait]
impl crate::traits::UserStore for SqliteStateStore {
    async fn create_user(&self, new: &NewUser, now: DateTime<Utc>) -> anyhow::Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (email, username, display_name, password_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&new.email)
        .bind(&new.username)
        .bind(&new.display_name)
        .bind(&new.password_hash)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Self::row_to_user(&row))
    }

    async fn get_user(&self, id: i64) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = ?1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = ?1"
        ))
        .bind(username.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    async fn update_profile(
        &self,
        id: i64,
        patch: &ProfilePatch,
    ) -> anyhow::Result<Option<User>> {
        let result = sqlx::query(
            "UPDATE users SET \
             username = COALESCE(?1, username), \
             display_name = COALESCE(?2, display_name), \
             bio = COALESCE(?3, bio), \
             personality_type = COALESCE(?4, personality_type), \
             nearest_city = COALESCE(?5, nearest_city), \
             hobbies = COALESCE(?6, hobbies), \
             profile_picture_url = COALESCE(?7, profile_picture_url) \
             WHERE id = ?8",
        )
        .bind(&patch.username)
        .bind(&patch.display_name)
        .bind(&patch.bio)
        .bind(&patch.personality_type)
        .bind(&patch.nearest_city)
        .bind(&patch.hobbies)
        .bind(&patch.profile_picture_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    async fn touch_last_login(&self, id: i64, now: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
            .bind(now.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> anyhow::Result<bool> {
        // connections has ON DELETE CASCADE, but be explicit
        sqlx::query("DELETE FROM connections WHERE user_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
