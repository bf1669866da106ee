use super::*;

use crate::traits::{ConnectionPatch, NewConnection, RankedPage};

const CONNECTION_COLUMNS: &str = "id, user_id, connection_name, reach_out_priority, \
     reminder_frequency_days, connection_type, know_from, notes, created_at, last_contacted_at";

/// SQL mirror of `ranking::ranking_score`, with the reference instant bound
/// as ?1. `julianday` yields fractional days; a malformed or missing
/// timestamp or a non-positive reminder frequency collapses the overdue term
/// to 0 instead of dropping the row to the bottom of the sort.
const RANKING_SCORE_SQL: &str = "(0.5 * reach_out_priority) + (0.5 * COALESCE(\
     CASE WHEN reminder_frequency_days > 0 \
     THEN julianday(?1) - julianday(COALESCE(last_contacted_at, created_at)) - reminder_frequency_days \
     ELSE 0.0 END, 0.0))";

#[async_trait]
impl crate::traits::ConnectionStore for SqliteStateStore {
    async fn create_connection(
        &self,
        user_id: i64,
        new: &NewConnection,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Connection> {
        let result = sqlx::query(
            "INSERT INTO connections (user_id, connection_name, reach_out_priority, \
             reminder_frequency_days, connection_type, know_from, notes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(user_id)
        .bind(&new.connection_name)
        .bind(new.reach_out_priority)
        .bind(new.reminder_frequency_days)
        .bind(&new.connection_type)
        .bind(&new.know_from)
        .bind(&new.notes)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let row = sqlx::query(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::row_to_connection(&row))
    }

    async fn get_connection(&self, user_id: i64, id: i64) -> anyhow::Result<Option<Connection>> {
        let row = sqlx::query(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::row_to_connection(&r)))
    }

    async fn list_ranked(
        &self,
        user_id: i64,
        page: u32,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RankedPage> {
        let page = page.max(1);
        // One extra row answers "is there a next page" without a COUNT(*).
        let limit = page_size as i64 + 1;
        let offset = (page as i64 - 1) * page_size as i64;

        let rows = sqlx::query(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections \
             WHERE user_id = ?2 \
             ORDER BY {RANKING_SCORE_SQL} DESC, connection_name COLLATE NOCASE ASC \
             LIMIT ?3 OFFSET ?4"
        ))
        .bind(now.to_rfc3339())
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let has_next = rows.len() as i64 > page_size as i64;
        let connections = rows
            .iter()
            .take(page_size as usize)
            .map(Self::row_to_connection)
            .collect();

        Ok(RankedPage {
            connections,
            page,
            has_next,
        })
    }

    async fn search_by_name(
        &self,
        user_id: i64,
        query: &str,
        limit: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Connection>> {
        let pattern = format!("%{}%", query);
        let rows = sqlx::query(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections \
             WHERE user_id = ?2 AND connection_name LIKE ?3 \
             ORDER BY {RANKING_SCORE_SQL} DESC, connection_name COLLATE NOCASE ASC \
             LIMIT ?4"
        ))
        .bind(now.to_rfc3339())
        .bind(user_id)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_connection).collect())
    }

    async fn update_connection(
        &self,
        user_id: i64,
        id: i64,
        patch: &ConnectionPatch,
    ) -> anyhow::Result<Option<Connection>> {
        let result = sqlx::query(
            "UPDATE connections SET \
             connection_name = COALESCE(?1, connection_name), \
             reach_out_priority = COALESCE(?2, reach_out_priority), \
             reminder_frequency_days = COALESCE(?3, reminder_frequency_days), \
             connection_type = COALESCE(?4, connection_type), \
             know_from = COALESCE(?5, know_from), \
             notes = COALESCE(?6, notes) \
             WHERE id = ?7 AND user_id = ?8",
        )
        .bind(&patch.connection_name)
        .bind(patch.reach_out_priority)
        .bind(patch.reminder_frequency_days)
        .bind(&patch.connection_type)
        .bind(&patch.know_from)
        .bind(&patch.notes)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection(user_id, id).await
    }

    async fn delete_connection(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_reached_out(
        &self,
        user_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Connection>> {
        // last_contacted_at only ever moves forward.
        let result = sqlx::query(
            "UPDATE connections SET last_contacted_at = CASE \
             WHEN last_contacted_at IS NULL \
               OR julianday(last_contacted_at) < julianday(?1) THEN ?1 \
             ELSE last_contacted_at END \
             WHERE id = ?2 AND user_id = ?3",
        )
        .bind(now.to_rfc3339())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection(user_id, id).await
    }
}
