use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::traits::{Connection, User};

mod connections;
mod users;


/// SQLite-backed implementation of the store traits.
///
/// All timestamps are stored as RFC 3339 TEXT. Migrations are idempotent
/// (`IF NOT EXISTS`) and run on every startup.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                username TEXT NOT NULL,
                display_name TEXT NOT NULL,
                password_hash TEXT,
                bio TEXT,
                personality_type TEXT,
                nearest_city TEXT,
                hobbies TEXT,
                profile_picture_url TEXT,
                created_at TEXT NOT NULL,
                last_login_at TEXT
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_unique
             ON users(LOWER(email))",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_unique
             ON users(LOWER(username))",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                connection_name TEXT NOT NULL,
                reach_out_priority INTEGER NOT NULL DEFAULT 0,
                reminder_frequency_days INTEGER NOT NULL DEFAULT 30,
                connection_type TEXT,
                know_from TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                last_contacted_at TEXT
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_connections_user ON connections(user_id)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_connections_user_name
             ON connections(user_id, connection_name COLLATE NOCASE)",
        )
        .execute(&pool)
        .await?;

        tracing::info!(db_path, "SQLite store ready");

        Ok(Self { pool })
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
        User {
            id: row.get("id"),
            email: row.get("email"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            password_hash: row.get("password_hash"),
            bio: row.get("bio"),
            personality_type: row.get("personality_type"),
            nearest_city: row.get("nearest_city"),
            hobbies: row.get("hobbies"),
            profile_picture_url: row.get("profile_picture_url"),
            created_at: parse_dt(&row.get::<String, _>("created_at")),
            last_login_at: parse_dt_opt(row.get("last_login_at")),
        }
    }

    fn row_to_connection(row: &sqlx::sqlite::SqliteRow) -> Connection {
        Connection {
            id: row.get("id"),
            user_id: row.get("user_id"),
            connection_name: row.get("connection_name"),
            reach_out_priority: row.get("reach_out_priority"),
            reminder_frequency_days: row.get("reminder_frequency_days"),
            connection_type: row.get("connection_type"),
            know_from: row.get("know_from"),
            notes: row.get("notes"),
            created_at: parse_dt(&row.get::<String, _>("created_at")),
            last_contacted_at: parse_dt_opt(row.get("last_contacted_at")),
        }
    }
}

fn parse_dt(raw: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_dt_opt(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        chrono::DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}
