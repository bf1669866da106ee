use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RankingConfig;
use crate::error::ApiError;
use crate::ranking::{self, ContactBucket};
use crate::server::{AppState, AuthedUser};
use crate::traits::{Connection, ConnectionPatch, ConnectionStore, NewConnection};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Staleness/urgency descriptor, computed by the shared ranker so the list,
/// detail, and map views always agree.
#[derive(Debug, Serialize)]
pub struct ReachoutStatus {
    pub days_until_reachout: Option<i64>,
    pub reachout_label: String,
    pub contact_bucket: ContactBucket,
    pub ranking_score: f64,
}

impl ReachoutStatus {
    fn compute(c: &Connection, cfg: &RankingConfig, now: DateTime<Utc>) -> Self {
        let days_since = ranking::days_since_contact(c.last_contacted_at, Some(c.created_at), now);
        let days_until = ranking::days_until_reachout(
            c.last_contacted_at,
            Some(c.created_at),
            c.reminder_frequency_days,
            now,
        );
        Self {
            days_until_reachout: days_until,
            reachout_label: ranking::reachout_label(days_until),
            contact_bucket: ranking::bucket(days_since, cfg.recent_days, cfg.stale_days),
            ranking_score: ranking::ranking_score(
                c.reach_out_priority,
                c.last_contacted_at,
                Some(c.created_at),
                c.reminder_frequency_days,
                now,
            ),
        }
    }
}

#[derive(Serialize)]
pub struct ConnectionSummary {
    id: i64,
    connection_name: String,
    reach_out_priority: i64,
    reminder_frequency_days: i64,
    created_at: DateTime<Utc>,
    last_contacted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    reachout: ReachoutStatus,
}

impl ConnectionSummary {
    fn build(c: Connection, cfg: &RankingConfig, now: DateTime<Utc>) -> Self {
        let reachout = ReachoutStatus::compute(&c, cfg, now);
        Self {
            id: c.id,
            connection_name: c.connection_name,
            reach_out_priority: c.reach_out_priority,
            reminder_frequency_days: c.reminder_frequency_days,
            created_at: c.created_at,
            last_contacted_at: c.last_contacted_at,
            reachout,
        }
    }
}

#[derive(Serialize)]
pub struct ConnectionDetail {
    id: i64,
    connection_name: String,
    reach_out_priority: i64,
    reminder_frequency_days: i64,
    connection_type: Option<String>,
    know_from: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    last_contacted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    reachout: ReachoutStatus,
}

impl ConnectionDetail {
    fn build(c: Connection, cfg: &RankingConfig, now: DateTime<Utc>) -> Self {
        let reachout = ReachoutStatus::compute(&c, cfg, now);
        Self {
            id: c.id,
            connection_name: c.connection_name,
            reach_out_priority: c.reach_out_priority,
            reminder_frequency_days: c.reminder_frequency_days,
            connection_type: c.connection_type,
            know_from: c.know_from,
            notes: c.notes,
            created_at: c.created_at,
            last_contacted_at: c.last_contacted_at,
            reachout,
        }
    }
}

#[derive(Serialize)]
pub struct ListResponse {
    connections: Vec<ConnectionSummary>,
    page: u32,
    has_next: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    connections: Vec<ConnectionSummary>,
}

#[derive(Serialize)]
pub struct DetailResponse {
    connection: ConnectionDetail,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

pub async fn list_connections(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let now = Utc::now();
    let cfg = &state.config.ranking;
    let page = state
        .store
        .list_ranked(user.0, query.page, cfg.page_size, now)
        .await?;

    Ok(Json(ListResponse {
        connections: page
            .connections
            .into_iter()
            .map(|c| ConnectionSummary::build(c, cfg, now))
            .collect(),
        page: page.page,
        has_next: page.has_next,
    }))
}

pub async fn connection_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i64>,
) -> Result<Json<DetailResponse>, ApiError> {
    let now = Utc::now();
    let connection = state
        .store
        .get_connection(user.0, id)
        .await?
        .ok_or(ApiError::NotFound("Connection"))?;

    Ok(Json(DetailResponse {
        connection: ConnectionDetail::build(connection, &state.config.ranking, now),
    }))
}

pub async fn create_connection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(new): Json<NewConnection>,
) -> Result<impl IntoResponse, ApiError> {
    validate_name(&new.connection_name)?;
    validate_priority(new.reach_out_priority)?;
    validate_reminder(new.reminder_frequency_days)?;

    let now = Utc::now();
    let connection = state.store.create_connection(user.0, &new, now).await?;
    info!(user_id = user.0, connection_id = connection.id, "connection created");

    Ok((
        StatusCode::CREATED,
        Json(DetailResponse {
            connection: ConnectionDetail::build(connection, &state.config.ranking, now),
        }),
    ))
}

pub async fn update_connection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i64>,
    Json(patch): Json<ConnectionPatch>,
) -> Result<Json<DetailResponse>, ApiError> {
    if let Some(name) = &patch.connection_name {
        validate_name(name)?;
    }
    if let Some(priority) = patch.reach_out_priority {
        validate_priority(priority)?;
    }
    if let Some(reminder) = patch.reminder_frequency_days {
        validate_reminder(reminder)?;
    }

    let now = Utc::now();
    let connection = state
        .store
        .update_connection(user.0, id, &patch)
        .await?
        .ok_or(ApiError::NotFound("Connection"))?;

    Ok(Json(DetailResponse {
        connection: ConnectionDetail::build(connection, &state.config.ranking, now),
    }))
}

pub async fn delete_connection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_connection(user.0, id).await? {
        info!(user_id = user.0, connection_id = id, "connection deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Connection"))
    }
}

pub async fn search_connections(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Path(query): Path<String>,
) -> Result<Json<SearchResponse>, ApiError> {
    let now = Utc::now();
    let cfg = &state.config.ranking;
    let hits = state
        .store
        .search_by_name(user.0, query.trim(), cfg.search_limit, now)
        .await?;

    Ok(Json(SearchResponse {
        connections: hits
            .into_iter()
            .map(|c| ConnectionSummary::build(c, cfg, now))
            .collect(),
    }))
}

pub async fn mark_reached_out(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<i64>,
) -> Result<Json<DetailResponse>, ApiError> {
    let now = Utc::now();
    let connection = state
        .store
        .mark_reached_out(user.0, id, now)
        .await?
        .ok_or(ApiError::NotFound("Connection"))?;
    info!(user_id = user.0, connection_id = id, "reach-out recorded");

    Ok(Json(DetailResponse {
        connection: ConnectionDetail::build(connection, &state.config.ranking, now),
    }))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("connection_name is required".into()));
    }
    Ok(())
}

fn validate_priority(priority: i64) -> Result<(), ApiError> {
    if !(0..=10).contains(&priority) {
        return Err(ApiError::BadRequest(
            "reach_out_priority must be between 0 and 10".into(),
        ));
    }
    Ok(())
}

fn validate_reminder(days: i64) -> Result<(), ApiError> {
    if days < 1 {
        return Err(ApiError::BadRequest(
            "reminder_frequency_days must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_bounds() {
        assert!(validate_priority(0).is_ok());
        assert!(validate_priority(10).is_ok());
        assert!(validate_priority(-1).is_err());
        assert!(validate_priority(11).is_err());
    }

    #[test]
    fn reminder_must_be_positive() {
        assert!(validate_reminder(1).is_ok());
        assert!(validate_reminder(365).is_ok());
        assert!(validate_reminder(0).is_err());
        assert!(validate_reminder(-7).is_err());
    }

    #[test]
    fn name_must_be_non_blank() {
        assert!(validate_name("Maya").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }
}
