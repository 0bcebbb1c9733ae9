//! Request handlers for the admin API.
//!
//! Reads are served from memory inline. Every write persists the record
//! files under the store lock, so writes run on the blocking pool.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use rgms_core::ledger::{self, SyncReport, SyncScope};
use rgms_core::models::{Cadet, GradeUpdate, MeritDemeritLog, MeritTotals, NewCadet, NewMeritLog};
use rgms_core::store::StoreStats;
use rgms_core::Store;

use super::{ApiError, AppState};

type ApiResult<T> = Result<T, ApiError>;

/// Run a store write on the blocking pool
async fn write<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> rgms_core::Result<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: StoreStats,
}

pub async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        stats: state.store.stats(),
    })
}

// ===== Cadets =====

pub async fn list_cadets(State(state): State<AppState>) -> Json<Vec<Cadet>> {
    Json(state.store.cadets())
}

pub async fn create_cadet(
    State(state): State<AppState>,
    Json(new): Json<NewCadet>,
) -> ApiResult<(StatusCode, Json<Cadet>)> {
    let cadet = write(&state, move |store| store.create_cadet(new)).await?;
    Ok((StatusCode::CREATED, Json(cadet)))
}

pub async fn get_cadet(
    State(state): State<AppState>,
    Path(cadet_id): Path<i64>,
) -> ApiResult<Json<Cadet>> {
    Ok(Json(state.store.cadet(cadet_id)?))
}

pub async fn delete_cadet(
    State(state): State<AppState>,
    Path(cadet_id): Path<i64>,
) -> ApiResult<StatusCode> {
    write(&state, move |store| store.delete_cadet(cadet_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Grades =====

pub async fn update_grades(
    State(state): State<AppState>,
    Path(cadet_id): Path<i64>,
    Json(update): Json<GradeUpdate>,
) -> ApiResult<Json<Cadet>> {
    let cadet = write(&state, move |store| store.update_grades(cadet_id, &update)).await?;
    Ok(Json(cadet))
}

// ===== Merit/Demerit Logs =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeritLogQuery {
    pub cadet_id: Option<i64>,
}

/// A newly recorded entry along with the cadet's totals after applying it
#[derive(Debug, Serialize)]
pub struct MeritLogCreated {
    #[serde(flatten)]
    pub log: MeritDemeritLog,
    pub cadet_totals: MeritTotals,
}

pub async fn list_merit_logs(
    State(state): State<AppState>,
    Query(query): Query<MeritLogQuery>,
) -> Json<Vec<MeritDemeritLog>> {
    Json(state.store.merit_logs(query.cadet_id))
}

pub async fn create_merit_log(
    State(state): State<AppState>,
    Json(new): Json<NewMeritLog>,
) -> ApiResult<(StatusCode, Json<MeritLogCreated>)> {
    let (log, cadet_totals) = write(&state, move |store| store.record_merit_log(new)).await?;
    Ok((StatusCode::CREATED, Json(MeritLogCreated { log, cadet_totals })))
}

pub async fn delete_merit_log(
    State(state): State<AppState>,
    Path(log_id): Path<i64>,
) -> ApiResult<StatusCode> {
    write(&state, move |store| store.delete_merit_log(log_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Ledger Sync =====

pub async fn sync_lifetime_merits(State(state): State<AppState>) -> ApiResult<Json<SyncReport>> {
    let report = write(&state, |store| {
        ledger::sync_lifetime_merits(store, SyncScope::AllCadets)
    })
    .await?;

    info!(
        synced = report.synced_count,
        total = report.total_cadets,
        "Lifetime merit sync requested"
    );
    Ok(Json(report))
}

pub async fn sync_cadet_merits(
    State(state): State<AppState>,
    Path(cadet_id): Path<i64>,
) -> ApiResult<Json<SyncReport>> {
    let report = write(&state, move |store| {
        ledger::sync_lifetime_merits(store, SyncScope::Cadet(cadet_id))
    })
    .await?;
    Ok(Json(report))
}
