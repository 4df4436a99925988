use crate::infra::{deserialize_optional_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use exam_planner::calculator::{calculator_router, CalculatorService, SchoolRepository};
use exam_planner::error::AppError;
use exam_planner::schedule::{
    dday_label, CompletionMap, ExamBoard, ExamRecord, MemoryStore, Phase, ScheduleSession,
    SelectionMap, Store, StoreKey, SummaryEntry, UserProfile,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct PlanRequest {
    pub(crate) records: Vec<ExamRecord>,
    #[serde(default)]
    pub(crate) selections: SelectionMap,
    #[serde(default)]
    pub(crate) completions: CompletionMap,
    #[serde(default)]
    pub(crate) user_name: Option<String>,
    #[serde(default)]
    pub(crate) user_deviation: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlanDateView {
    pub(crate) date: String,
    pub(crate) dday: String,
    pub(crate) candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) selection: Option<ExamRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlanResponse {
    pub(crate) today: NaiveDate,
    pub(crate) profile: UserProfile,
    pub(crate) phase: Phase,
    pub(crate) dates: Vec<PlanDateView>,
    pub(crate) remaining: Vec<String>,
    pub(crate) all_selected: bool,
    pub(crate) completions: CompletionMap,
    pub(crate) summary: Vec<SummaryEntry>,
}

pub(crate) fn with_calculator_routes<R>(service: Arc<CalculatorService<R>>) -> axum::Router
where
    R: SchoolRepository + 'static,
{
    calculator_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/schedule/plan", axum::routing::post(plan_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Replays a client-held plan through a throwaway session and returns the derived view.
pub(crate) async fn plan_endpoint(
    Json(payload): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let PlanRequest {
        records,
        selections,
        completions,
        user_name,
        user_deviation,
        today,
    } = payload;

    let store = Arc::new(MemoryStore::default());
    seed(store.as_ref(), StoreKey::Selections, &selections)?;
    seed(store.as_ref(), StoreKey::Completions, &completions)?;

    let mut session = ScheduleSession::open(ExamBoard::from_records(records), store);
    if user_name.is_some() || user_deviation.is_some() {
        let current = session.profile().clone();
        session.start(UserProfile::new(
            user_name.as_deref().unwrap_or(&current.name),
            user_deviation.unwrap_or(current.deviation),
        ));
    }
    for (date, record) in selections {
        session.confirm(&date, record)?;
    }
    session.finish();

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let dates = session
        .board()
        .dates()
        .iter()
        .map(|date| PlanDateView {
            date: date.clone(),
            dday: dday_label(date, today),
            candidates: session.board().records_on(date).len(),
            selection: session.selection(date).cloned(),
        })
        .collect();

    Ok(Json(PlanResponse {
        today,
        profile: session.profile().clone(),
        phase: session.phase(),
        dates,
        remaining: session.remaining_dates(),
        all_selected: session.all_selected(),
        completions: session.completions().as_map().clone(),
        summary: session.summary(today),
    }))
}

fn seed<T: Serialize>(store: &MemoryStore, key: StoreKey, value: &T) -> Result<(), AppError> {
    let raw = serde_json::to_string(value).map_err(std::io::Error::other)?;
    store.save(key, &raw).map_err(std::io::Error::other)?;
    Ok(())
}
