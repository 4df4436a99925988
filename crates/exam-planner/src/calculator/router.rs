use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CalculatorSnapshot, SchoolDraft, SchoolId, SchoolUpdate, SelectionEntry, UserId,
};
use super::repository::{RepositoryError, SchoolRepository};
use super::service::{CalculatorService, CalculatorServiceError, EvaluationRequest};

/// Header naming the acting user; requests without it act as user 0.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub(crate) struct SelectRequest {
    school_id: SchoolId,
    #[serde(default)]
    display_order: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReorderRequest {
    schools: Vec<SelectionEntry>,
}

/// Router builder exposing school management and score evaluation.
pub fn calculator_router<R>(service: Arc<CalculatorService<R>>) -> Router
where
    R: SchoolRepository + 'static,
{
    Router::new()
        .route(
            "/api/calculator/schools",
            get(list_schools_handler::<R>).post(create_school_handler::<R>),
        )
        .route(
            "/api/calculator/schools/:school_id",
            get(get_school_handler::<R>)
                .put(update_school_handler::<R>)
                .delete(delete_school_handler::<R>),
        )
        .route(
            "/api/calculator/selected-schools",
            get(selected_schools_handler::<R>)
                .post(add_selected_handler::<R>)
                .delete(clear_selected_handler::<R>),
        )
        .route(
            "/api/calculator/selected-schools/order",
            put(reorder_selected_handler::<R>),
        )
        .route(
            "/api/calculator/selected-schools/:school_id",
            axum::routing::delete(remove_selected_handler::<R>),
        )
        .route(
            "/api/calculator/data",
            get(get_snapshot_handler::<R>).post(save_snapshot_handler::<R>),
        )
        .route("/api/calculator/evaluate", post(evaluate_handler::<R>))
        .with_state(service)
}

pub(crate) async fn list_schools_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    match service.list_schools() {
        Ok(schools) => (StatusCode::OK, Json(json!({ "schools": schools }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_school_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
    Json(draft): Json<SchoolDraft>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.create_school(user, draft) {
        Ok(school) => (StatusCode::CREATED, Json(json!({ "school": school }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_school_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    Path(school_id): Path<u64>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    match service.school(SchoolId(school_id)) {
        Ok(school) => (StatusCode::OK, Json(json!({ "school": school }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_school_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    Path(school_id): Path<u64>,
    Json(update): Json<SchoolUpdate>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    match service.update_school(SchoolId(school_id), update) {
        Ok(school) => (StatusCode::OK, Json(json!({ "school": school }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_school_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    Path(school_id): Path<u64>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    match service.delete_school(SchoolId(school_id)) {
        Ok(()) => success(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn selected_schools_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.selected_schools(user) {
        Ok(schools) => (StatusCode::OK, Json(json!({ "schools": schools }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_selected_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
    Json(request): Json<SelectRequest>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.add_selected(user, request.school_id, request.display_order) {
        Ok(entry) => (StatusCode::CREATED, Json(json!({ "selection": entry }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn clear_selected_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.clear_selected(user) {
        Ok(()) => success(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_selected_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
    Path(school_id): Path<u64>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.remove_selected(user, SchoolId(school_id)) {
        Ok(()) => success(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reorder_selected_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
    Json(request): Json<ReorderRequest>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.reorder_selected(user, &request.schools) {
        Ok(schools) => (StatusCode::OK, Json(json!({ "schools": schools }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_snapshot_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.snapshot(user) {
        Ok(data) => (StatusCode::OK, Json(json!({ "data": data }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_snapshot_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
    Json(snapshot): Json<CalculatorSnapshot>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.save_snapshot(user, snapshot) {
        Ok(data) => (StatusCode::OK, Json(json!({ "data": data }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluate_handler<R>(
    State(service): State<Arc<CalculatorService<R>>>,
    headers: HeaderMap,
    Json(request): Json<EvaluationRequest>,
) -> Response
where
    R: SchoolRepository + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match service.evaluate(user, request) {
        Ok(evaluation) => (StatusCode::OK, Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn acting_user(headers: &HeaderMap) -> Result<UserId, Response> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(UserId::default());
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(UserId)
        .ok_or_else(|| {
            let payload = json!({ "error": format!("invalid {USER_HEADER} header") });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        })
}

fn success() -> Response {
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

/// HTTP status for a service failure, shared with [`crate::error::AppError`].
pub(crate) fn status_for(error: &CalculatorServiceError) -> StatusCode {
    match error {
        CalculatorServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CalculatorServiceError::MissingInputs => StatusCode::BAD_REQUEST,
        CalculatorServiceError::SchoolNotFound(_)
        | CalculatorServiceError::NotSelected(_)
        | CalculatorServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CalculatorServiceError::AlreadySelected(_)
        | CalculatorServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CalculatorServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: CalculatorServiceError) -> Response {
    let status = status_for(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
