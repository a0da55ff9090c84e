use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::{NewApplicant, RecordField};
use crate::services::snapshot;
use crate::web::{views, AppState};

/// Generic "not found / not ready" answer of the check routes
fn not_ready() -> Response {
    (StatusCode::BAD_REQUEST, "Record not found").into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub year: Option<String>,
}

/// GET /: all records, or one program year
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Html<String>> {
    let years = state.store.list_years().await?;
    let year = query.year.as_deref().filter(|y| !y.is_empty());
    let records = match year {
        Some(year) => state.store.list_by_year(year).await?,
        None => state.store.list_all().await?,
    };
    Ok(Html(views::index(&records, &years, year)))
}

/// GET /user/create
pub async fn create_form() -> Html<String> {
    Html(views::user_form(None))
}

/// POST /user/create
pub async fn create_user(
    State(state): State<AppState>,
    Form(applicant): Form<NewApplicant>,
) -> Response {
    let applicant = match applicant.validate() {
        Ok(applicant) => applicant,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Html(views::user_form(Some(&e.to_string()))))
                .into_response()
        }
    };
    match state.store.create(&applicant).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /check/{user_id}: start a cycle and show its CAPTCHA
pub async fn start_check(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match state.coordinator.start_cycle(user_id).await {
        Ok(_detached) => {}
        Err(e @ AppError::CycleInProgress { .. }) => return e.into_response(),
        Err(e) => {
            warn!("[user #{}] could not start check: {}", user_id, e);
            return not_ready();
        }
    }

    match state.coordinator.await_captcha(user_id).await {
        Ok(true) => {}
        Ok(false) => return not_ready(),
        Err(e) => {
            warn!("[user #{}] waiting for CAPTCHA failed: {}", user_id, e);
            return not_ready();
        }
    }

    match state.store.get(user_id).await {
        Ok(Some(record)) if record.is_set(RecordField::CaptchaImage) => {
            Html(views::captcha(&record)).into_response()
        }
        // already answered or finished
        Ok(Some(_)) => Redirect::to("/").into_response(),
        Ok(None) => not_ready(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CaptchaForm {
    pub captcha: String,
}

/// POST /check/{user_id}: hand over the CAPTCHA answer
pub async fn submit_check(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Form(form): Form<CaptchaForm>,
) -> Response {
    match state.coordinator.submit_answer(user_id, &form.captcha).await {
        Ok(true) => Redirect::to("/").into_response(),
        Ok(false) => not_ready(),
        Err(e) => {
            warn!("[user #{}] CAPTCHA submission failed: {}", user_id, e);
            not_ready()
        }
    }
}

/// GET /user/screenshot/{user_id}
pub async fn screenshot(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    let record = match state.store.require(user_id).await {
        Ok(record) => record,
        Err(e) => return e.into_response(),
    };
    match record.screenshot {
        Some(bytes) if !bytes.is_empty() => (
            [
                (header::CONTENT_TYPE, snapshot::mime_type(&bytes)),
                (header::CONTENT_DISPOSITION, "inline; filename=\"screenshot.png\""),
            ],
            bytes,
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, "No screenshot yet").into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let database = match state.store.ping().await {
        Ok(()) => ComponentHealth {
            status: "ok".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(_) => ComponentHealth {
            status: "error".to_string(),
            latency_ms: None,
        },
    };

    let healthy = database.status == "ok";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: HealthChecks { database },
        }),
    )
}
