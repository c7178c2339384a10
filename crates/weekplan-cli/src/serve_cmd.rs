use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use weekplan_core::render::export;
use weekplan_core::schema::response_schema;
use weekplan_core::session::{PendingRequest, SessionStatus};
use weekplan_core::{
    Completion, DayTable, DocumentError, GenerationInvoker, LintReport, PlanError, PlanSession,
    RuleSet, SourceDocument, WeeklyPlanRecord, lint_record,
};

/// Largest accepted request body. Base64 inflates the 10 MiB document limit
/// by a third; anything past this is rejected by axum with 413.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::Validation(_) => StatusCode::BAD_REQUEST,
            PlanError::Busy(_) | PlanError::StaleRequest(_) => StatusCode::CONFLICT,
            PlanError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            PlanError::Backend(_) | PlanError::EmptyResponse | PlanError::MalformedResult(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        let (status, kind) = match &err {
            DocumentError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "too_large"),
            DocumentError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            DocumentError::InvalidEncoding(_) => (StatusCode::BAD_REQUEST, "invalid_encoding"),
            DocumentError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: format!("request task failed: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message, "kind": self.kind });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DocumentUpload {
    /// Base64 payload, optionally as a `data:` URL.
    pub data: String,
    pub media_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RulesUpdate {
    /// Blank restores the default rule-set.
    #[serde(default)]
    pub rules: String,
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub status: SessionStatus,
    pub record: WeeklyPlanRecord,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    #[serde(flatten)]
    pub completion: Completion,
    pub status: SessionStatus,
}

// ---------------------------------------------------------------------------
// State and router
// ---------------------------------------------------------------------------

/// Shared server state. The session lock is held only to open and close a
/// request, never across the backend call.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<PlanSession>>,
    pub invoker: Arc<GenerationInvoker>,
}

impl AppState {
    pub fn new(session: PlanSession, invoker: GenerationInvoker) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            invoker: Arc::new(invoker),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/plan", get(get_plan))
        .route("/api/document", put(put_document))
        .route("/api/rules", put(put_rules))
        .route("/api/generate", post(generate))
        .route("/api/refine", post(refine))
        .route("/api/day/{index}", put(select_day))
        .route("/api/days/{index}/export", get(export_day))
        .route("/api/lint", get(get_lint))
        .route("/api/reset", post(reset))
        .route("/api/schema", get(get_schema))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("weekplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("weekplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let session = state.session.lock().await;
    let table = DayTable::project(session.record(), session.selected_day())?;
    let days = session
        .record()
        .daily_plans
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let label = export::escape_html(&format!("{} {}", d.day, d.date));
            if i == session.selected_day() {
                format!("<strong>{label}</strong>")
            } else {
                label
            }
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let html = format!(
        "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>weekplan</title></head><body>\
<p>state: {state} | {days}</p>\
{table}\
</body></html>",
        state = session.state(),
        table = export::clipboard_html(&table),
    );
    Ok(Html(html))
}

async fn get_plan(State(state): State<AppState>) -> Json<PlanResponse> {
    let session = state.session.lock().await;
    Json(PlanResponse {
        status: session.status(),
        record: session.record().clone(),
    })
}

async fn put_document(
    State(state): State<AppState>,
    Json(upload): Json<DocumentUpload>,
) -> Result<Json<SessionStatus>, AppError> {
    let name = upload.name.unwrap_or_else(|| "upload".to_string());
    let document = SourceDocument::from_base64(&upload.data, &upload.media_type, name)?;
    let mut session = state.session.lock().await;
    session.attach_document(document)?;
    Ok(Json(session.status()))
}

async fn put_rules(
    State(state): State<AppState>,
    Json(update): Json<RulesUpdate>,
) -> Result<Json<SessionStatus>, AppError> {
    let mut session = state.session.lock().await;
    session.set_rules(RuleSet::new(update.rules))?;
    Ok(Json(session.status()))
}

async fn generate(State(state): State<AppState>) -> Result<Json<CompletionResponse>, AppError> {
    let pending = state.session.lock().await.begin_generation()?;
    finish(state, pending).await
}

async fn refine(
    State(state): State<AppState>,
    Json(body): Json<RefineRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    let pending = state
        .session
        .lock()
        .await
        .begin_refinement(&body.instruction)?;
    finish(state, pending).await
}

/// Run the backend call with the session unlocked, then close the request.
///
/// The work runs on its own task so the request still completes, and the
/// session leaves its in-flight state, if the client disconnects.
async fn finish(
    state: AppState,
    pending: PendingRequest,
) -> Result<Json<CompletionResponse>, AppError> {
    let task = tokio::spawn(async move {
        let outcome = state.invoker.invoke(&pending.request).await;
        let mut session = state.session.lock().await;
        let completion = session.complete(pending.ticket, outcome)?;
        Ok::<_, PlanError>(CompletionResponse {
            completion,
            status: session.status(),
        })
    });
    Ok(Json(task.await??))
}

async fn select_day(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<SessionStatus>, AppError> {
    let mut session = state.session.lock().await;
    session.select_day(index)?;
    Ok(Json(session.status()))
}

async fn export_day(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Html<String>, AppError> {
    let session = state.session.lock().await;
    let table = DayTable::project(session.record(), index)?;
    Ok(Html(export::clipboard_html(&table)))
}

async fn get_lint(State(state): State<AppState>) -> Json<LintReport> {
    let session = state.session.lock().await;
    Json(lint_record(session.record()))
}

async fn reset(State(state): State<AppState>) -> Json<SessionStatus> {
    let mut session = state.session.lock().await;
    session.reset();
    Json(session.status())
}

async fn get_schema() -> Json<serde_json::Value> {
    Json(response_schema().clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use weekplan_core::{PlanSession, PlanState};
    use weekplan_test_utils::{
        ScriptedBackend, easier_tuesday, keyless_invoker, sample_record, sample_record_json,
        scripted_invoker, small_png,
    };

    use super::{AppState, build_router};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn state_with(backend: Arc<ScriptedBackend>, with_document: bool) -> AppState {
        let mut session = PlanSession::new();
        if with_document {
            session.attach_document(small_png()).unwrap();
        }
        AppState::new(session, scripted_invoker(backend))
    }

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let app = build_router(state.clone());
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 4 * 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 4 * 1_048_576)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn index_returns_html() {
        let state = state_with(ScriptedBackend::new(), false);
        let resp = send(&state, "GET", "/", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .expect("should have content-type header")
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.contains("text/html"), "got: {content_type}");
        assert!(body_text(resp).await.contains("一日活动计划"));
    }

    #[tokio::test]
    async fn plan_starts_as_placeholder() {
        let state = state_with(ScriptedBackend::new(), false);
        let json = body_json(send(&state, "GET", "/api/plan", None).await).await;
        assert_eq!(json["status"]["state"], "idle");
        assert_eq!(json["record"]["dailyPlans"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn generate_then_refine() {
        let backend = ScriptedBackend::new();
        let state = state_with(backend.clone(), true);

        backend.push_text(sample_record_json());
        let resp = send(&state, "POST", "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["mode"], "initial");
        assert_eq!(json["status"]["state"], "generated");
        assert_eq!(json["lint"]["issues"], json!([]));

        backend.push_record(&easier_tuesday(&sample_record()));
        let resp = send(
            &state,
            "POST",
            "/api/refine",
            Some(json!({ "instruction": "降低周二体育活动难度" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["mode"], "refinement");
        assert_eq!(json["diff"]["days"][0]["index"], 1);
        assert_eq!(json["status"]["refinements"], 1);
    }

    #[tokio::test]
    async fn generate_without_document_is_bad_request() {
        let state = state_with(ScriptedBackend::new(), false);
        let resp = send(&state, "POST", "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["kind"], "validation");
    }

    #[tokio::test]
    async fn blank_refinement_is_bad_request() {
        let backend = ScriptedBackend::new();
        let state = state_with(backend.clone(), true);
        backend.push_text(sample_record_json());
        send(&state, "POST", "/api/generate", None).await;

        let resp = send(&state, "POST", "/api/refine", Some(json!({ "instruction": "  " }))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_service_unavailable() {
        let backend = ScriptedBackend::new();
        let mut session = PlanSession::new();
        session.attach_document(small_png()).unwrap();
        let state = AppState::new(session, keyless_invoker(backend.clone()));

        let resp = send(&state, "POST", "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["kind"], "configuration");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_result_is_bad_gateway() {
        let backend = ScriptedBackend::new();
        let state = state_with(backend.clone(), true);
        backend.push_text("not json");
        let resp = send(&state, "POST", "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(send(&state, "GET", "/api/plan", None).await).await;
        assert_eq!(json["status"]["state"], "idle");
        assert_eq!(json["status"]["last_error"]["kind"], "malformed_result");
    }

    #[tokio::test]
    async fn concurrent_generate_is_conflict_and_reads_stay_available() {
        let backend = ScriptedBackend::gated();
        let state = state_with(backend.clone(), true);

        let first = {
            let state = state.clone();
            tokio::spawn(async move { send(&state, "POST", "/api/generate", None).await })
        };
        // Wait until the first request holds the gate.
        while !state.session.lock().await.is_in_flight() {
            tokio::task::yield_now().await;
        }

        let resp = send(&state, "POST", "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["kind"], "busy");

        let resp = send(&state, "GET", "/api/plan", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"]["state"], "generating");

        backend.push_text(sample_record_json());
        backend.release();
        let resp = first.await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn dropped_client_still_completes_the_request() {
        let backend = ScriptedBackend::gated();
        let state = state_with(backend.clone(), true);

        let first = {
            let state = state.clone();
            tokio::spawn(async move { send(&state, "POST", "/api/generate", None).await })
        };
        while !state.session.lock().await.is_in_flight() {
            tokio::task::yield_now().await;
        }

        // The client goes away while the backend call is pending.
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        backend.push_text(sample_record_json());
        backend.release();
        while state.session.lock().await.is_in_flight() {
            tokio::task::yield_now().await;
        }
        assert_eq!(state.session.lock().await.state(), PlanState::Generated);

        backend.push_text(sample_record_json());
        backend.release();
        let resp = send(&state, "POST", "/api/generate", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn document_upload_checks_size_and_type() {
        let state = state_with(ScriptedBackend::new(), false);
        let encode = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);

        let resp = send(
            &state,
            "PUT",
            "/api/document",
            Some(json!({ "data": encode(b"png"), "media_type": "image/png", "name": "w.png" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["document"]["display_name"], "w.png");

        let resp = send(
            &state,
            "PUT",
            "/api/document",
            Some(json!({ "data": encode(b"doc"), "media_type": "application/msword" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let big = vec![0u8; 11 * 1024 * 1024];
        let resp = send(
            &state,
            "PUT",
            "/api/document",
            Some(json!({ "data": encode(&big), "media_type": "image/png" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn day_selection_and_export() {
        let backend = ScriptedBackend::new();
        let state = state_with(backend.clone(), true);
        backend.push_text(sample_record_json());
        send(&state, "POST", "/api/generate", None).await;

        let resp = send(&state, "PUT", "/api/day/2", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["selected_day"], 2);

        let resp = send(&state, "PUT", "/api/day/9", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&state, "GET", "/api/days/4/export", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("周五 2025.10.17"));
        assert!(html.contains("SimSun"));
    }

    #[tokio::test]
    async fn rules_lint_reset_and_schema() {
        let state = state_with(ScriptedBackend::new(), false);

        let resp = send(&state, "PUT", "/api/rules", Some(json!({ "rules": "自定义规则" }))).await;
        assert_eq!(body_json(resp).await["default_rules"], false);

        let lint = body_json(send(&state, "GET", "/api/lint", None).await).await;
        assert_eq!(lint["issues"][0]["kind"], "missing_marker");

        let resp = send(&state, "POST", "/api/reset", None).await;
        assert_eq!(body_json(resp).await["state"], "idle");

        let schema = body_json(send(&state, "GET", "/api/schema", None).await).await;
        assert_eq!(schema["properties"]["dailyPlans"]["type"], "ARRAY");
    }
}
