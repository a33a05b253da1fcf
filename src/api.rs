//! HTTP API for pdca-desk

use axum::{
    Extension, Json, Router,
    extract::{FromRequest, Path, Query, Request, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::auth::{self, Sessions};
use crate::calendar::{DateRange, MonthId, WeekId};
use crate::db::Database;
use crate::error::PdcaError;
use crate::export;
use crate::models::{
    NewUser, PasswordRecovery, Plan, PlanPeriod, Task, TaskInput, UserProfile, parse_timestamp,
};
use crate::report::{self, ReportData};
use crate::stats::TaskStatistics;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Paths reachable without a session token
const PUBLIC_PATHS: [&str; 4] = [
    "/health",
    "/api/v1/auth/register",
    "/api/v1/auth/login",
    "/api/v1/auth/recover",
];

/// Application state shared across handlers
pub struct AppState {
    pub db: Database,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db,
            sessions: Sessions::new(),
        })
    }
}

/// Session owner, attached to the request by `auth_middleware`
#[derive(Debug, Clone)]
struct CurrentUser {
    id: i64,
    token: String,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/recover", post(recover_password))
        .route("/api/v1/me", get(me))
        .route("/api/v1/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/v1/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/api/v1/plans/weekly/{week}",
            get(get_weekly_plan).put(put_weekly_plan),
        )
        .route(
            "/api/v1/plans/monthly/{month}",
            get(get_monthly_plan).put(put_monthly_plan),
        )
        .route("/api/v1/stats/weekly/{week}", get(weekly_stats))
        .route("/api/v1/stats/monthly/{month}", get(monthly_stats))
        .route("/api/v1/reports/weekly/{week}", get(weekly_report))
        .route("/api/v1/reports/weekly/{week}/export", get(export_weekly_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `Json` body extractor whose rejections use the API error body
struct AppJson<T>(T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Health check endpoint (no auth required)
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pdca-desk",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Auth middleware - resolves the Bearer session token to a user
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let token = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Missing or invalid Authorization header" })),
            )
                .into_response();
        }
    };

    let Some(id) = state.sessions.user_id(&token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Invalid or expired session" })),
        )
            .into_response();
    };

    request.extensions_mut().insert(CurrentUser { id, token });
    next.run(request).await
}

// Accounts

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserProfile,
}

async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(new_user): AppJson<NewUser>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let user = auth::register(&state.db, &new_user)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, user) = state
        .sessions
        .login(&state.db, &request.username, &request.password)?;
    Ok(Json(LoginResponse { token, user }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> StatusCode {
    state.sessions.logout(&user.token);
    tracing::info!(user_id = user.id, "Session closed");
    StatusCode::NO_CONTENT
}

async fn recover_password(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<PasswordRecovery>,
) -> Result<StatusCode, ApiError> {
    let user = auth::recover_password(&state.db, &request)?;
    let revoked = state.sessions.revoke_user(user.id);
    tracing::info!(user_id = user.id, revoked, "Sessions revoked after password reset");
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .db
        .get_user(user.id)?
        .ok_or_else(|| PdcaError::not_found(format!("User {}", user.id)))?;
    Ok(Json(profile))
}

// Tasks

/// Optional listing window. Date-only bounds cover the whole day.
#[derive(Debug, Deserialize)]
struct TaskQuery {
    start: Option<String>,
    end: Option<String>,
}

impl TaskQuery {
    fn bounds(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime)>, PdcaError> {
        match (self.start.as_deref(), self.end.as_deref()) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                let start = parse_timestamp(start)?;
                let end = match NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d") {
                    Ok(day) => DateRange { start: day, end: day }.timestamp_bounds().1,
                    Err(_) => parse_timestamp(end)?,
                };
                if end < start {
                    return Err(PdcaError::validation("end must not be before start"));
                }
                Ok(Some((start, end)))
            }
            _ => Err(PdcaError::validation(
                "start and end must be given together",
            )),
        }
    }
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.db.list_tasks(user.id, query.bounds()?)?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    AppJson(input): AppJson<TaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.db.create_task(user.id, &input)?;
    tracing::info!(user_id = user.id, task_id = %task.id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .db
        .get_task(user.id, id)?
        .ok_or_else(|| PdcaError::not_found(format!("Task {id}")))?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<TaskInput>,
) -> Result<Json<Task>, ApiError> {
    let task = state.db.update_task(user.id, id, &input)?;
    tracing::info!(user_id = user.id, task_id = %id, status = task.status.as_str(), "Task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_task(user.id, id)?;
    tracing::info!(user_id = user.id, task_id = %id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

// Plans

#[derive(Debug, Deserialize)]
struct PlanBody {
    content: String,
}

async fn get_weekly_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(week): Path<String>,
) -> Result<Json<Option<Plan>>, ApiError> {
    let week: WeekId = week.parse()?;
    Ok(Json(state.db.get_plan(user.id, PlanPeriod::Week(week))?))
}

async fn put_weekly_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(week): Path<String>,
    AppJson(body): AppJson<PlanBody>,
) -> Result<Json<Plan>, ApiError> {
    let week: WeekId = week.parse()?;
    let plan = state
        .db
        .upsert_plan(user.id, PlanPeriod::Week(week), &body.content)?;
    Ok(Json(plan))
}

async fn get_monthly_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(month): Path<String>,
) -> Result<Json<Option<Plan>>, ApiError> {
    let month: MonthId = month.parse()?;
    Ok(Json(state.db.get_plan(user.id, PlanPeriod::Month(month))?))
}

async fn put_monthly_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(month): Path<String>,
    AppJson(body): AppJson<PlanBody>,
) -> Result<Json<Plan>, ApiError> {
    let month: MonthId = month.parse()?;
    let plan = state
        .db
        .upsert_plan(user.id, PlanPeriod::Month(month), &body.content)?;
    Ok(Json(plan))
}

// Statistics and reports

async fn weekly_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(week): Path<String>,
) -> Result<Json<TaskStatistics>, ApiError> {
    let week: WeekId = week.parse()?;
    Ok(Json(report::weekly_statistics(&state.db, user.id, week)?))
}

async fn monthly_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(month): Path<String>,
) -> Result<Json<TaskStatistics>, ApiError> {
    let month: MonthId = month.parse()?;
    Ok(Json(report::monthly_statistics(&state.db, user.id, month)?))
}

async fn weekly_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(week): Path<String>,
) -> Result<Json<ReportData>, ApiError> {
    let week: WeekId = week.parse()?;
    Ok(Json(report::build_weekly_report(&state.db, user.id, week)?))
}

async fn export_weekly_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(week): Path<String>,
) -> Result<Response, ApiError> {
    let week: WeekId = week.parse()?;
    let data = report::build_weekly_report(&state.db, user.id, week)?;
    let bytes = export::render_weekly_report(&data)?;

    let disposition = format!("attachment; filename=\"{}\"", export::file_name(&week));
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// API error type
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return rejection.status();
        }
        match self.0.downcast_ref::<PdcaError>() {
            Some(PdcaError::InvalidPeriod { .. } | PdcaError::Validation { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Some(PdcaError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Some(PdcaError::Unauthorized { .. }) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self.0.downcast_ref::<JsonRejection>() {
            Some(rejection) => rejection.body_text(),
            None => self.0.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(error = %message, "API error");
        } else {
            tracing::debug!(error = %message, status = status.as_u16(), "Request rejected");
        }
        (
            status,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let db = Database::open_in_memory().unwrap();
        create_router(AppState::new(db))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn signed_in(app: &Router) -> String {
        let response = send(
            app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "username": "lee",
                "password": "pa55word",
                "name": "Lee",
                "email": "lee@example.com",
                "securityQuestion": "school",
                "securityAnswer": "Hanbit"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(
            app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "lee", "password": "pa55word" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn add_task(app: &Router, token: &str, title: &str, start: &str, end: &str, status: &str) -> Value {
        let response = send(
            app,
            "POST",
            "/api/v1/tasks",
            Some(token),
            Some(json!({
                "title": title,
                "start": start,
                "end": end,
                "status": status
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = send(&app(), "GET", "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_requires_session() {
        let app = app();
        let response = send(&app, "GET", "/api/v1/tasks", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, "GET", "/api/v1/tasks", Some("pds_bogus"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_login_is_unauthorized() {
        let app = app();
        signed_in(&app).await;
        let response = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "lee", "password": "wrong" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_task_crud() {
        let app = app();
        let token = signed_in(&app).await;

        let task = add_task(&app, &token, "Review", "2025-03-10T09:00", "2025-03-10T10:00", "PLAN").await;
        let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());

        let response = send(
            &app,
            "PUT",
            &uri,
            Some(&token),
            Some(json!({
                "title": "Review",
                "start": "2025-03-10T09:00:00",
                "end": "2025-03-10T11:00:00",
                "status": "COMPLETED",
                "doText": "done"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = json_body(response).await;
        assert_eq!(updated["status"], "COMPLETED");
        assert_eq!(updated["end"], "2025-03-10T11:00:00");

        let response = send(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_task_is_bad_request() {
        let app = app();
        let token = signed_in(&app).await;
        let response = send(
            &app,
            "POST",
            "/api/v1/tasks",
            Some(&token),
            Some(json!({
                "title": "Backwards",
                "start": "2025-03-10T10:00",
                "end": "2025-03-10T09:00"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_tasks_with_date_window() {
        let app = app();
        let token = signed_in(&app).await;
        add_task(&app, &token, "In", "2025-03-16T22:00", "2025-03-16T23:00", "PLAN").await;
        add_task(&app, &token, "Out", "2025-03-17T09:00", "2025-03-17T10:00", "PLAN").await;

        let response = send(
            &app,
            "GET",
            "/api/v1/tasks?start=2025-03-10&end=2025-03-16",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let tasks = json_body(response).await;
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert_eq!(tasks[0]["title"], "In");

        let response = send(&app, "GET", "/api/v1/tasks?start=2025-03-10", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plans_and_statistics() {
        let app = app();
        let token = signed_in(&app).await;

        let response = send(&app, "GET", "/api/v1/plans/weekly/2025-10", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, Value::Null);

        let response = send(
            &app,
            "PUT",
            "/api/v1/plans/monthly/2025-03",
            Some(&token),
            Some(json!({ "content": "Reduce scrap" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, "GET", "/api/v1/plans/monthly/2025-03", Some(&token), None).await;
        assert_eq!(json_body(response).await["content"], "Reduce scrap");

        add_task(&app, &token, "a", "2025-03-10T09:00", "2025-03-10T10:00", "COMPLETED").await;
        add_task(&app, &token, "b", "2025-03-11T09:00", "2025-03-11T10:00", "CANCELED").await;

        let response = send(&app, "GET", "/api/v1/stats/weekly/2025-10", Some(&token), None).await;
        let stats = json_body(response).await;
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["completionRate"], 50.0);
        assert_eq!(stats["rateBasis"], "allTasks");

        let response = send(&app, "GET", "/api/v1/plans/weekly/2025-99", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_weekly_report_and_export() {
        let app = app();
        let token = signed_in(&app).await;
        add_task(&app, &token, "Audit", "2025-03-12T09:00", "2025-03-12T10:00", "COMPLETED").await;

        let response = send(&app, "GET", "/api/v1/reports/weekly/2025-10", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json_body(response).await;
        assert_eq!(report["periodId"], "2025-10");
        assert_eq!(report["tasks"][0]["displayDate"], "3.12.");
        assert_eq!(report["statistics"]["completionRate"], 100.0);

        let response = send(
            &app,
            "GET",
            "/api/v1/reports/weekly/2025-10/export",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"PDCA_Report_2025-10.xlsx\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app();
        let token = signed_in(&app).await;

        let response = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
        assert_eq!(json_body(response).await["username"], "lee");

        let response = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_recover_password_resets_and_ends_sessions() {
        let app = app();
        let token = signed_in(&app).await;

        let recover = |answer: &str| {
            json!({
                "username": "lee",
                "securityQuestion": "school",
                "securityAnswer": answer,
                "newPassword": "n3w-pass"
            })
        };

        let response = send(&app, "POST", "/api/v1/auth/recover", None, Some(recover("wrong"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, "POST", "/api/v1/auth/recover", None, Some(recover("hanbit"))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", "/api/v1/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "lee", "password": "n3w-pass" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let app = app();
        let token = signed_in(&app).await;
        let response = send(
            &app,
            "POST",
            "/api/v1/tasks",
            Some(&token),
            Some(json!({
                "title": "Bad time",
                "start": "next tuesday",
                "end": "2025-03-10T09:00"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("invalid timestamp"));
    }
}
