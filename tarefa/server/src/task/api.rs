use crate::task::{Task, TaskDraft, TaskService, TaskServiceError, TaskState, TaskStatus, unset_date};
use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

const NO_TASKS_MESSAGE: &str = "Nenhuma tarefa cadastrada";
const TITLE_NOT_FOUND_MESSAGE: &str = "Tarefa não encontrada";
const UPDATE_FAILED_MESSAGE: &str = "Falha ao atualizar";
const DELETE_FAILED_MESSAGE: &str = "Falha ao excluir a tarefa";
const INTERNAL_ERROR_MESSAGE: &str = "Erro interno ao processar a requisição";

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Store-assigned identifier
    pub id: i32,
    /// Title of the task
    #[serde(rename = "titulo")]
    pub title: String,
    /// Optional free-form description
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    /// Date and time the task is planned for
    #[serde(rename = "data")]
    pub date: NaiveDateTime,
    pub status: TaskStatus,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            date: task.date(),
            status: task.status(),
        }
    }
}

/// JSON request body for creating or replacing a task. Any `id` field is ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskPayload {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    /// Must be present and different from `0001-01-01T00:00:00`
    #[serde(rename = "data")]
    pub date: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl From<TaskPayload> for TaskDraft {
    fn from(payload: TaskPayload) -> Self {
        Self {
            title: payload.title,
            description: payload.description,
            date: payload.date,
            status: payload.status,
        }
    }
}

/// JSON body of 400 and 500 responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub erro: String,
}

impl ErrorResponse {
    pub fn new(erro: String) -> Self {
        Self { erro }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleQuery {
    /// Fragment the title must contain
    pub titulo: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Day to search, as `YYYY-MM-DD` or an ISO date-time
    pub data: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub status: TaskStatus,
}

/// Errors returned by the task handlers.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    /// 404 with an empty body.
    #[error("Not found")]
    NotFound,
    /// 404 with a plain-text message.
    #[error("{0}")]
    NotFoundWithMessage(String),
    /// 400 with an `ErrorResponse` body.
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(#[source] TaskServiceError),
}

impl From<TaskServiceError> for TaskApiError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::TaskNotFound(_) => TaskApiError::NotFound,
            TaskServiceError::MissingDate | TaskServiceError::StatusNotAllowed(_) => {
                TaskApiError::BadRequest(err.to_string())
            }
            TaskServiceError::Database(_) => TaskApiError::Internal(err),
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        match self {
            TaskApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            TaskApiError::NotFoundWithMessage(message) => {
                (StatusCode::NOT_FOUND, message).into_response()
            }
            TaskApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            TaskApiError::Internal(err) => {
                tracing::error!("Task request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(INTERNAL_ERROR_MESSAGE.to_string())),
                )
                    .into_response()
            }
        }
    }
}

/// Maps `TaskNotFound` to a 404 carrying `message`, everything else as usual.
fn not_found_with(message: &str) -> impl FnOnce(TaskServiceError) -> TaskApiError + '_ {
    move |err| match err {
        TaskServiceError::TaskNotFound(_) => TaskApiError::NotFoundWithMessage(message.to_string()),
        other => TaskApiError::from(other),
    }
}

/// An empty list is answered with 404 and the given message.
fn non_empty(
    tasks: Vec<Task>,
    message: impl FnOnce() -> String,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    if tasks.is_empty() {
        return Err(TaskApiError::NotFoundWithMessage(message()));
    }
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// A bare date is read as midnight of that day.
fn parse_date_query(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|day| day.and_time(NaiveTime::MIN))
        .or_else(|| raw.parse::<NaiveDateTime>().ok())
}

fn read_payload(
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<TaskDraft, TaskApiError> {
    let Json(payload) = payload.map_err(|rejection| TaskApiError::BadRequest(rejection.body_text()))?;
    Ok(payload.into())
}

/// Handler for GET /Tarefa/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 404, description = "No task with this ID")
    ),
    tag = "Tarefa"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let task = TaskService::new(&state.db).get_task_by_id(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for GET /Tarefa/ObterTodos.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterTodos",
    responses(
        (status = 200, description = "All tasks in insertion order", body = [TaskJson]),
        (status = 404, description = "No task registered", body = String, content_type = "text/plain")
    ),
    tag = "Tarefa"
)]
pub async fn get_all_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = TaskService::new(&state.db).get_all_tasks().await?;
    non_empty(tasks, || NO_TASKS_MESSAGE.to_string())
}

/// Handler for GET /Tarefa/ObterPorTitulo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorTitulo",
    params(TitleQuery),
    responses(
        (status = 200, description = "Tasks whose title contains the fragment", body = [TaskJson]),
        (status = 404, description = "No matching task", body = String, content_type = "text/plain")
    ),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_title_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = TaskService::new(&state.db)
        .find_tasks_by_title(&query.titulo)
        .await?;
    non_empty(tasks, || TITLE_NOT_FOUND_MESSAGE.to_string())
}

/// Handler for GET /Tarefa/ObterPorData.
///
/// Without `data` the unset sentinel day is searched, which never matches a stored task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorData",
    params(DateQuery),
    responses(
        (status = 200, description = "Tasks dated on that day", body = [TaskJson]),
        (status = 400, description = "Unparsable date", body = ErrorResponse),
        (status = 404, description = "No task on that day", body = String, content_type = "text/plain")
    ),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_date_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let date = match query.data.as_deref() {
        Some(raw) => parse_date_query(raw)
            .ok_or_else(|| TaskApiError::BadRequest(format!("Data inválida: {}", raw)))?,
        None => unset_date(),
    };
    let tasks = TaskService::new(&state.db)
        .find_tasks_by_date(date.date())
        .await?;
    non_empty(tasks, || format!("Data {} não encontrada", date))
}

/// Handler for GET /Tarefa/ObterPorStatus.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorStatus",
    params(StatusQuery),
    responses(
        (status = 200, description = "Tasks with that status", body = [TaskJson]),
        (status = 404, description = "No task with that status", body = String, content_type = "text/plain")
    ),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_status_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let status = query.status;
    let tasks = TaskService::new(&state.db)
        .find_tasks_by_status(status)
        .await?;
    non_empty(tasks, || format!("Nenhuma tarefa com status {}", status))
}

/// Handler for POST /Tarefa.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/Tarefa",
    request_body = TaskPayload,
    responses(
        (status = 201, description = "Task created", body = TaskJson,
            headers(("location" = String, description = "Path of the created task"))),
        (status = 400, description = "Unset date, rejected status or malformed body", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<impl IntoResponse, TaskApiError> {
    let draft = read_payload(payload)?;
    let task = TaskService::new(&state.db).create_task(draft).await?;
    let location = format!("/Tarefa/{}", task.id());

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TaskJson::from(task)),
    ))
}

/// Handler for PUT /Tarefa/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "Task identifier")),
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Task replaced", body = TaskJson),
        (status = 400, description = "Unset date or malformed body", body = ErrorResponse),
        (status = 404, description = "No task with this ID", body = String, content_type = "text/plain")
    ),
    tag = "Tarefa"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let draft = read_payload(payload)?;
    let task = TaskService::new(&state.db)
        .update_task_by_id(id, draft)
        .await
        .map_err(not_found_with(UPDATE_FAILED_MESSAGE))?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /Tarefa/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "Task identifier")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No task with this ID", body = String, content_type = "text/plain")
    ),
    tag = "Tarefa"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, TaskApiError> {
    TaskService::new(&state.db)
        .delete_task_by_id(id)
        .await
        .map_err(not_found_with(DELETE_FAILED_MESSAGE))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_task_handler,
        get_all_tasks_handler,
        get_tasks_by_title_handler,
        get_tasks_by_date_handler,
        get_tasks_by_status_handler,
        create_task_handler,
        update_task_handler,
        delete_task_handler,
    ),
    components(schemas(TaskJson, TaskPayload, TaskStatus, ErrorResponse)),
    tags((name = "Tarefa", description = "Task CRUD endpoints"))
)]
pub struct TaskApiDoc;

/// Creates and returns the task router with all task routes.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/Tarefa", post(create_task_handler))
        .route("/Tarefa/ObterTodos", get(get_all_tasks_handler))
        .route("/Tarefa/ObterPorTitulo", get(get_tasks_by_title_handler))
        .route("/Tarefa/ObterPorData", get(get_tasks_by_date_handler))
        .route("/Tarefa/ObterPorStatus", get(get_tasks_by_status_handler))
        .route(
            "/Tarefa/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn can_parse_plain_and_timestamped_dates() {
        let midnight: NaiveDateTime = "2024-01-01T00:00:00".parse().unwrap();
        let evening: NaiveDateTime = "2024-01-01T18:45:00".parse().unwrap();
        assert_eq!(parse_date_query("2024-01-01"), Some(midnight));
        assert_eq!(parse_date_query("2024-01-01T18:45:00"), Some(evening));
        assert_eq!(
            parse_date_query("+262142-12-31"),
            Some(NaiveDate::MAX.and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_date_query("01/01/2024"), None);
    }

    #[tokio::test]
    async fn can_answer_not_found_with_plain_message() {
        let response =
            TaskApiError::NotFoundWithMessage(NO_TASKS_MESSAGE.to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Nenhuma tarefa cadastrada");
    }

    #[tokio::test]
    async fn can_answer_validation_errors_with_error_object() {
        let response = TaskApiError::from(TaskServiceError::MissingDate).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            r#"{"erro":"A data da tarefa não pode ser vazia"}"#
        );
    }

    #[tokio::test]
    async fn can_hide_database_errors_behind_internal_server_error() {
        let err = TaskServiceError::Database(sea_orm::DbErr::Custom("connection reset".into()));
        let response = TaskApiError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            r#"{"erro":"Erro interno ao processar a requisição"}"#
        );
    }

    #[test]
    fn can_map_missing_task_to_operation_message() {
        let err = not_found_with(UPDATE_FAILED_MESSAGE)(TaskServiceError::TaskNotFound(7));
        assert!(matches!(
            err,
            TaskApiError::NotFoundWithMessage(message) if message == "Falha ao atualizar"
        ));
    }
}
