use crate::entities::*;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::*;

pub mod api;

pub use crate::entities::sea_orm_active_enums::TaskStatus;

/// The value clients send when a task date was never filled in.
pub fn unset_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Returns `true` if the date is the "not set" sentinel.
pub fn is_unset_date(date: &NaiveDateTime) -> bool {
    *date == unset_date()
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i32,
    title: String,
    description: Option<String>,
    date: NaiveDateTime,
    status: TaskStatus,
}

impl Task {
    pub fn new(
        id: i32,
        title: String,
        description: Option<String>,
        date: NaiveDateTime,
        status: TaskStatus,
    ) -> Self {
        Self {
            id,
            title,
            description,
            date,
            status,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the date of the task.
    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    /// Returns the status of the task.
    pub fn status(&self) -> TaskStatus {
        self.status
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description,
            model.date,
            model.status,
        )
    }
}

/// Client-supplied fields of a task, used for both creation and full replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl TaskDraft {
    fn checked_date(&self) -> Result<NaiveDateTime, TaskServiceError> {
        match self.date {
            Some(date) if !is_unset_date(&date) => Ok(date),
            _ => Err(TaskServiceError::MissingDate),
        }
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// No task exists with the given ID.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// The draft carries no date or the unset sentinel.
    #[error("A data da tarefa não pode ser vazia")]
    MissingDate,
    /// The status is rejected by the creation policy.
    #[error("Status pode ser apenas Pendente ou Finalizado")]
    StatusNotAllowed(TaskStatus),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Shared state for the task routes.
#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: sea_orm::DatabaseConnection,
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Retrieves a task by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Task`, or `TaskNotFound` if no row has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        let model = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        Ok(Task::from(model))
    }

    /// Retrieves all tasks in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        self.find_tasks(task::Entity::find()).await
    }

    /// Retrieves the tasks whose title contains `fragment`.
    ///
    /// `%` and `_` in the fragment match literally. Case sensitivity follows
    /// the store's `LIKE` semantics.
    #[tracing::instrument(skip(self))]
    pub async fn find_tasks_by_title(&self, fragment: &str) -> Result<Vec<Task>, TaskServiceError> {
        let pattern = format!("%{}%", escape_like(fragment));
        self.find_tasks(
            task::Entity::find()
                .filter(Expr::col(task::Column::Title).like(LikeExpr::new(pattern).escape('\\'))),
        )
        .await
    }

    /// Retrieves the tasks dated on `day`, whatever their time of day.
    #[tracing::instrument(skip(self))]
    pub async fn find_tasks_by_date(&self, day: NaiveDate) -> Result<Vec<Task>, TaskServiceError> {
        let select =
            task::Entity::find().filter(task::Column::Date.gte(day.and_time(NaiveTime::MIN)));
        let select = match day.succ_opt() {
            Some(next_day) => select.filter(task::Column::Date.lt(next_day.and_time(NaiveTime::MIN))),
            // The last representable day has no successor; bound it by its last instant.
            None => select.filter(task::Column::Date.lte(NaiveDateTime::MAX)),
        };
        self.find_tasks(select).await
    }

    /// Retrieves the tasks with the given status.
    #[tracing::instrument(skip(self))]
    pub async fn find_tasks_by_status(
        &self,
        status: TaskStatus,
    ) -> Result<Vec<Task>, TaskServiceError> {
        self.find_tasks(task::Entity::find().filter(task::Column::Status.eq(status)))
            .await
    }

    /// Creates a new task.
    ///
    /// # Arguments
    ///
    /// * `draft` - Title, description, date and status of the new task.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Task` with its store-assigned ID,
    /// `MissingDate` if the date is unset, or `StatusNotAllowed` if the
    /// status is rejected.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, TaskServiceError> {
        let date = draft.checked_date()?;

        // Rejects exactly the two statuses the error message names as the valid ones.
        if matches!(draft.status, TaskStatus::Pending | TaskStatus::Done) {
            return Err(TaskServiceError::StatusNotAllowed(draft.status));
        }

        let active_model = task::ActiveModel {
            title: ActiveValue::Set(draft.title),
            description: ActiveValue::Set(draft.description),
            date: ActiveValue::Set(date),
            status: ActiveValue::Set(draft.status),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Task::from(created_model))
    }

    /// Replaces every mutable field of the task with the given ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to update. It is never changed.
    /// * `draft` - The replacement fields.
    ///
    /// # Returns
    ///
    /// A `Result` containing the updated `Task`, `TaskNotFound` if no row has
    /// this ID, or `MissingDate` if the replacement date is unset.
    #[tracing::instrument(skip(self))]
    pub async fn update_task_by_id(
        &self,
        id: i32,
        draft: TaskDraft,
    ) -> Result<Task, TaskServiceError> {
        let task_to_update = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let date = draft.checked_date()?;

        let mut active_model: task::ActiveModel = task_to_update.into();
        active_model.title = ActiveValue::Set(draft.title);
        active_model.description = ActiveValue::Set(draft.description);
        active_model.date = ActiveValue::Set(date);
        active_model.status = ActiveValue::Set(draft.status);
        let updated_model = active_model.update(self.db).await?;

        Ok(Task::from(updated_model))
    }

    /// Deletes a task by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted `Task`, or `TaskNotFound` if no row has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        let task_to_delete = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;

        let deleted = Task::from(task_to_delete);
        task::Entity::delete_by_id(id).exec(self.db).await?;
        tracing::info!("Deleted task {}", id);
        Ok(deleted)
    }

    async fn find_tasks(&self, select: Select<task::Entity>) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = select
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }
}

/// Escapes the `LIKE` wildcards and the escape character itself.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
