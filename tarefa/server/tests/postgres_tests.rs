use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::DatabaseConnection;
use tarefa_server::task::{TaskDraft, TaskService, TaskServiceError, TaskStatus};
use testcontainers_modules::{postgres, testcontainers};

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_postgres_db(&container).await?;
    Ok(TestContext { db, container })
}

fn draft(title: &str, date: &str, status: TaskStatus) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: Some("Stored in Postgres".to_string()),
        date: Some(date.parse::<NaiveDateTime>().expect("valid test timestamp")),
        status,
    }
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn can_run_task_lifecycle_against_postgres() -> anyhow::Result<()> {
    let state = setup().await?;
    let service = TaskService::new(&state.db);

    let created = service
        .create_task(draft("Buy milk", "2024-01-01T00:00:00", TaskStatus::InProgress))
        .await?;
    assert_eq!(service.get_task_by_id(created.id()).await?, created);

    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(service.find_tasks_by_date(day).await?, vec![created.clone()]);
    assert_eq!(service.find_tasks_by_title("milk").await?, vec![created.clone()]);

    let updated = service
        .update_task_by_id(
            created.id(),
            draft("Buy bread", "2024-01-02T00:00:00", TaskStatus::Done),
        )
        .await?;
    assert_eq!(updated.id(), created.id());
    assert_eq!(
        service.find_tasks_by_status(TaskStatus::Done).await?,
        vec![updated.clone()]
    );

    service.delete_task_by_id(created.id()).await?;
    let second = service.delete_task_by_id(created.id()).await;
    assert!(matches!(second, Err(TaskServiceError::TaskNotFound(_))));
    Ok(())
}
