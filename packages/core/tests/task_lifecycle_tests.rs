mod common;

use chrono::{Duration, Utc};
use ordinaut_core::domain::TaskStatus;
use ordinaut_core::store::{due_work, tasks};

#[tokio::test]
async fn pause_then_resume_round_trips_status() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    let paused = tasks::pause(&pool, task.id).await.unwrap();
    assert_eq!(paused.status, TaskStatus::Paused);

    let resumed = tasks::resume(&pool, task.id).await.unwrap();
    assert_eq!(resumed.status, TaskStatus::Active);
}

#[tokio::test]
async fn cancel_marks_canceled_and_clears_unleased_firings() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now() + Duration::hours(1), None, None).await.unwrap();

    let canceled = tasks::cancel(&pool, task.id).await.unwrap();
    assert_eq!(canceled.status, TaskStatus::Canceled);

    // The pending, unleased firing was swept; nothing is left to lease.
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap();
    assert!(leased.is_none());
}

#[tokio::test]
async fn cancel_leaves_a_currently_leased_firing_in_place() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(60)).await.unwrap().unwrap();

    tasks::cancel(&pool, task.id).await.unwrap();

    // The leased firing is untouched by cancellation's cleanup sweep.
    let still_leased = due_work::extend_lease(&pool, leased.firing.id, "worker-a", Duration::seconds(60)).await.unwrap();
    assert!(still_leased);
}

#[tokio::test]
async fn delete_cascades_to_pending_firings() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();
    tasks::delete(&pool, task.id).await.unwrap();

    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap();
    assert!(leased.is_none());

    assert!(tasks::find_by_id(&pool, task.id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_of_an_unknown_task_is_reported_as_not_found() {
    let pool = common::pool().await;
    let result = tasks::delete(&pool, uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(ordinaut_core::OrdinautError::TaskNotFound(_))));
}

#[tokio::test]
async fn snooze_shifts_only_unleased_firings() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    let now = Utc::now();
    due_work::enqueue(&pool, task.id, now, None, None).await.unwrap();

    let moved = tasks::snooze_unleased_firings(&pool, task.id, 3600).await.unwrap();
    assert_eq!(moved, 1);

    // Shifted an hour forward, the firing is no longer due.
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap();
    assert!(leased.is_none());
}

#[tokio::test]
async fn list_filters_by_status() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let active = common::seed_cron_task(&pool, agent.id, "* * * * *").await;
    let paused_task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;
    tasks::pause(&pool, paused_task.id).await.unwrap();

    let active_tasks = tasks::list(&pool, Some(TaskStatus::Active), 100, 0).await.unwrap();
    assert!(active_tasks.iter().any(|t| t.id == active.id));
    assert!(!active_tasks.iter().any(|t| t.id == paused_task.id));

    let paused_tasks = tasks::list(&pool, Some(TaskStatus::Paused), 100, 0).await.unwrap();
    assert!(paused_tasks.iter().any(|t| t.id == paused_task.id));
}
