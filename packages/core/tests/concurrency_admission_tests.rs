mod common;

use ordinaut_core::domain::Run;
use ordinaut_core::store::runs;
use uuid::Uuid;

#[tokio::test]
async fn an_unfinished_run_blocks_admission_for_the_same_concurrency_key() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    let in_flight = Run::builder().task_id(task.id).firing_id(Uuid::new_v4()).locked_by("worker-a").attempt(1).build();
    runs::start(&pool, &in_flight).await.unwrap();

    let count = runs::count_unfinished_for_concurrency_key(&pool, "shared-key", Uuid::nil()).await.unwrap();
    // This run was never tagged with a concurrency key at the task level,
    // so it should not show up under an unrelated key.
    assert_eq!(count, 0);
}

#[tokio::test]
async fn finished_runs_do_not_count_toward_admission() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;

    let mut task = ordinaut_core::domain::Task::builder()
        .title("exclusive job")
        .created_by(agent.id)
        .schedule_kind(ordinaut_core::domain::ScheduleKind::Cron)
        .schedule_expr("* * * * *")
        .pipeline(serde_json::json!({}))
        .concurrency_key("exclusive-job")
        .build();
    task = ordinaut_core::store::tasks::insert(&pool, &task).await.unwrap();

    let run = Run::builder().task_id(task.id).firing_id(Uuid::new_v4()).locked_by("worker-a").attempt(1).build();
    let run = runs::start(&pool, &run).await.unwrap();

    let count_while_running =
        runs::count_unfinished_for_concurrency_key(&pool, "exclusive-job", Uuid::nil()).await.unwrap();
    assert_eq!(count_while_running, 1);

    runs::finish(&pool, run.id, true, None, None).await.unwrap();

    let count_after_finish =
        runs::count_unfinished_for_concurrency_key(&pool, "exclusive-job", Uuid::nil()).await.unwrap();
    assert_eq!(count_after_finish, 0);
}

#[tokio::test]
async fn excluding_run_id_lets_a_run_ignore_its_own_in_flight_row() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    let run = Run::builder().task_id(task.id).firing_id(Uuid::new_v4()).locked_by("worker-a").attempt(1).build();
    let run = runs::start(&pool, &run).await.unwrap();

    let count = runs::count_unfinished_for_concurrency_key(&pool, "shared-key", run.id).await.unwrap();
    assert_eq!(count, 0);
}
