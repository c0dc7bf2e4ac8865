mod common;

use chrono::{Duration, Utc};
use ordinaut_core::store::due_work;

#[tokio::test]
async fn lease_next_skips_a_row_locked_by_a_concurrent_claimant() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();

    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap().unwrap();
    assert_eq!(leased.task_id, task.id);

    // The only eligible row is already leased; a second claimant finds nothing.
    let second = due_work::lease_next(&pool, "worker-b", Duration::seconds(30)).await.unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn extend_lease_fails_once_another_worker_has_reclaimed_it() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(1)).await.unwrap().unwrap();

    // Let the short lease expire, then have another worker reclaim it.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let reclaimed = due_work::lease_next(&pool, "worker-b", Duration::seconds(30)).await.unwrap().unwrap();
    assert_eq!(reclaimed.firing.id, leased.firing.id);

    let extended = due_work::extend_lease(&pool, leased.firing.id, "worker-a", Duration::seconds(30)).await.unwrap();
    assert!(!extended, "worker-a's lease was reclaimed and must not extend");
}

#[tokio::test]
async fn reclaiming_an_expired_lease_bumps_the_attempt_counter() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();
    let first_claim = due_work::lease_next(&pool, "worker-a", Duration::seconds(1)).await.unwrap().unwrap();
    assert_eq!(first_claim.firing.attempt, 1);

    // worker-a crashes mid-execution without rescheduling or completing;
    // the lease lapses and another worker reclaims the same row.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let reclaimed = due_work::lease_next(&pool, "worker-b", Duration::seconds(30)).await.unwrap().unwrap();
    assert_eq!(reclaimed.firing.id, first_claim.firing.id);
    assert_eq!(reclaimed.firing.attempt, 2, "reclaiming a lapsed lease must count as a new attempt");
}

#[tokio::test]
async fn dedupe_window_suppresses_a_second_firing_for_the_same_key() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;

    let mut task = ordinaut_core::domain::Task::builder()
        .title("dedupe test")
        .created_by(agent.id)
        .schedule_kind(ordinaut_core::domain::ScheduleKind::Cron)
        .schedule_expr("* * * * *")
        .pipeline(serde_json::json!({}))
        .dedupe_key("daily-report")
        .build();
    task = ordinaut_core::store::tasks::insert(&pool, &task).await.unwrap();

    let now = Utc::now();
    let first = due_work::enqueue(&pool, task.id, now, Some("daily-report"), Some(60)).await.unwrap();
    assert!(matches!(first, due_work::EnqueueResult::Created(_)));

    let second =
        due_work::enqueue(&pool, task.id, now + Duration::seconds(30), Some("daily-report"), Some(60)).await.unwrap();
    match second {
        due_work::EnqueueResult::Duplicate(id) => assert_eq!(id, first.firing_id()),
        due_work::EnqueueResult::Created(_) => panic!("expected the second enqueue to be suppressed"),
    }
}

#[tokio::test]
async fn concurrent_enqueues_for_the_same_bucket_yield_exactly_one_row() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;

    let mut task = ordinaut_core::domain::Task::builder()
        .title("dedupe race test")
        .created_by(agent.id)
        .schedule_kind(ordinaut_core::domain::ScheduleKind::Cron)
        .schedule_expr("* * * * *")
        .pipeline(serde_json::json!({}))
        .dedupe_key("daily-report")
        .build();
    task = ordinaut_core::store::tasks::insert(&pool, &task).await.unwrap();

    let run_at = Utc::now();
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { due_work::enqueue(&pool, task.id, run_at, Some("daily-report"), Some(60)).await })
        })
        .collect();

    let mut created = 0;
    let mut duplicate_ids = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            due_work::EnqueueResult::Created(id) => {
                created += 1;
                duplicate_ids.push(id);
            }
            due_work::EnqueueResult::Duplicate(id) => duplicate_ids.push(id),
        }
    }

    assert_eq!(created, 1, "exactly one of the five concurrent enqueues should have created a row");
    assert!(duplicate_ids.iter().all(|id| *id == duplicate_ids[0]), "all callers must agree on the winning firing id");

    let (row_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM due_work WHERE task_id = $1")
        .bind(task.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row_count, 1);
}

#[tokio::test]
async fn reschedule_for_retry_clears_the_lease_and_bumps_attempt() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap().unwrap();
    assert_eq!(leased.firing.attempt, 1);

    due_work::reschedule_for_retry(&pool, leased.firing.id, leased.firing.attempt, ordinaut_core::domain::BackoffStrategy::Fixed)
        .await
        .unwrap();

    // The lease was cleared, so it is eligible for reclaim once due.
    let reclaimed = due_work::lease_next(&pool, "worker-b", Duration::seconds(30)).await.unwrap();
    assert!(reclaimed.is_none(), "rescheduled firing's run_at is in the future");
}

#[tokio::test]
async fn complete_success_deletes_the_firing() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now(), None, None).await.unwrap();
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap().unwrap();

    due_work::complete_success(&pool, leased.firing.id).await.unwrap();

    let gone = due_work::extend_lease(&pool, leased.firing.id, "worker-a", Duration::seconds(30)).await.unwrap();
    assert!(!gone, "firing row should no longer exist");
}

#[tokio::test]
async fn lease_next_ignores_firings_not_yet_due() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = common::seed_cron_task(&pool, agent.id, "* * * * *").await;

    due_work::enqueue(&pool, task.id, Utc::now() + Duration::hours(1), None, None).await.unwrap();
    let leased = due_work::lease_next(&pool, "worker-a", Duration::seconds(30)).await.unwrap();
    assert!(leased.is_none());
}
