mod common;

use ordinaut_core::domain::{ScheduleKind, Task};
use ordinaut_core::events;
use ordinaut_core::store::{due_work, tasks};
use uuid::Uuid;

async fn seed_event_task(pool: &sqlx::PgPool, created_by: Uuid, topic: &str) -> Task {
    let task = Task::builder()
        .title("on topic")
        .created_by(created_by)
        .schedule_kind(ScheduleKind::Event)
        .schedule_expr(topic)
        .pipeline(serde_json::json!({}))
        .build();
    tasks::insert(pool, &task).await.unwrap()
}

#[tokio::test]
async fn publish_enqueues_a_firing_for_each_matching_active_task() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let matching = seed_event_task(&pool, agent.id, "orders.shipped").await;
    let _other_topic = seed_event_task(&pool, agent.id, "orders.created").await;

    let published = events::publish(&pool, "orders.shipped", serde_json::json!({}), agent.id).await.unwrap();
    assert_eq!(published.matched_tasks, 1);

    let leased = due_work::lease_next(&pool, "worker-a", chrono::Duration::seconds(30)).await.unwrap().unwrap();
    assert_eq!(leased.task_id, matching.id);
}

#[tokio::test]
async fn publish_ignores_paused_tasks_on_the_same_topic() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;
    let task = seed_event_task(&pool, agent.id, "orders.refunded").await;
    tasks::pause(&pool, task.id).await.unwrap();

    let published = events::publish(&pool, "orders.refunded", serde_json::json!({}), agent.id).await.unwrap();
    assert_eq!(published.matched_tasks, 0);
}

#[tokio::test]
async fn publish_with_no_matching_tasks_enqueues_nothing() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;

    let published = events::publish(&pool, "nobody.listening", serde_json::json!({}), agent.id).await.unwrap();
    assert_eq!(published.matched_tasks, 0);
}

#[tokio::test]
async fn publish_does_not_match_cron_tasks_sharing_the_topic_string() {
    let pool = common::pool().await;
    let agent = common::seed_agent(&pool, &["task.create"]).await;

    // A cron task whose schedule_expr happens to read the same as a topic
    // must never be mistaken for an event subscriber.
    let cron_task = Task::builder()
        .title("cron with a confusing schedule_expr")
        .created_by(agent.id)
        .schedule_kind(ScheduleKind::Cron)
        .schedule_expr("orders.shipped")
        .pipeline(serde_json::json!({}))
        .build();
    tasks::insert(&pool, &cron_task).await.unwrap();

    let published = events::publish(&pool, "orders.shipped", serde_json::json!({}), agent.id).await.unwrap();
    assert_eq!(published.matched_tasks, 0);
}
