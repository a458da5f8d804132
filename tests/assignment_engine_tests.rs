mod common;

use assignment_sync::common::Clock;
use assignment_sync::domains::messages;
use assignment_sync::Config;
use assignment_sync::DocumentStore;
use chrono::Duration;
use common::{assigned_ids, Harness};
use serde_json::json;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn assign_then_release_leaves_worker_idle() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;

    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    let worker = h.worker("w1").await;
    assert_eq!(worker["busy"], json!(true));
    assert_eq!(worker["lastActivity"]["orderId"], json!("o1"));
    assert_eq!(h.open_activities_of("w1").await.len(), 1);

    assert!(h.engine.release("w1", "o1", "pintura", None).await);
    let worker = h.worker("w1").await;
    assert_eq!(worker["busy"], json!(false));
    assert!(!worker["lastActivity"]["endedAt"].is_null());
    assert!(h.open_activities_of("w1").await.is_empty());
    assert_eq!(h.activities_of("w1").await.len(), 1);

    let order = h.order("o1").await;
    assert!(assigned_ids(&order, "pintura").is_empty());
    assert_eq!(order["stageProgress"]["pintura"]["status"], json!("stopped"));
}

#[tokio::test]
async fn wash_scenario_uses_kind_qualified_stage_key() {
    let h = Harness::new();
    h.seed_worker("W", "Ana").await;
    h.seed_order("O").await;

    assert!(h.engine.assign_one("W", "O", "lavagem", Some("externa")).await);

    let order = h.order("O").await;
    let stage = &order["stageProgress"]["lavagem_externa"];
    assert_eq!(stage["status"], json!("in_progress"));
    assert_eq!(stage["completed"], json!(false));
    assert_eq!(stage["workerId"], json!("W"));
    assert_eq!(stage["serviceKind"], json!("externa"));
    assert!(order["stageProgress"].get("lavagem").is_none());

    h.refresh().await;
    let assigned = h.engine.list_assigned("O", "lavagem", Some("externa")).await;
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, "W");
    assert_eq!(assigned[0].name, "Ana");
    assert_eq!(assigned[0].started_at, Some(h.clock.now()));
}

#[tokio::test]
async fn invalid_input_touches_nothing() {
    let h = Harness::new();

    assert!(!h.engine.assign_one("", "o1", "pintura", None).await);
    assert!(!h.engine.assign_one("w1", "", "pintura", None).await);
    assert!(!h.engine.assign_one("w1", "o1", "", None).await);
    assert!(!h.engine.release("w1", "o1", " ", None).await);
    assert!(!h.engine.assign_many::<&str>(&[], "o1", "pintura", None).await);

    assert_eq!(h.store.reads(), 0);
    assert_eq!(h.store.writes(), 0);
    assert!(h.notifier.errors().is_empty());
}

#[tokio::test]
async fn missing_worker_or_order_is_read_only() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;

    assert!(!h.engine.assign_one("ghost", "o1", "pintura", None).await);
    assert!(!h.engine.assign_one("w1", "missing", "pintura", None).await);

    assert!(h.store.reads() > 0);
    assert_eq!(h.store.writes(), 0);
    assert_eq!(
        h.notifier.errors(),
        vec![messages::WORKER_NOT_FOUND.to_string(), messages::ORDER_NOT_FOUND.to_string()]
    );
    assert_eq!(h.worker("w1").await["busy"], json!(false));
}

#[tokio::test]
async fn not_found_alerts_are_throttled() {
    let h = Harness::new();
    h.seed_order("o1").await;

    assert!(!h.engine.assign_one("ghost", "o1", "pintura", None).await);
    assert!(!h.engine.assign_one("ghost", "o1", "pintura", None).await);
    assert_eq!(h.notifier.errors().len(), 1);

    h.clock.advance(Duration::milliseconds(3_001));
    assert!(!h.engine.assign_one("ghost", "o1", "pintura", None).await);
    assert_eq!(h.notifier.errors().len(), 2);
}

#[tokio::test]
async fn failed_commit_reports_and_leaves_no_trace() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;
    h.store.fail_commits.store(true, Ordering::SeqCst);

    assert!(!h.engine.assign_one("w1", "o1", "pintura", None).await);

    assert_eq!(h.notifier.errors(), vec![messages::STORE_FAILURE.to_string()]);
    assert_eq!(h.worker("w1").await["busy"], json!(false));
    assert!(h.activities_of("w1").await.is_empty());
    assert!(h.order("o1").await["stageProgress"].get("pintura").is_none());
}

#[tokio::test]
async fn assign_one_overwrites_previous_assignee() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_worker("w2", "Bruno").await;
    h.seed_order("o1").await;

    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    assert!(h.engine.assign_one("w2", "o1", "pintura", None).await);

    let order = h.order("o1").await;
    assert_eq!(assigned_ids(&order, "pintura"), vec!["w2"]);
    assert_eq!(order["stageProgress"]["pintura"]["workerName"], json!("Bruno"));
}

#[tokio::test]
async fn assign_many_replaces_the_assignee_list() {
    let h = Harness::new();
    for (id, name) in [("a", "Ana"), ("b", "Bruno"), ("c", "Carla")] {
        h.seed_worker(id, name).await;
    }
    h.seed_order("o1").await;

    assert!(h.engine.assign_many(&["a", "b"], "o1", "pintura", None).await);
    assert_eq!(assigned_ids(&h.order("o1").await, "pintura"), vec!["a", "b"]);

    assert!(h.engine.assign_many(&["c"], "o1", "pintura", None).await);
    assert_eq!(assigned_ids(&h.order("o1").await, "pintura"), vec!["c"]);
}

#[tokio::test]
async fn assign_many_skips_missing_workers_and_duplicates() {
    let h = Harness::new();
    h.seed_worker("a", "Ana").await;
    h.seed_worker("b", "Bruno").await;
    h.seed_order("o1").await;

    assert!(
        h.engine
            .assign_many(&["a", "ghost", "b", "a"], "o1", "lavagem", Some("interna"))
            .await
    );
    assert_eq!(
        assigned_ids(&h.order("o1").await, "lavagem_interna"),
        vec!["a", "b"]
    );
    assert_eq!(h.store.commits(), 1);
}

#[tokio::test]
async fn assign_many_with_only_missing_workers_fails() {
    let h = Harness::new();
    h.seed_order("o1").await;

    assert!(!h.engine.assign_many(&["x", "y"], "o1", "pintura", None).await);
    assert_eq!(h.store.writes(), 0);
    assert_eq!(h.notifier.errors(), vec![messages::WORKER_NOT_FOUND.to_string()]);
}

#[tokio::test]
async fn assign_many_does_not_track_activity_by_default() {
    let h = Harness::new();
    h.seed_worker("a", "Ana").await;
    h.seed_worker("b", "Bruno").await;
    h.seed_order("o1").await;

    assert!(h.engine.assign_many(&["a", "b"], "o1", "pintura", None).await);

    for id in ["a", "b"] {
        let worker = h.worker(id).await;
        assert_eq!(worker["busy"], json!(false));
        assert_eq!(worker["lastActivity"]["orderId"], json!("o1"));
        assert!(h.activities_of(id).await.is_empty());
    }
    assert!(h.order("o1").await["stageProgress"]["pintura"].get("status").is_none());
}

#[tokio::test]
async fn unified_assign_many_tracks_activity() {
    let mut config = Config::default();
    config.engine.unify_assign_many = true;
    let h = Harness::with_config(config);
    h.seed_worker("a", "Ana").await;
    h.seed_worker("b", "Bruno").await;
    h.seed_order("o1").await;

    assert!(h.engine.assign_many(&["a", "b"], "o1", "pintura", None).await);

    for id in ["a", "b"] {
        assert_eq!(h.worker(id).await["busy"], json!(true));
        assert_eq!(h.open_activities_of(id).await.len(), 1);
    }
    assert_eq!(
        h.order("o1").await["stageProgress"]["pintura"]["status"],
        json!("in_progress")
    );

    assert!(h.engine.release("a", "o1", "pintura", None).await);
    assert_eq!(h.worker("a").await["busy"], json!(false));
    assert_eq!(assigned_ids(&h.order("o1").await, "pintura"), vec!["b"]);
}

#[tokio::test]
async fn release_keeps_worker_busy_while_another_stage_is_open() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;
    h.seed_order("o2").await;

    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    assert!(h.engine.assign_one("w1", "o2", "lavagem", Some("externa")).await);
    assert_eq!(h.open_activities_of("w1").await.len(), 2);

    assert!(h.engine.release("w1", "o1", "pintura", None).await);

    let open = h.open_activities_of("w1").await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["orderId"], json!("o2"));
    assert_eq!(h.worker("w1").await["busy"], json!(true));
    assert_eq!(
        h.order("o2").await["stageProgress"]["lavagem_externa"]["status"],
        json!("in_progress")
    );
}

#[tokio::test]
async fn release_only_stops_an_emptied_unfinished_stage() {
    let h = Harness::new();
    for id in ["a", "b"] {
        h.seed_worker(id, id).await;
    }
    h.seed_order("o1").await;

    assert!(h.engine.assign_many(&["a", "b"], "o1", "pintura", None).await);

    assert!(h.engine.release("a", "o1", "pintura", None).await);
    let order = h.order("o1").await;
    assert_eq!(assigned_ids(&order, "pintura"), vec!["b"]);
    assert!(order["stageProgress"]["pintura"].get("status").is_none());

    assert!(h.engine.release("b", "o1", "pintura", None).await);
    assert_eq!(
        h.order("o1").await["stageProgress"]["pintura"]["status"],
        json!("stopped")
    );
}

#[tokio::test]
async fn release_leaves_completed_stage_status() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.store
        .inner
        .set(
            &assignment_sync::DocumentRef::new(&h.config.collections.orders, "o1"),
            json!({
                "stageProgress": {
                    "pintura": {
                        "assignedWorkers": [{"id": "w1", "name": "Ana"}],
                        "completed": true,
                        "status": "completed"
                    }
                }
            }),
        )
        .await
        .unwrap();

    assert!(h.engine.release("w1", "o1", "pintura", None).await);
    let stage = &h.order("o1").await["stageProgress"]["pintura"];
    assert_eq!(stage["status"], json!("completed"));
    assert_eq!(stage["assignedWorkers"], json!([]));
}

#[tokio::test]
async fn release_of_unknown_worker_fails() {
    let h = Harness::new();
    h.seed_order("o1").await;

    assert!(!h.engine.release("ghost", "o1", "pintura", None).await);
    assert_eq!(h.store.writes(), 0);
}

#[tokio::test]
async fn release_read_failure_is_reported() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;
    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);

    h.store.fail_reads.store(true, Ordering::SeqCst);
    assert!(!h.engine.release("w1", "o1", "pintura", None).await);
    assert_eq!(h.notifier.errors(), vec![messages::STORE_FAILURE.to_string()]);

    h.store.fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(h.open_activities_of("w1").await.len(), 1);
}

#[tokio::test]
async fn force_release_without_activity_is_a_no_op() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;

    assert!(h.engine.force_release("w1").await);
    assert_eq!(h.store.writes(), 0);
    assert!(h.notifier.successes().is_empty());
}

#[tokio::test]
async fn force_release_of_unknown_worker_fails() {
    let h = Harness::new();

    assert!(!h.engine.force_release("ghost").await);
    assert_eq!(h.store.writes(), 0);
    assert_eq!(h.notifier.errors(), vec![messages::WORKER_NOT_FOUND.to_string()]);
}

#[tokio::test]
async fn force_release_closes_every_open_stage() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;
    h.seed_order("o2").await;

    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    assert!(h.engine.assign_one("w1", "o2", "lavagem", Some("externa")).await);
    h.refresh().await;

    assert!(h.engine.force_release("w1").await);

    assert!(h.open_activities_of("w1").await.is_empty());
    assert_eq!(h.activities_of("w1").await.len(), 2);
    assert_eq!(h.worker("w1").await["busy"], json!(false));
    // Only the last activity's stage is cleaned up on the order side.
    assert_eq!(
        h.order("o2").await["stageProgress"]["lavagem_externa"]["status"],
        json!("stopped")
    );
    assert_eq!(
        h.order("o1").await["stageProgress"]["pintura"]["status"],
        json!("in_progress")
    );
    // Targeted release plus the sweep.
    assert_eq!(h.store.commits(), 4);
}

#[tokio::test]
async fn list_assigned_degrades_to_empty() {
    let h = Harness::new();
    h.seed_order("o1").await;

    assert!(h.engine.list_assigned("missing", "pintura", None).await.is_empty());
    assert!(h.engine.list_assigned("o1", "pintura", None).await.is_empty());
    assert!(h.engine.list_assigned("", "pintura", None).await.is_empty());

    h.store.fail_reads.store(true, Ordering::SeqCst);
    assert!(h.engine.list_assigned("other", "pintura", None).await.is_empty());
}

#[tokio::test]
async fn list_assigned_reads_through_the_cache() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;

    assert!(h.engine.list_assigned("o1", "pintura", None).await.is_empty());
    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);

    // Cached order predates the assignment until the TTL passes.
    assert!(h.engine.list_assigned("o1", "pintura", None).await.is_empty());
    h.clock.advance(Duration::milliseconds(10_000));
    assert_eq!(h.engine.list_assigned("o1", "pintura", None).await.len(), 1);
}

#[tokio::test]
async fn force_release_right_after_assign_sees_the_new_activity() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;

    // The cache still holds the worker as it was before this assignment.
    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    assert!(h.engine.force_release("w1").await);

    let worker = h.worker("w1").await;
    assert_eq!(worker["busy"], json!(false));
    assert!(!worker["lastActivity"]["endedAt"].is_null());
    assert!(h.open_activities_of("w1").await.is_empty());
    assert_eq!(
        h.order("o1").await["stageProgress"]["pintura"]["status"],
        json!("stopped")
    );
}

#[tokio::test]
async fn force_release_shows_a_single_success() {
    let h = Harness::new();
    h.seed_worker("w1", "Ana").await;
    h.seed_order("o1").await;

    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    assert!(h.engine.force_release("w1").await);

    assert_eq!(
        h.notifier.successes(),
        vec![messages::ASSIGNED.to_string(), messages::FORCE_RELEASED.to_string()]
    );
    assert!(h.notifier.errors().is_empty());
}

#[tokio::test]
async fn release_after_assign_many_ends_last_activity() {
    let h = Harness::new();
    h.seed_worker("a", "Ana").await;
    h.seed_worker("b", "Bruno").await;
    h.seed_order("o1").await;

    assert!(h.engine.assign_many(&["a", "b"], "o1", "pintura", None).await);
    assert!(h.engine.release("a", "o1", "pintura", None).await);

    let released = h.worker("a").await;
    assert_eq!(released["busy"], json!(false));
    assert_eq!(released["lastActivity"]["orderId"], json!("o1"));
    assert!(!released["lastActivity"]["endedAt"].is_null());
    assert!(h.worker("b").await["lastActivity"]["endedAt"].is_null());
}

#[tokio::test]
async fn worker_with_null_fields_can_be_assigned() {
    let h = Harness::new();
    h.store
        .inner
        .set(
            &assignment_sync::DocumentRef::new(&h.config.collections.workers, "w1"),
            json!({"name": null, "busy": null, "specialties": null}),
        )
        .await
        .unwrap();
    h.seed_order("o1").await;

    assert!(h.engine.assign_one("w1", "o1", "pintura", None).await);
    assert_eq!(h.worker("w1").await["busy"], json!(true));
    assert!(h.notifier.errors().is_empty());
}
