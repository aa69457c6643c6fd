mod common;

use std::sync::Arc;
use std::time::Duration;

use common::SubscriberState;
use getnet_gateway::{
    callback::RetrySweeper,
    domain::{Buyer, PaymentSnapshot, PaymentStatus, RetryStatus},
    repository::CallbackFailure,
};

fn failure(request_id: &str, callback_url: &str) -> CallbackFailure {
    CallbackFailure {
        request_id: request_id.to_string(),
        reference: format!("ORDER-{request_id}"),
        callback_url: callback_url.to_string(),
        snapshot: PaymentSnapshot {
            amount: 5000,
            currency: "CLP".to_string(),
            payment_status: PaymentStatus::Approved,
            buyer: Buyer {
                name: "Hugo".to_string(),
                email: "test@example.com".to_string(),
                document: None,
            },
        },
        error: "HTTP 500".to_string(),
        status_code: 500,
    }
}

fn sweeper(h: &common::Harness, batch_size: i64) -> RetrySweeper {
    RetrySweeper::new(
        h.retries.clone(),
        h.orchestrator.clone(),
        batch_size,
        Duration::from_millis(0),
    )
}

/// Backdate an entry to a fixed point so selection order is deterministic.
async fn backdate(pool: &sqlx::SqlitePool, request_id: &str, minutes: i64) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE retry_callbacks SET next_retry_at = datetime('2020-01-01 00:00:00', '+' || ? || ' minutes') WHERE request_id = ?",
    )
    .bind(minutes)
    .bind(request_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[tokio::test]
async fn empty_sweep_is_a_cheap_no_op() -> anyhow::Result<()> {
    let h = common::harness().await;
    let summary = sweeper(&h, 100).run().await?;

    assert_eq!(summary.due, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);

    Ok(())
}

#[tokio::test]
async fn sweep_caps_at_batch_size_and_leaves_the_rest_untouched() -> anyhow::Result<()> {
    let h = common::harness().await;
    let subscriber = SubscriberState::default();
    let addr = common::spawn_subscriber(subscriber.clone()).await;
    let url = format!("http://{addr}/callback");

    // 150 due entries; the first 100 by next_retry_at should be taken.
    for i in 0..150 {
        let id = format!("bulk-{i:03}");
        h.payments
            .create(common::sample_payment(&id, Some(url.clone())))
            .await?;
        h.retries.record_failure(failure(&id, &url)).await?;
        backdate(&h.pool, &id, i).await?;
    }

    let summary = sweeper(&h, 100).run().await?;
    assert_eq!(summary.due, 100);
    assert_eq!(summary.succeeded, 100);
    assert_eq!(summary.failed, 0);
    assert_eq!(subscriber.hits(), 100);

    // The 50 least-overdue entries keep their schedule.
    for i in 100..150 {
        let id = format!("bulk-{i:03}");
        let entry = h.retries.find_by_request_id(&id).await?.unwrap();
        assert_eq!(entry.status, RetryStatus::Pending);
        assert_eq!(entry.attempts, 1);
        let expected = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(i);
        assert_eq!(entry.next_retry_at.unwrap().naive_utc(), expected);
    }

    // And the processed ones are closed.
    let entry = h.retries.find_by_request_id("bulk-000").await?.unwrap();
    assert_eq!(entry.status, RetryStatus::Success);

    Ok(())
}

#[tokio::test]
async fn failed_entries_wait_for_their_next_slot() -> anyhow::Result<()> {
    let h = common::harness().await;
    let subscriber = SubscriberState::default();
    subscriber.set_failing(true);
    let addr = common::spawn_subscriber(subscriber.clone()).await;
    let url = format!("http://{addr}/callback");

    h.payments
        .create(common::sample_payment("slow-1", Some(url.clone())))
        .await?;
    h.retries.record_failure(failure("slow-1", &url)).await?;
    backdate(&h.pool, "slow-1", 0).await?;

    let sweeper = Arc::new(sweeper(&h, 100));
    let summary = sweeper.run().await?;
    assert_eq!(summary.due, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(subscriber.hits(), 1);

    // The failure handler already advanced next_retry_at, so an immediate
    // second sweep finds nothing; no intra-sweep re-retry either.
    let entry = h.retries.find_by_request_id("slow-1").await?.unwrap();
    assert_eq!(entry.attempts, 2);
    assert!(entry.next_retry_at.unwrap() > chrono::Utc::now());

    let summary = sweeper.run().await?;
    assert_eq!(summary.due, 0);
    assert_eq!(subscriber.hits(), 1);

    Ok(())
}
