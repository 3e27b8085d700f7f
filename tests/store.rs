//! Tests for the SQLite coupon store: batching, conditional updates and the change feed.

use std::sync::{Arc, Mutex};

mod common;
use common::*;

use coupon_desk::models::{Coupon, CouponUpdate, NewCoupon, UsageMark};
use coupon_desk::store::{CouponStore, STORE_BATCH_LIMIT};

fn coupons(n: usize, prefix: &str) -> Vec<NewCoupon> {
    (0..n)
        .map(|i| NewCoupon::unused(format!("{}{}", prefix, i), "01/01/2024", "31/12/2024"))
        .collect()
}

fn mark(by: &str) -> UsageMark {
    UsageMark {
        used_by: by.to_string(),
        used_date: "June 15, 2024".to_string(),
        note: String::new(),
    }
}

#[test]
fn test_create_many_and_delete_all_beyond_batch_limit() {
    let env = test_env();
    let count = STORE_BATCH_LIMIT * 2 + 17;

    assert_eq!(env.store.create_many(&coupons(count, "B")).unwrap(), count);
    assert_eq!(env.store.fetch_all().unwrap().len(), count);

    assert_eq!(env.store.delete_all().unwrap(), count);
    assert!(env.store.fetch_all().unwrap().is_empty());
}

#[test]
fn test_small_batch_size_still_writes_everything() {
    let env = test_env_with(|store| store.with_batch_size(7));
    assert_eq!(env.store.create_many(&coupons(50, "S")).unwrap(), 50);
    assert_eq!(env.store.delete_all().unwrap(), 50);
    assert_eq!(env.store.create_many(&[]).unwrap(), 0);
}

#[test]
fn test_create_many_stores_records_as_given() {
    let env = test_env();
    let mut input = NewCoupon::unused("pre", "01/01/2024", "31/12/2024");
    input.used = true;
    input.used_by = "someone".into();

    env.store.create_many(&[input]).unwrap();
    let stored = env.store.fetch_by_code("PRE").unwrap().unwrap();
    assert!(stored.used);
    assert_eq!(stored.used_by, "someone");
    assert_eq!(stored.kind, "");
}

#[test]
fn test_mark_used_is_conditional() {
    let env = test_env();
    let id = env
        .store
        .create(&NewCoupon::unused("ONE", "01/01/2024", "31/12/2024"))
        .unwrap();

    assert!(env.store.mark_used(&id, &mark("first")).unwrap());
    assert!(!env.store.mark_used(&id, &mark("second")).unwrap());
    assert!(!env.store.mark_used("missing", &mark("third")).unwrap());

    let stored = env.store.fetch_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.used_by, "first");
}

#[test]
fn test_update_stamps_and_reports_missing() {
    let env = test_env();
    let id = env
        .store
        .create(&NewCoupon::unused("upd", "01/01/2024", "31/12/2024"))
        .unwrap();

    env.store
        .update(
            &id,
            &CouponUpdate {
                code: Some("renamed".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(env.store.fetch_by_id(&id).unwrap().unwrap().code, "RENAMED");

    // An update with no fields still stamps the row.
    let before = env.store.fetch_by_id(&id).unwrap().unwrap();
    env.store.update(&id, &CouponUpdate::default()).unwrap();
    let after = env.store.fetch_by_id(&id).unwrap().unwrap();
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(after.code, before.code);

    assert!(env.store.update("missing", &CouponUpdate::default()).is_err());
    assert!(env.store.delete("missing").is_err());
}

#[test]
fn test_subscription_receives_snapshots_until_dropped() {
    let env = test_env();
    env.store
        .create(&NewCoupon::unused("FIRST", "01/01/2024", "31/12/2024"))
        .unwrap();

    let seen: Arc<Mutex<Vec<Vec<Coupon>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = env.store.subscribe(Box::new(move |snapshot: &[Coupon]| {
        sink.lock().unwrap().push(snapshot.to_vec());
    }));
    assert!(subscription.is_active());
    assert_eq!(env.store.subscriber_count(), 1);

    // Initial snapshot.
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(seen.lock().unwrap()[0].len(), 1);

    let id = env
        .store
        .create(&NewCoupon::unused("SECOND", "01/01/2024", "31/12/2024"))
        .unwrap();
    env.store.delete(&id).unwrap();

    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].len(), 2);
        assert_eq!(seen[2].len(), 1);
    }

    drop(subscription);
    assert_eq!(env.store.subscriber_count(), 0);

    env.store
        .create(&NewCoupon::unused("THIRD", "01/01/2024", "31/12/2024"))
        .unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn test_unsubscribe_detaches_only_that_listener() {
    let env = test_env();
    let counter = Arc::new(Mutex::new((0usize, 0usize)));

    let a = Arc::clone(&counter);
    let first = env.store.subscribe(Box::new(move |_: &[Coupon]| a.lock().unwrap().0 += 1));
    let b = Arc::clone(&counter);
    let _second = env.store.subscribe(Box::new(move |_: &[Coupon]| b.lock().unwrap().1 += 1));

    first.unsubscribe();
    env.store
        .create(&NewCoupon::unused("X", "01/01/2024", "31/12/2024"))
        .unwrap();

    assert_eq!(*counter.lock().unwrap(), (1, 2));
    assert_eq!(env.store.subscriber_count(), 1);
}

#[test]
fn test_subscribe_on_broken_store_is_noop() {
    let env = test_env();
    {
        let conn = env.store.pool().get().unwrap();
        conn.execute_batch("DROP TABLE coupons").unwrap();
    }

    let called = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&called);
    let subscription = env.store.subscribe(Box::new(move |_: &[Coupon]| {
        *flag.lock().unwrap() = true;
    }));

    assert!(!subscription.is_active());
    assert!(!*called.lock().unwrap());
    assert_eq!(env.store.subscriber_count(), 0);
    subscription.unsubscribe();
}
