// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use serde_json::{Value, json};
use shoplog::aggregates;
use shoplog::notify::ChangeKind;
use shoplog::registry::LedgerRegistry;
use shoplog::service::{CommandOutcome, OrderService};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
}

async fn setup(entries: &[&str]) -> (TempDir, OrderService) {
    let dir = tempdir().unwrap();
    let registry = Arc::new(LedgerRegistry::new(dir.path().to_path_buf()));
    for e in entries {
        registry.setup_entry(e).await.unwrap();
    }
    (dir, OrderService::with_clock(registry, fixed_today))
}

fn order(entry: &str, price: Value, qty: Value, date: Option<&str>) -> Value {
    let mut p = json!({
        "entry_id": entry,
        "name": "Router",
        "place": "Online",
        "category": "Electronics",
        "price": price,
        "quantity": qty,
        "vat": 10,
        "status": "new",
    });
    if let Some(d) = date {
        p["purchase_date"] = json!(d);
    }
    p
}

async fn grand_total(svc: &OrderService, entry: &str) -> (i64, f64) {
    let h = svc.registry().get(entry).unwrap();
    h.run(|c| aggregates::grand_total(c))
        .await
        .map(|g| (g.totals.order_count, g.totals.total))
        .unwrap()
}

#[tokio::test]
async fn add_and_delete_round_trip() {
    let (_dir, svc) = setup(&["home"]).await;

    let out = svc
        .add_order(&order("home", json!(100), json!(2), Some("2025-01-15")))
        .await;
    let CommandOutcome::Added { order_id } = out else {
        panic!("unexpected {:?}", out);
    };
    let (count, total) = grand_total(&svc, "home").await;
    assert_eq!(count, 1);
    assert!((total - 220.0).abs() < 1e-9);

    let out = svc
        .delete_order(&json!({"entry_id": "home", "order_id": order_id}))
        .await;
    assert_eq!(out, CommandOutcome::Deleted { order_id });
    assert_eq!(grand_total(&svc, "home").await, (0, 0.0));
}

#[tokio::test]
async fn missing_date_uses_clock() {
    let (_dir, svc) = setup(&["home"]).await;
    let id = svc
        .try_add_order(&order("home", json!("9.5"), json!("1"), None))
        .await
        .unwrap();
    let h = svc.registry().get("home").unwrap();
    let rec = h
        .run(move |c| shoplog::orders::find_order(c, id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rec.detail.purchase_date, fixed_today());
    let m = h
        .run(|c| aggregates::monthly(c, 2025, 3))
        .await
        .unwrap();
    assert_eq!(m.totals.order_count, 1);
}

#[tokio::test]
async fn invalid_payload_writes_nothing() {
    let (_dir, svc) = setup(&["home"]).await;
    let out = svc
        .add_order(&order("home", json!("abc"), json!(1), None))
        .await;
    assert!(matches!(out, CommandOutcome::Failed { .. }));
    assert!(!out.is_success());

    let mut missing = order("home", json!(1), json!(1), None);
    missing.as_object_mut().unwrap().remove("status");
    let err = svc.try_add_order(&missing).await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(grand_total(&svc, "home").await, (0, 0.0));
}

#[tokio::test]
async fn unknown_instance_and_unknown_order() {
    let (_dir, svc) = setup(&["home"]).await;
    let out = svc.add_order(&order("garage", json!(1), json!(1), None)).await;
    assert!(matches!(out, CommandOutcome::Failed { .. }));

    let out = svc
        .delete_order(&json!({"entry_id": "home", "order_id": 77}))
        .await;
    assert_eq!(out, CommandOutcome::NotFound { order_id: 77 });
}

#[tokio::test]
async fn instances_are_isolated() {
    let (_dir, svc) = setup(&["home", "office"]).await;
    svc.try_add_order(&order("home", json!(10), json!(1), Some("2025-01-01")))
        .await
        .unwrap();
    svc.try_add_order(&order("home", json!(10), json!(1), Some("2025-01-02")))
        .await
        .unwrap();
    svc.try_add_order(&order("office", json!(5), json!(1), Some("2025-01-02")))
        .await
        .unwrap();
    assert_eq!(grand_total(&svc, "home").await.0, 2);
    assert_eq!(grand_total(&svc, "office").await.0, 1);
}

#[tokio::test]
async fn subscribers_hear_only_their_instance() {
    let (_dir, svc) = setup(&["home", "office"]).await;
    let mut home_rx = svc.registry().get("home").unwrap().subscribe();
    let mut office_rx = svc.registry().get("office").unwrap().subscribe();

    let id = svc
        .try_add_order(&order("home", json!(10), json!(1), None))
        .await
        .unwrap();
    let ev = home_rx.recv().await.unwrap();
    assert_eq!(ev.entry_id, "home");
    assert_eq!(ev.kind, ChangeKind::Added);
    assert_eq!(ev.order_id, id);
    assert!(office_rx.try_recv().is_err());

    // failed commands do not notify
    svc.delete_order(&json!({"entry_id": "home", "order_id": id + 100}))
        .await;
    assert!(home_rx.try_recv().is_err());

    svc.delete_order(&json!({"entry_id": "home", "order_id": id}))
        .await;
    assert_eq!(home_rx.recv().await.unwrap().kind, ChangeKind::Deleted);
}

#[tokio::test]
async fn concurrent_adds_are_serialised() {
    let (_dir, svc) = setup(&["home"]).await;
    let svc = Arc::new(svc);
    let mut tasks = Vec::new();
    for i in 0..20 {
        let svc = Arc::clone(&svc);
        tasks.push(tokio::spawn(async move {
            svc.try_add_order(&order("home", json!(i + 1), json!(1), Some("2025-05-05")))
                .await
                .unwrap()
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    let (count, total) = grand_total(&svc, "home").await;
    assert_eq!(count, 20);
    // sum(1..=20) * 1.1
    assert!((total - 231.0).abs() < 1e-6);
    let h = svc.registry().get("home").unwrap();
    assert!(h.run(|c| aggregates::check_drift(c)).await.unwrap().is_empty());
}

#[tokio::test]
async fn registry_lifecycle() {
    let dir = tempdir().unwrap();
    let registry = LedgerRegistry::new(dir.path().to_path_buf());
    assert!(registry.setup_entry("../escape").await.unwrap_err().is_validation());

    let a = registry.setup_entry("home").await.unwrap();
    let b = registry.setup_entry("home").await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.entry_ids(), vec!["home".to_string()]);
    assert!(a.path().exists());

    let mut rx = a.subscribe();
    assert!(registry.unload_entry("home"));
    assert!(!registry.unload_entry("home"));
    assert!(registry.get("home").is_err());
    assert!(rx.recv().await.is_none());
}
