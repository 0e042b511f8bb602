// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use shoplog::db::{self, UNKNOWN_PLACE};
use shoplog::orders::{OrderFilter, list_orders};
use shoplog::{aggregates, projection};
use tempfile::tempdir;

fn legacy_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE purchases(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_date TEXT NOT NULL,
            year INTEGER NOT NULL, month INTEGER NOT NULL, day INTEGER NOT NULL,
            name TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit_price REAL NOT NULL,
            pre_tax_total REAL NOT NULL,
            vat_percent REAL NOT NULL DEFAULT 0,
            vat_amount REAL NOT NULL DEFAULT 0,
            post_tax_total REAL NOT NULL,
            model TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT '',
            category TEXT,
            manufacturer TEXT NOT NULL DEFAULT '',
            warranty_months INTEGER NOT NULL DEFAULT 0,
            warranty_end TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE category_stats(
            category TEXT PRIMARY KEY, quantity REAL, total REAL
        );
        INSERT INTO purchases(purchase_date, year, month, day, name, quantity, unit_price,
                              pre_tax_total, post_tax_total, category)
        VALUES ('2024-03-05', 2024, 3, 5, 'Kettle', 1, 30, 30, 30, 'Kitchen'),
               ('2025-02-01', 2025, 2, 1, 'Pan', 2, 15, 30, 30, 'Kitchen');
        INSERT INTO category_stats VALUES ('Kitchen', 3, 60);
        "#,
    )
    .unwrap();
    conn
}

#[test]
fn missing_place_column_is_added_with_placeholder() {
    let mut conn = legacy_conn();
    db::init_schema(&mut conn).unwrap();

    let cols = db::table_columns(&conn, "purchases").unwrap();
    assert!(cols.iter().any(|c| c == "place"));

    let rows = list_orders(&conn, &OrderFilter::default()).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.detail.place == UNKNOWN_PLACE));
    assert_eq!(rows[0].detail.name, "Pan");
}

#[test]
fn global_category_stats_become_per_year() {
    let mut conn = legacy_conn();
    db::init_schema(&mut conn).unwrap();

    let cols = db::table_columns(&conn, "category_stats").unwrap();
    assert!(cols.iter().any(|c| c == "year"));
    let k24 = aggregates::category(&conn, 2024, "Kitchen").unwrap().totals;
    let k25 = aggregates::category(&conn, 2025, "Kitchen").unwrap().totals;
    assert_eq!((k24.order_count, k24.total), (1, 30.0));
    assert_eq!((k25.order_count, k25.quantity), (1, 2.0));
}

#[test]
fn init_schema_is_idempotent() {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    db::init_schema(&mut conn).unwrap();
    let scopes = projection::discover(&conn).unwrap();
    assert_eq!(scopes.len(), 1);
}

#[test]
fn open_ledger_creates_directory_and_file() {
    let dir = tempdir().unwrap();
    let path = db::ledger_path(&dir.path().join("nested"), "home");
    assert!(path.ends_with("shopping_data_home.sqlite"));
    let conn = db::open_ledger(&path).unwrap();
    drop(conn);
    assert!(path.exists());
    // reopening an existing ledger keeps its tables
    let conn = db::open_ledger(&path).unwrap();
    assert!(db::table_columns(&conn, "grand_total").unwrap().len() >= 4);
}

#[test]
fn failed_category_upgrade_keeps_legacy_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    // Too old to rebuild from: no post_tax_total column.
    conn.execute_batch(
        r#"
        CREATE TABLE purchases(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_date TEXT NOT NULL,
            year INTEGER NOT NULL, month INTEGER NOT NULL, day INTEGER NOT NULL,
            name TEXT NOT NULL,
            quantity REAL NOT NULL,
            category TEXT
        );
        CREATE TABLE category_stats(
            category TEXT PRIMARY KEY, quantity REAL, total REAL
        );
        INSERT INTO category_stats VALUES ('Kitchen', 3, 60);
        "#,
    )
    .unwrap();

    db::init_schema(&mut conn).unwrap();

    assert_eq!(
        db::table_columns(&conn, "category_stats").unwrap(),
        vec!["category", "quantity", "total"]
    );
    let total: f64 = conn
        .query_row(
            "SELECT total FROM category_stats WHERE category='Kitchen'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(total, 60.0);
    // the other tables still get created
    assert!(db::table_columns(&conn, "grand_total").unwrap().len() >= 4);
    assert!(db::table_columns(&conn, "purchases").unwrap().iter().any(|c| c == "place"));
}
