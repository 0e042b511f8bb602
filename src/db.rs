// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregates;
use crate::errors::{LedgerError, LedgerResult};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Shoplog", "shoplog"));

/// Placeholder written into rows that predate the `place` column.
pub const UNKNOWN_PLACE: &str = "unknown";

fn project_dirs() -> LedgerResult<ProjectDirs> {
    ProjectDirs::from(APP.0, APP.1, APP.2).ok_or_else(|| {
        LedgerError::Config("Could not determine platform-specific data dir".into())
    })
}

pub fn default_storage_dir() -> LedgerResult<PathBuf> {
    Ok(project_dirs()?.data_dir().join("shopping_history"))
}

pub fn default_config_path() -> LedgerResult<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

pub fn ledger_path(storage_dir: &Path, entry_id: &str) -> PathBuf {
    storage_dir.join(format!("shopping_data_{}.sqlite", entry_id))
}

pub fn open_ledger(path: &Path) -> LedgerResult<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(path)?;
    init_schema(&mut conn)?;
    info!(path = %path.display(), "ledger opened");
    Ok(conn)
}

/// Creates every table that is missing and upgrades older layouts in place.
/// Migration failures are logged and leave the existing schema untouched.
pub fn init_schema(conn: &mut Connection) -> LedgerResult<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS purchases(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_date TEXT NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        day INTEGER NOT NULL,
        name TEXT NOT NULL,
        place TEXT DEFAULT 'unknown',
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
    "#,
    )?;

    if let Err(e) = add_place_column(conn) {
        error!(error = %e, "place column migration failed; keeping existing schema");
    }

    conn.execute_batch(
        r#"
    CREATE INDEX IF NOT EXISTS idx_purchases_year_month ON purchases(year, month);
    CREATE INDEX IF NOT EXISTS idx_purchases_category ON purchases(year, category);

    CREATE TABLE IF NOT EXISTS monthly_stats(
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        order_count INTEGER NOT NULL,
        quantity REAL NOT NULL,
        total REAL NOT NULL,
        PRIMARY KEY (year, month)
    );

    CREATE TABLE IF NOT EXISTS yearly_stats(
        year INTEGER PRIMARY KEY,
        order_count INTEGER NOT NULL,
        quantity REAL NOT NULL,
        total REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS category_stats(
        year INTEGER NOT NULL,
        category TEXT NOT NULL,
        order_count INTEGER NOT NULL,
        quantity REAL NOT NULL,
        total REAL NOT NULL,
        PRIMARY KEY (year, category)
    );

    CREATE TABLE IF NOT EXISTS grand_total(
        id INTEGER PRIMARY KEY CHECK (id = 1),
        order_count INTEGER NOT NULL,
        quantity REAL NOT NULL,
        total REAL NOT NULL
    );
    "#,
    )?;

    if let Err(e) = upgrade_category_stats(conn) {
        error!(error = %e, "category_stats migration failed; keeping existing schema");
    }
    Ok(())
}

pub fn table_columns(conn: &Connection, table: &str) -> LedgerResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(1))?;
    let mut cols = Vec::new();
    for row in rows {
        cols.push(row?);
    }
    Ok(cols)
}

fn add_place_column(conn: &Connection) -> LedgerResult<()> {
    let cols = table_columns(conn, "purchases").map_err(|e| LedgerError::Migration(e.to_string()))?;
    if cols.iter().any(|c| c == "place") {
        return Ok(());
    }
    conn.execute(
        &format!(
            "ALTER TABLE purchases ADD COLUMN place TEXT DEFAULT '{}'",
            UNKNOWN_PLACE
        ),
        [],
    )
    .map_err(|e| LedgerError::Migration(e.to_string()))?;
    info!("added place column to purchases");
    Ok(())
}

/// Older ledgers kept one category row for all years. Those rows are derived,
/// so the table is recreated year-scoped and refilled from the ledger.
fn upgrade_category_stats(conn: &mut Connection) -> LedgerResult<()> {
    let cols =
        table_columns(conn, "category_stats").map_err(|e| LedgerError::Migration(e.to_string()))?;
    if cols.iter().any(|c| c == "year") {
        return Ok(());
    }
    let tx = conn
        .transaction()
        .map_err(|e| LedgerError::Migration(e.to_string()))?;
    tx.execute_batch(
        r#"
        DROP TABLE category_stats;
        CREATE TABLE category_stats(
            year INTEGER NOT NULL,
            category TEXT NOT NULL,
            order_count INTEGER NOT NULL,
            quantity REAL NOT NULL,
            total REAL NOT NULL,
            PRIMARY KEY (year, category)
        );
        "#,
    )
    .map_err(|e| LedgerError::Migration(e.to_string()))?;
    aggregates::rebuild_categories(&tx).map_err(|e| LedgerError::Migration(e.to_string()))?;
    tx.commit()
        .map_err(|e| LedgerError::Migration(e.to_string()))?;
    info!("category_stats upgraded to per-year rows");
    Ok(())
}
