// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Derived summary tables.
//!
//! Every aggregate row is recomputed from the ledger slice it summarises and
//! then replaced wholesale. Rows are never adjusted by deltas, and a scope
//! that drops to zero purchases keeps a zeroed row instead of being deleted.

use crate::errors::LedgerResult;
use crate::models::{CategoryAggregate, GrandTotal, MonthlyAggregate, Totals, YearlyAggregate};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

const MEASURES: &str =
    "SELECT COUNT(*), COALESCE(SUM(quantity), 0.0), COALESCE(SUM(post_tax_total), 0.0) FROM purchases";

fn totals_from_row(r: &Row<'_>) -> rusqlite::Result<Totals> {
    Ok(Totals {
        order_count: r.get(0)?,
        quantity: r.get(1)?,
        total: r.get(2)?,
    })
}

pub fn recompute_month(conn: &Connection, year: i32, month: u32) -> LedgerResult<Totals> {
    let t = conn.query_row(
        &format!("{} WHERE year=?1 AND month=?2", MEASURES),
        params![year, month],
        totals_from_row,
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO monthly_stats(year, month, order_count, quantity, total)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![year, month, t.order_count, t.quantity, t.total],
    )?;
    Ok(t)
}

pub fn recompute_year(conn: &Connection, year: i32) -> LedgerResult<Totals> {
    let t = conn.query_row(
        &format!("{} WHERE year=?1", MEASURES),
        params![year],
        totals_from_row,
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO yearly_stats(year, order_count, quantity, total)
         VALUES (?1, ?2, ?3, ?4)",
        params![year, t.order_count, t.quantity, t.total],
    )?;
    Ok(t)
}

pub fn recompute_category(conn: &Connection, year: i32, category: &str) -> LedgerResult<Totals> {
    let t = conn.query_row(
        &format!("{} WHERE year=?1 AND category=?2", MEASURES),
        params![year, category],
        totals_from_row,
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO category_stats(year, category, order_count, quantity, total)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![year, category, t.order_count, t.quantity, t.total],
    )?;
    Ok(t)
}

pub fn recompute_grand_total(conn: &Connection) -> LedgerResult<Totals> {
    let t = conn.query_row(MEASURES, [], totals_from_row)?;
    conn.execute("DELETE FROM grand_total", [])?;
    conn.execute(
        "INSERT INTO grand_total(id, order_count, quantity, total) VALUES (1, ?1, ?2, ?3)",
        params![t.order_count, t.quantity, t.total],
    )?;
    Ok(t)
}

/// Refreshes the four scopes touched by a ledger change, in the fixed order
/// month, year, category, grand total. Callers run this inside the same
/// transaction as the ledger write. An empty category has no category scope.
pub fn refresh_scopes(
    conn: &Connection,
    year: i32,
    month: u32,
    category: Option<&str>,
) -> LedgerResult<()> {
    recompute_month(conn, year, month)?;
    recompute_year(conn, year)?;
    if let Some(cat) = category.filter(|c| !c.is_empty()) {
        recompute_category(conn, year, cat)?;
    }
    recompute_grand_total(conn)?;
    Ok(())
}

pub fn rebuild_categories(conn: &Connection) -> LedgerResult<()> {
    conn.execute("DELETE FROM category_stats", [])?;
    conn.execute(
        "INSERT INTO category_stats(year, category, order_count, quantity, total)
         SELECT year, category, COUNT(*), COALESCE(SUM(quantity), 0.0), COALESCE(SUM(post_tax_total), 0.0)
         FROM purchases WHERE category IS NOT NULL AND category != ''
         GROUP BY year, category",
        [],
    )?;
    Ok(())
}

/// Recomputes every scope present in the ledger. Existing rows whose scope no
/// longer has purchases are zeroed, not removed.
pub fn rebuild_all(conn: &Connection) -> LedgerResult<()> {
    conn.execute(
        "UPDATE monthly_stats SET order_count=0, quantity=0.0, total=0.0",
        [],
    )?;
    conn.execute(
        "UPDATE yearly_stats SET order_count=0, quantity=0.0, total=0.0",
        [],
    )?;
    conn.execute(
        "UPDATE category_stats SET order_count=0, quantity=0.0, total=0.0",
        [],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO monthly_stats(year, month, order_count, quantity, total)
         SELECT year, month, COUNT(*), COALESCE(SUM(quantity), 0.0), COALESCE(SUM(post_tax_total), 0.0)
         FROM purchases GROUP BY year, month",
        [],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO yearly_stats(year, order_count, quantity, total)
         SELECT year, COUNT(*), COALESCE(SUM(quantity), 0.0), COALESCE(SUM(post_tax_total), 0.0)
         FROM purchases GROUP BY year",
        [],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO category_stats(year, category, order_count, quantity, total)
         SELECT year, category, COUNT(*), COALESCE(SUM(quantity), 0.0), COALESCE(SUM(post_tax_total), 0.0)
         FROM purchases WHERE category IS NOT NULL AND category != ''
         GROUP BY year, category",
        [],
    )?;
    recompute_grand_total(conn)?;
    Ok(())
}

// Reads. A missing row is a zero value, never an error.

pub fn monthly(conn: &Connection, year: i32, month: u32) -> LedgerResult<MonthlyAggregate> {
    let totals = conn
        .query_row(
            "SELECT order_count, quantity, total FROM monthly_stats WHERE year=?1 AND month=?2",
            params![year, month],
            totals_from_row,
        )
        .optional()?
        .unwrap_or_default();
    Ok(MonthlyAggregate {
        year,
        month,
        totals,
    })
}

pub fn yearly(conn: &Connection, year: i32) -> LedgerResult<YearlyAggregate> {
    let totals = conn
        .query_row(
            "SELECT order_count, quantity, total FROM yearly_stats WHERE year=?1",
            params![year],
            totals_from_row,
        )
        .optional()?
        .unwrap_or_default();
    Ok(YearlyAggregate { year, totals })
}

pub fn category(conn: &Connection, year: i32, category: &str) -> LedgerResult<CategoryAggregate> {
    let totals = conn
        .query_row(
            "SELECT order_count, quantity, total FROM category_stats WHERE year=?1 AND category=?2",
            params![year, category],
            totals_from_row,
        )
        .optional()?
        .unwrap_or_default();
    Ok(CategoryAggregate {
        year,
        category: category.to_string(),
        totals,
    })
}

pub fn grand_total(conn: &Connection) -> LedgerResult<GrandTotal> {
    let totals = conn
        .query_row(
            "SELECT order_count, quantity, total FROM grand_total WHERE id=1",
            [],
            totals_from_row,
        )
        .optional()?
        .unwrap_or_default();
    Ok(GrandTotal { totals })
}

/// Place totals have no table; they are summed from the ledger on demand.
pub fn place(conn: &Connection, year: i32, place: &str) -> LedgerResult<Totals> {
    let t = conn.query_row(
        &format!("{} WHERE year=?1 AND place=?2", MEASURES),
        params![year, place],
        totals_from_row,
    )?;
    Ok(t)
}

/// A stored aggregate that disagrees with a fresh recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drift {
    pub scope: String,
    pub stored: Totals,
    pub expected: Totals,
}

const EPSILON: f64 = 1e-6;

fn same(a: &Totals, b: &Totals) -> bool {
    a.order_count == b.order_count
        && (a.quantity - b.quantity).abs() < EPSILON
        && (a.total - b.total).abs() < EPSILON
}

/// Compares every stored aggregate row, plus every scope present in the
/// ledger, against the ledger itself. Does not write.
pub fn check_drift(conn: &Connection) -> LedgerResult<Vec<Drift>> {
    let mut out = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT year, month FROM monthly_stats
         UNION SELECT DISTINCT year, month FROM purchases
         ORDER BY 1, 2",
    )?;
    let months = stmt.query_map([], |r| Ok((r.get::<_, i32>(0)?, r.get::<_, u32>(1)?)))?;
    for row in months {
        let (y, m) = row?;
        let stored = monthly(conn, y, m)?.totals;
        let expected = conn.query_row(
            &format!("{} WHERE year=?1 AND month=?2", MEASURES),
            params![y, m],
            totals_from_row,
        )?;
        if !same(&stored, &expected) {
            out.push(Drift {
                scope: format!("month {}-{:02}", y, m),
                stored,
                expected,
            });
        }
    }

    let mut stmt = conn.prepare(
        "SELECT year FROM yearly_stats UNION SELECT DISTINCT year FROM purchases ORDER BY 1",
    )?;
    let years = stmt.query_map([], |r| r.get::<_, i32>(0))?;
    for row in years {
        let y = row?;
        let stored = yearly(conn, y)?.totals;
        let expected = conn.query_row(
            &format!("{} WHERE year=?1", MEASURES),
            params![y],
            totals_from_row,
        )?;
        if !same(&stored, &expected) {
            out.push(Drift {
                scope: format!("year {}", y),
                stored,
                expected,
            });
        }
    }

    let mut stmt = conn.prepare(
        "SELECT year, category FROM category_stats
         UNION SELECT DISTINCT year, category FROM purchases
               WHERE category IS NOT NULL AND category != ''
         ORDER BY 1, 2",
    )?;
    let cats = stmt.query_map([], |r| Ok((r.get::<_, i32>(0)?, r.get::<_, String>(1)?)))?;
    for row in cats {
        let (y, c) = row?;
        let stored = category(conn, y, &c)?.totals;
        let expected = conn.query_row(
            &format!("{} WHERE year=?1 AND category=?2", MEASURES),
            params![y, &c],
            totals_from_row,
        )?;
        if !same(&stored, &expected) {
            out.push(Drift {
                scope: format!("category {} {}", c, y),
                stored,
                expected,
            });
        }
    }

    let stored = grand_total(conn)?.totals;
    let expected = conn.query_row(MEASURES, [], totals_from_row)?;
    if !same(&stored, &expected) {
        out.push(Drift {
            scope: "grand total".into(),
            stored,
            expected,
        });
    }
    Ok(out)
}
