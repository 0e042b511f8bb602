// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Context;
use crate::aggregates::{self, Drift};
use crate::errors::LedgerResult;
use crate::utils::{fmt_money, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

/// Recompute everything and report what disagreed. With `fix`, every
/// aggregate table is rebuilt in one transaction.
pub fn diagnose(conn: &mut Connection, fix: bool) -> LedgerResult<Vec<Drift>> {
    let drift = aggregates::check_drift(conn)?;
    if fix && !drift.is_empty() {
        let tx = conn.transaction()?;
        aggregates::rebuild_all(&tx)?;
        tx.commit()?;
    }
    Ok(drift)
}

pub async fn handle(ctx: &Context, m: &clap::ArgMatches) -> Result<()> {
    let fix = m.get_flag("fix");
    let drift = ctx.handle()?.run(move |conn| diagnose(conn, fix)).await?;

    if drift.is_empty() {
        println!("✅ doctor: aggregates match the ledger");
        return Ok(());
    }
    for d in &drift {
        warn!(scope = %d.scope, "aggregate drift");
    }
    let rows = drift
        .iter()
        .map(|d| {
            vec![
                d.scope.clone(),
                format!("{} / {}", d.stored.order_count, d.expected.order_count),
                format!("{} / {}", d.stored.quantity, d.expected.quantity),
                format!("{} / {}", fmt_money(d.stored.total), fmt_money(d.expected.total)),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Scope", "Orders (stored/ledger)", "Qty", "Total"],
            rows
        )
    );
    if fix {
        println!("Rebuilt all aggregate tables");
    }
    Ok(())
}
