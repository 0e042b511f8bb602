// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Context, required};
use crate::projection::{self, LedgerProjections, ProjectionValue, Scope};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::{Context as _, Result};
use serde::Serialize;

pub async fn handle(ctx: &Context, m: &clap::ArgMatches) -> Result<()> {
    let Some((name, sub)) = m.subcommand() else {
        return Ok(());
    };
    let scope = scope_from(name, sub)?;
    let with_items = sub.try_get_one::<bool>("items").ok().flatten().copied().unwrap_or(false);
    let value = {
        let scope = scope.clone();
        ctx.handle()?
            .run(move |conn| projection::read(conn, &scope, with_items))
            .await?
    };
    let proj = projection::Projection::new(&ctx.entry_id, &ctx.friendly_name, scope);

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &value)? {
        print_value(&proj.name, &value);
    }
    Ok(())
}

pub fn scope_from(name: &str, sub: &clap::ArgMatches) -> Result<Scope> {
    let year = || -> Result<i32> {
        sub.get_one::<i32>("year")
            .copied()
            .context("missing required argument 'year'")
    };
    let scope = match name {
        "total" => Scope::GrandTotal,
        "year" => Scope::Year { year: year()? },
        "month" => Scope::Month {
            year: year()?,
            month: sub
                .get_one::<u32>("month")
                .copied()
                .context("missing required argument 'month'")?,
        },
        "category" => Scope::Category {
            year: year()?,
            category: required(sub, "category")?.trim().to_string(),
        },
        "place" => Scope::Place {
            year: year()?,
            place: required(sub, "place")?.trim().to_string(),
        },
        other => anyhow::bail!("unknown stats scope '{}'", other),
    };
    Ok(scope)
}

fn print_value(title: &str, v: &ProjectionValue) {
    let t = &v.attributes.totals;
    println!(
        "{}",
        pretty_table(
            &["Projection", "Orders", "Quantity", "Total"],
            vec![vec![
                title.to_string(),
                t.order_count.to_string(),
                format!("{}", t.quantity),
                fmt_money(t.total),
            ]],
        )
    );
    if let Some(items) = &v.attributes.items {
        let rows = items
            .iter()
            .map(|d| {
                vec![
                    d.purchase_date.to_string(),
                    d.name.clone(),
                    d.place.clone(),
                    d.category.clone(),
                    format!("{}", d.quantity),
                    fmt_money(d.post_tax_total),
                    d.status.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Item", "Place", "Category", "Qty", "Total", "Status"],
                rows
            )
        );
    }
}

#[derive(Serialize)]
struct ScopeRow {
    #[serde(flatten)]
    projection: projection::Projection,
    native_value: i64,
}

/// Runs discovery once and shows every projection with its current value.
pub async fn scopes(ctx: &Context, m: &clap::ArgMatches) -> Result<()> {
    let handle = ctx.handle()?;
    let mut projections = LedgerProjections::new(&ctx.entry_id, &ctx.friendly_name);
    projections.sync(&handle).await?;

    let mut data = Vec::new();
    for p in projections.projections() {
        let v = projections.read(&handle, &p.scope, false).await?;
        data.push(ScopeRow {
            projection: p.clone(),
            native_value: v.native_value,
        });
    }
    if !maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.projection.name.clone(),
                    r.projection.unique_id.clone(),
                    r.native_value.to_string(),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Projection", "Unique ID", "Value"], rows));
    }
    Ok(())
}
