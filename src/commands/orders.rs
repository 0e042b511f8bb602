// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Context, required};
use crate::orders::{OrderFilter, list_orders};
use crate::service::CommandOutcome;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::{Result, bail};
use serde_json::{Map, Value};

pub async fn handle(ctx: &Context, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(ctx, sub).await?,
        Some(("delete", sub)) => delete(ctx, sub).await?,
        Some(("list", sub)) => list(ctx, sub).await?,
        _ => {}
    }
    Ok(())
}

/// Turns the CLI arguments into the same payload a host service call carries.
pub fn add_payload(entry_id: &str, sub: &clap::ArgMatches) -> Result<Value> {
    let mut p = Map::new();
    p.insert("entry_id".into(), Value::from(entry_id));
    for key in ["name", "place", "category", "price", "quantity", "status"] {
        p.insert(key.into(), Value::from(required(sub, key)?.trim()));
    }
    for (arg, key) in [
        ("vat", "vat"),
        ("model", "model"),
        ("manufacturer", "manufacturer"),
        ("warranty-months", "warranty_months"),
        ("date", "purchase_date"),
    ] {
        if let Some(v) = sub.get_one::<String>(arg) {
            p.insert(key.into(), Value::from(v.trim()));
        }
    }
    Ok(Value::Object(p))
}

async fn add(ctx: &Context, sub: &clap::ArgMatches) -> Result<()> {
    let payload = add_payload(&ctx.entry_id, sub)?;
    match ctx.service.add_order(&payload).await {
        CommandOutcome::Added { order_id } => {
            println!("Recorded order #{} in '{}'", order_id, ctx.entry_id);
        }
        CommandOutcome::Failed { reason } => bail!(reason),
        other => bail!("unexpected outcome {:?}", other),
    }
    Ok(())
}

async fn delete(ctx: &Context, sub: &clap::ArgMatches) -> Result<()> {
    let Some(id) = sub.get_one::<i64>("id") else {
        bail!("missing required argument 'id'");
    };
    let payload = serde_json::json!({ "entry_id": ctx.entry_id, "order_id": id });
    match ctx.service.delete_order(&payload).await {
        CommandOutcome::Deleted { order_id } => println!("Deleted order #{}", order_id),
        CommandOutcome::NotFound { order_id } => println!("Order #{} not found", order_id),
        CommandOutcome::Failed { reason } => bail!(reason),
        other => bail!("unexpected outcome {:?}", other),
    }
    Ok(())
}

pub fn filter_from(sub: &clap::ArgMatches) -> OrderFilter {
    OrderFilter {
        year: sub.get_one::<i32>("year").copied(),
        month: sub.get_one::<u32>("month").copied(),
        category: sub.get_one::<String>("category").map(|s| s.trim().to_string()),
        place: sub.get_one::<String>("place").map(|s| s.trim().to_string()),
        limit: sub.get_one::<usize>("limit").copied(),
    }
}

async fn list(ctx: &Context, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let filter = filter_from(sub);
    let data = ctx
        .handle()?
        .run(move |conn| list_orders(conn, &filter))
        .await?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                let d = &r.detail;
                vec![
                    r.id.to_string(),
                    d.purchase_date.to_string(),
                    d.name.clone(),
                    d.place.clone(),
                    d.category.clone(),
                    format!("{}", d.quantity),
                    fmt_money(d.unit_price),
                    format!("{}%", d.vat_percent),
                    fmt_money(d.post_tax_total),
                    d.warranty_end.map(|w| w.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Date", "Item", "Place", "Category", "Qty", "Price", "VAT", "Total",
                    "Warranty",
                ],
                rows,
            )
        );
    }
    Ok(())
}
