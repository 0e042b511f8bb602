// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Context, required};
use crate::models::PurchaseRecord;
use crate::orders::{OrderFilter, list_orders};
use anyhow::{Result, bail};
use std::path::Path;

pub async fn handle(ctx: &Context, m: &clap::ArgMatches) -> Result<()> {
    let fmt = required(m, "format")?.to_lowercase();
    let out = required(m, "out")?.trim().to_string();
    let rows = ctx
        .handle()?
        .run(|conn| list_orders(conn, &OrderFilter::default()))
        .await?;
    export_orders(&rows, &fmt, Path::new(&out))?;
    println!("Exported {} orders to {}", rows.len(), out);
    Ok(())
}

const CSV_HEADER: [&str; 18] = [
    "id",
    "purchase_date",
    "name",
    "place",
    "quantity",
    "unit_price",
    "pre_tax_total",
    "vat_percent",
    "vat_amount",
    "post_tax_total",
    "model",
    "status",
    "category",
    "manufacturer",
    "warranty_months",
    "warranty_end",
    "year",
    "month",
];

pub fn export_orders(rows: &[PurchaseRecord], fmt: &str, out: &Path) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(CSV_HEADER)?;
            for r in rows {
                let d = &r.detail;
                wtr.write_record([
                    r.id.to_string(),
                    d.purchase_date.to_string(),
                    d.name.clone(),
                    d.place.clone(),
                    d.quantity.to_string(),
                    d.unit_price.to_string(),
                    d.pre_tax_total.to_string(),
                    d.vat_percent.to_string(),
                    d.vat_amount.to_string(),
                    d.post_tax_total.to_string(),
                    d.model.clone(),
                    d.status.clone(),
                    d.category.clone(),
                    d.manufacturer.clone(),
                    d.warranty_months.to_string(),
                    d.warranty_end.map(|w| w.to_string()).unwrap_or_default(),
                    d.year.to_string(),
                    d.month.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(rows)?)?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(())
}
