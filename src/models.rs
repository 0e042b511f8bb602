// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// A stored ledger row. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRecord {
    pub id: i64,
    #[serde(flatten)]
    pub detail: PurchaseDetail,
}

/// Every ledger column except the id; this is also the itemized view
/// handed to projection consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseDetail {
    pub purchase_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub name: String,
    pub place: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub pre_tax_total: f64,
    pub vat_percent: f64,
    pub vat_amount: f64,
    pub post_tax_total: f64,
    pub model: String,
    pub status: String,
    pub category: String,
    pub manufacturer: String,
    pub warranty_months: u32,
    #[serde(serialize_with = "empty_when_none")]
    pub warranty_end: Option<NaiveDate>,
}

fn empty_when_none<S: Serializer>(d: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
        None => s.serialize_str(""),
    }
}

/// The three measures every aggregate carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub order_count: i64,
    pub quantity: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyAggregate {
    pub year: i32,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Category totals are scoped per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub year: i32,
    pub category: String,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrandTotal {
    #[serde(flatten)]
    pub totals: Totals,
}
