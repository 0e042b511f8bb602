// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger writes and the payload validation in front of them.

use crate::aggregates;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{PurchaseDetail, PurchaseRecord};
use crate::utils::{add_months, parse_date};
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::{Map, Value};

/// Validated `add_order` input, before any derived field is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct AddOrder {
    pub name: String,
    pub place: String,
    pub category: String,
    pub price: f64,
    pub quantity: f64,
    pub vat: f64,
    pub status: String,
    pub model: String,
    pub manufacturer: String,
    pub warranty_months: u32,
    pub purchase_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddOrderCall {
    pub entry_id: String,
    pub order: AddOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOrderCall {
    pub entry_id: String,
    pub order_id: i64,
}

fn fields(payload: &Value) -> LedgerResult<&Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| LedgerError::validation("payload must be an object"))
}

fn present<'a>(m: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    m.get(key).filter(|v| !v.is_null())
}

fn coerce_string(key: &str, v: &Value) -> LedgerResult<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(LedgerError::validation(format!("'{}' must be a string", key))),
    }
}

fn coerce_real(key: &str, v: &Value) -> LedgerResult<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(x) if x.is_finite() => Ok(x),
        _ => Err(LedgerError::validation(format!("'{}' must be a number", key))),
    }
}

fn coerce_int(key: &str, v: &Value) -> LedgerResult<i64> {
    let parsed = match v {
        // Fractional numbers truncate toward zero; fractional strings do not parse.
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.abs() < 9e15).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| LedgerError::validation(format!("'{}' must be an integer", key)))
}

fn required_string(m: &Map<String, Value>, key: &str) -> LedgerResult<String> {
    let v = present(m, key)
        .ok_or_else(|| LedgerError::validation(format!("'{}' is required", key)))?;
    coerce_string(key, v)
}

fn optional_string(m: &Map<String, Value>, key: &str) -> LedgerResult<String> {
    present(m, key)
        .map(|v| coerce_string(key, v))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn required_real(m: &Map<String, Value>, key: &str) -> LedgerResult<f64> {
    let v = present(m, key)
        .ok_or_else(|| LedgerError::validation(format!("'{}' is required", key)))?;
    coerce_real(key, v)
}

impl AddOrderCall {
    /// Validates a raw `add_order` payload. Nothing is written on failure.
    pub fn from_payload(payload: &Value) -> LedgerResult<Self> {
        let m = fields(payload)?;
        let entry_id = required_string(m, "entry_id")?;

        let quantity = required_real(m, "quantity")?;
        if quantity < 0.0 {
            return Err(LedgerError::validation("'quantity' must not be negative"));
        }
        let vat = match present(m, "vat") {
            Some(v) => coerce_real("vat", v)?,
            None => 0.0,
        };
        // Zero or negative months mean no warranty.
        let warranty_months = match present(m, "warranty_months") {
            Some(v) => match coerce_int("warranty_months", v)? {
                n if n <= 0 => 0,
                n => u32::try_from(n).map_err(|_| {
                    LedgerError::validation("'warranty_months' must be at most 4294967295")
                })?,
            },
            None => 0,
        };
        let purchase_date = match present(m, "purchase_date") {
            Some(v) => {
                let s = coerce_string("purchase_date", v)?;
                if s.trim().is_empty() {
                    None
                } else {
                    Some(parse_date(&s)?)
                }
            }
            None => None,
        };

        Ok(AddOrderCall {
            entry_id,
            order: AddOrder {
                name: required_string(m, "name")?,
                place: required_string(m, "place")?,
                category: required_string(m, "category")?,
                price: required_real(m, "price")?,
                quantity,
                vat,
                status: required_string(m, "status")?,
                model: optional_string(m, "model")?,
                manufacturer: optional_string(m, "manufacturer")?,
                warranty_months,
                purchase_date,
            },
        })
    }
}

impl DeleteOrderCall {
    pub fn from_payload(payload: &Value) -> LedgerResult<Self> {
        let m = fields(payload)?;
        let entry_id = required_string(m, "entry_id")?;
        let order_id = present(m, "order_id")
            .ok_or_else(|| LedgerError::validation("'order_id' is required"))
            .and_then(|v| coerce_int("order_id", v))?;
        Ok(DeleteOrderCall { entry_id, order_id })
    }
}

impl AddOrder {
    /// Fills in every derived column. `today` is used when no purchase date
    /// was given.
    pub fn normalize(&self, today: NaiveDate) -> LedgerResult<PurchaseDetail> {
        let date = self.purchase_date.unwrap_or(today);
        let pre_tax_total = self.price * self.quantity;
        let vat_amount = if self.vat > 0.0 {
            pre_tax_total * self.vat / 100.0
        } else {
            0.0
        };
        let warranty_end = if self.warranty_months > 0 {
            Some(add_months(date, self.warranty_months)?)
        } else {
            None
        };
        Ok(PurchaseDetail {
            purchase_date: date,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            name: self.name.clone(),
            place: self.place.clone(),
            quantity: self.quantity,
            unit_price: self.price,
            pre_tax_total,
            vat_percent: self.vat,
            vat_amount,
            post_tax_total: pre_tax_total + vat_amount,
            model: self.model.clone(),
            status: self.status.clone(),
            category: self.category.clone(),
            manufacturer: self.manufacturer.clone(),
            warranty_months: self.warranty_months,
            warranty_end,
        })
    }
}

/// Inserts one ledger row and refreshes its month, year, category and grand
/// total in the same transaction. Returns the new row id.
pub fn insert_order(conn: &mut Connection, d: &PurchaseDetail) -> LedgerResult<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO purchases(
            purchase_date, year, month, day,
            name, place, quantity, unit_price, pre_tax_total,
            vat_percent, vat_amount, post_tax_total,
            model, status, category, manufacturer,
            warranty_months, warranty_end
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
        params![
            d.purchase_date.to_string(),
            d.year,
            d.month,
            d.day,
            d.name,
            d.place,
            d.quantity,
            d.unit_price,
            d.pre_tax_total,
            d.vat_percent,
            d.vat_amount,
            d.post_tax_total,
            d.model,
            d.status,
            d.category,
            d.manufacturer,
            d.warranty_months,
            d.warranty_end.map(|w| w.to_string()).unwrap_or_default(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    aggregates::refresh_scopes(&tx, d.year, d.month, Some(d.category.as_str()))?;
    tx.commit()?;
    Ok(id)
}

/// Deletes a ledger row and refreshes the scopes it belonged to. An unknown
/// id is reported as [`LedgerError::NotFound`] and nothing is touched.
pub fn delete_order(conn: &mut Connection, order_id: i64) -> LedgerResult<PurchaseRecord> {
    let tx = conn.transaction()?;
    let record = find_order(&tx, order_id)?.ok_or(LedgerError::NotFound(order_id))?;
    tx.execute("DELETE FROM purchases WHERE id=?1", params![order_id])?;
    let d = &record.detail;
    aggregates::refresh_scopes(&tx, d.year, d.month, Some(d.category.as_str()))?;
    tx.commit()?;
    Ok(record)
}

const RECORD_COLUMNS: &str = "id, purchase_date, year, month, day, name, place, quantity, \
     unit_price, pre_tax_total, vat_percent, vat_amount, post_tax_total, model, status, \
     category, manufacturer, warranty_months, warranty_end";

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<PurchaseRecord> {
    let date_raw: String = r.get(1)?;
    let purchase_date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let warranty_raw: Option<String> = r.get(18)?;
    let warranty_end = warranty_raw
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
    Ok(PurchaseRecord {
        id: r.get(0)?,
        detail: PurchaseDetail {
            purchase_date,
            year: r.get(2)?,
            month: r.get(3)?,
            day: r.get(4)?,
            name: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
            place: r.get::<_, Option<String>>(6)?.unwrap_or_default(),
            quantity: r.get(7)?,
            unit_price: r.get(8)?,
            pre_tax_total: r.get(9)?,
            vat_percent: r.get::<_, Option<f64>>(10)?.unwrap_or_default(),
            vat_amount: r.get::<_, Option<f64>>(11)?.unwrap_or_default(),
            post_tax_total: r.get(12)?,
            model: r.get::<_, Option<String>>(13)?.unwrap_or_default(),
            status: r.get::<_, Option<String>>(14)?.unwrap_or_default(),
            category: r.get::<_, Option<String>>(15)?.unwrap_or_default(),
            manufacturer: r.get::<_, Option<String>>(16)?.unwrap_or_default(),
            warranty_months: r.get::<_, Option<u32>>(17)?.unwrap_or_default(),
            warranty_end,
        },
    })
}

pub fn find_order(conn: &Connection, order_id: i64) -> LedgerResult<Option<PurchaseRecord>> {
    let rec = conn
        .query_row(
            &format!("SELECT {} FROM purchases WHERE id=?1", RECORD_COLUMNS),
            params![order_id],
            record_from_row,
        )
        .optional()?;
    Ok(rec)
}

/// Ledger listing filter. Unset fields do not restrict.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub category: Option<String>,
    pub place: Option<String>,
    pub limit: Option<usize>,
}

/// Matching rows, newest purchase first.
pub fn list_orders(conn: &Connection, f: &OrderFilter) -> LedgerResult<Vec<PurchaseRecord>> {
    let mut sql = format!("SELECT {} FROM purchases WHERE 1=1", RECORD_COLUMNS);
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(y) = f.year {
        params_vec.push(Box::new(y));
        sql.push_str(&format!(" AND year=?{}", params_vec.len()));
    }
    if let Some(m) = f.month {
        params_vec.push(Box::new(m));
        sql.push_str(&format!(" AND month=?{}", params_vec.len()));
    }
    if let Some(c) = &f.category {
        params_vec.push(Box::new(c.clone()));
        sql.push_str(&format!(" AND category=?{}", params_vec.len()));
    }
    if let Some(p) = &f.place {
        params_vec.push(Box::new(p.clone()));
        sql.push_str(&format!(" AND place=?{}", params_vec.len()));
    }
    sql.push_str(" ORDER BY purchase_date DESC, id DESC");
    if let Some(limit) = f.limit {
        params_vec.push(Box::new(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
        record_from_row,
    )?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "entry_id": "home",
            "name": "Headphones",
            "place": "Shop",
            "category": "Electronics",
            "price": 100,
            "quantity": "2",
            "vat": 10,
            "status": "new",
            "purchase_date": "2025-01-15"
        })
    }

    #[test]
    fn payload_defaults_and_coercion() {
        let call = AddOrderCall::from_payload(&payload()).unwrap();
        assert_eq!(call.entry_id, "home");
        assert_eq!(call.order.quantity, 2.0);
        assert_eq!(call.order.model, "");
        assert_eq!(call.order.manufacturer, "");
        assert_eq!(call.order.warranty_months, 0);
    }

    #[test]
    fn payload_rejects_missing_and_malformed() {
        let mut p = payload();
        p.as_object_mut().unwrap().remove("price");
        assert!(AddOrderCall::from_payload(&p).unwrap_err().is_validation());

        let mut p = payload();
        p["quantity"] = json!("two");
        assert!(AddOrderCall::from_payload(&p).unwrap_err().is_validation());

        let mut p = payload();
        p["warranty_months"] = json!("1.5");
        assert!(AddOrderCall::from_payload(&p).unwrap_err().is_validation());

        let mut p = payload();
        p["purchase_date"] = json!("yesterday");
        assert!(AddOrderCall::from_payload(&p).unwrap_err().is_validation());

        let mut p = payload();
        p["quantity"] = json!(-1);
        assert!(AddOrderCall::from_payload(&p).unwrap_err().is_validation());

        let mut p = payload();
        p["quantity"] = json!("-0.5");
        assert!(AddOrderCall::from_payload(&p).unwrap_err().is_validation());
    }

    #[test]
    fn non_positive_vat_means_no_vat() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        for vat in [json!(-5), json!("-5"), json!(0)] {
            let mut p = payload();
            p["vat"] = vat;
            let d = AddOrderCall::from_payload(&p)
                .unwrap()
                .order
                .normalize(today)
                .unwrap();
            assert_eq!(d.vat_amount, 0.0);
            assert_eq!(d.post_tax_total, d.pre_tax_total);
            assert_eq!(d.post_tax_total, 200.0);
        }
    }

    #[test]
    fn non_positive_warranty_means_no_warranty() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        for months in [json!(-1), json!("-12"), json!(0)] {
            let mut p = payload();
            p["warranty_months"] = months;
            let call = AddOrderCall::from_payload(&p).unwrap();
            assert_eq!(call.order.warranty_months, 0);
            let d = call.order.normalize(today).unwrap();
            assert_eq!(d.warranty_end, None);
            let row = serde_json::to_value(&d).unwrap();
            assert_eq!(row["warranty_end"], "");
        }
    }

    #[test]
    fn fractional_integer_numbers_truncate() {
        let mut p = payload();
        p["warranty_months"] = json!(12.7);
        let call = AddOrderCall::from_payload(&p).unwrap();
        assert_eq!(call.order.warranty_months, 12);

        let p = json!({"entry_id": "home", "order_id": 7.9});
        assert_eq!(DeleteOrderCall::from_payload(&p).unwrap().order_id, 7);

        let p = json!({"entry_id": "home", "order_id": "7.9"});
        assert!(DeleteOrderCall::from_payload(&p).unwrap_err().is_validation());
    }

    #[test]
    fn normalize_computes_derived_fields() {
        let call = AddOrderCall::from_payload(&payload()).unwrap();
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let d = call.order.normalize(today).unwrap();
        assert_eq!((d.year, d.month, d.day), (2025, 1, 15));
        assert_eq!(d.pre_tax_total, 200.0);
        assert_eq!(d.vat_amount, 20.0);
        assert_eq!(d.post_tax_total, 220.0);
        assert_eq!(d.warranty_end, None);
    }

    #[test]
    fn normalize_defaults_to_today_and_adds_warranty() {
        let mut p = payload();
        p.as_object_mut().unwrap().remove("purchase_date");
        p["warranty_months"] = json!(12);
        let call = AddOrderCall::from_payload(&p).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let d = call.order.normalize(today).unwrap();
        assert_eq!(d.purchase_date, today);
        assert_eq!(d.warranty_end, NaiveDate::from_ymd_opt(2025, 2, 28));
    }

    #[test]
    fn delete_payload() {
        let p = json!({"entry_id": "home", "order_id": "7"});
        let call = DeleteOrderCall::from_payload(&p).unwrap();
        assert_eq!(call.order_id, 7);
        assert!(DeleteOrderCall::from_payload(&json!({"entry_id": "home"})).is_err());
    }
}
