// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{LedgerError, LedgerResult};
use anyhow::Result;
use chrono::{Local, Months, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};

pub fn parse_date(s: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", s))
    })
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Calendar-month addition; days past the end of the target month are
/// clamped to its last day (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> LedgerResult<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        LedgerError::validation(format!("{} + {} months is out of range", date, months))
    })
}

/// Instance ids end up in file names, so only a conservative alphabet is
/// accepted.
pub fn validate_entry_id(id: &str) -> LedgerResult<()> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LedgerError::validation(format!(
            "Invalid entry id '{}', expected [A-Za-z0-9_-]+",
            id
        )));
    }
    Ok(())
}

pub fn fmt_money(v: f64) -> String {
    format!("{:.2}", v)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(d("2025-01-31"), 1).unwrap(), d("2025-02-28"));
        assert_eq!(add_months(d("2024-01-31"), 1).unwrap(), d("2024-02-29"));
        assert_eq!(add_months(d("2025-01-15"), 24).unwrap(), d("2027-01-15"));
        assert_eq!(add_months(d("2025-11-30"), 3).unwrap(), d("2026-02-28"));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("2025-13-01").is_err());
        assert!(parse_date("15/01/2025").is_err());
        assert_eq!(d(" 2025-01-15 "), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }

    #[test]
    fn entry_ids() {
        assert!(validate_entry_id("home_01-a").is_ok());
        assert!(validate_entry_id("").is_err());
        assert!(validate_entry_id("../etc").is_err());
        assert!(validate_entry_id("a b").is_err());
    }
}
