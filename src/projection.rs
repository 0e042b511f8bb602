// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only views over the aggregates, and discovery of which views exist.

use crate::aggregates;
use crate::errors::LedgerResult;
use crate::models::{PurchaseDetail, Totals};
use crate::notify::LedgerChanged;
use crate::orders::{OrderFilter, list_orders};
use crate::registry::LedgerHandle;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

pub const DEFAULT_FRIENDLY_NAME: &str = "Shopping History";

/// Identity of one aggregate view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    GrandTotal,
    Year { year: i32 },
    Month { year: i32, month: u32 },
    Category { year: i32, category: String },
    Place { year: i32, place: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub scope: Scope,
    pub name: String,
    pub unique_id: String,
    pub icon: &'static str,
}

impl Projection {
    pub fn new(entry_id: &str, friendly_name: &str, scope: Scope) -> Self {
        let (name, unique_id, icon) = match &scope {
            Scope::GrandTotal => (
                format!("{} Total", friendly_name),
                format!("{}_grand_total", entry_id),
                "mdi:cart-outline",
            ),
            Scope::Year { year } => (
                format!("{} Year {}", friendly_name, year),
                format!("{}_year_{}", entry_id, year),
                "mdi:calendar-range",
            ),
            Scope::Month { year, month } => (
                format!("{} Month {}/{}", friendly_name, month, year),
                format!("{}_month_{}_{}", entry_id, year, month),
                "mdi:calendar-month",
            ),
            Scope::Category { year, category } => (
                format!("{} {} {}", friendly_name, category, year),
                format!("{}_cat_{}_{}", entry_id, category, year),
                "mdi:shape",
            ),
            Scope::Place { year, place } => (
                format!("{} {} {}", friendly_name, place, year),
                format!("{}_place_{}_{}", entry_id, place, year),
                "mdi:store-marker",
            ),
        };
        Projection {
            scope,
            name,
            unique_id,
            icon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
    /// Matching purchases, newest first, without their ledger ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<PurchaseDetail>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionValue {
    /// Post-tax total truncated to whole currency units.
    pub native_value: i64,
    pub attributes: ProjectionAttributes,
}

fn items(conn: &Connection, filter: OrderFilter) -> LedgerResult<Vec<PurchaseDetail>> {
    Ok(list_orders(conn, &filter)?
        .into_iter()
        .map(|r| r.detail)
        .collect())
}

/// Current value of `scope`. A scope with no stored row reads as zero.
pub fn read(conn: &Connection, scope: &Scope, with_items: bool) -> LedgerResult<ProjectionValue> {
    let mut attrs = ProjectionAttributes {
        year: None,
        month: None,
        category: None,
        place: None,
        totals: Totals::default(),
        items: None,
    };
    let mut filter = OrderFilter::default();
    match scope {
        Scope::GrandTotal => {
            attrs.totals = aggregates::grand_total(conn)?.totals;
        }
        Scope::Year { year } => {
            attrs.year = Some(*year);
            attrs.totals = aggregates::yearly(conn, *year)?.totals;
            filter.year = Some(*year);
        }
        Scope::Month { year, month } => {
            attrs.year = Some(*year);
            attrs.month = Some(*month);
            attrs.totals = aggregates::monthly(conn, *year, *month)?.totals;
            filter.year = Some(*year);
            filter.month = Some(*month);
        }
        Scope::Category { year, category } => {
            attrs.year = Some(*year);
            attrs.category = Some(category.clone());
            attrs.totals = aggregates::category(conn, *year, category)?.totals;
            filter.year = Some(*year);
            filter.category = Some(category.clone());
        }
        Scope::Place { year, place } => {
            attrs.year = Some(*year);
            attrs.place = Some(place.clone());
            attrs.totals = aggregates::place(conn, *year, place)?;
            filter.year = Some(*year);
            filter.place = Some(place.clone());
        }
    }
    if with_items && *scope != Scope::GrandTotal {
        attrs.items = Some(items(conn, filter)?);
    }
    Ok(ProjectionValue {
        native_value: attrs.totals.total.trunc() as i64,
        attributes: attrs,
    })
}

/// Every scope the stores currently know about. Years and months come from
/// their aggregate tables, categories and places from the ledger.
pub fn discover(conn: &Connection) -> LedgerResult<BTreeSet<Scope>> {
    let mut out = BTreeSet::new();
    out.insert(Scope::GrandTotal);

    let mut stmt = conn.prepare("SELECT year FROM yearly_stats")?;
    for row in stmt.query_map([], |r| r.get::<_, i32>(0))? {
        out.insert(Scope::Year { year: row? });
    }

    let mut stmt = conn.prepare("SELECT year, month FROM monthly_stats")?;
    for row in stmt.query_map([], |r| Ok((r.get::<_, i32>(0)?, r.get::<_, u32>(1)?)))? {
        let (year, month) = row?;
        out.insert(Scope::Month { year, month });
    }

    let mut stmt = conn.prepare(
        "SELECT DISTINCT year, category FROM purchases WHERE category IS NOT NULL AND category != ''",
    )?;
    for row in stmt.query_map([], |r| Ok((r.get::<_, i32>(0)?, r.get::<_, String>(1)?)))? {
        let (year, category) = row?;
        out.insert(Scope::Category { year, category });
    }

    let mut stmt = conn.prepare(
        "SELECT DISTINCT year, place FROM purchases WHERE place IS NOT NULL AND place != ''",
    )?;
    for row in stmt.query_map([], |r| Ok((r.get::<_, i32>(0)?, r.get::<_, String>(1)?)))? {
        let (year, place) = row?;
        out.insert(Scope::Place { year, place });
    }
    Ok(out)
}

/// Remembers which scopes were already surfaced. Scopes are never retracted.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    known: BTreeSet<Scope>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `discovered` and returns only the scopes not seen before, in
    /// scope order.
    pub fn reconcile(&mut self, discovered: BTreeSet<Scope>) -> Vec<Scope> {
        let mut fresh = Vec::new();
        for scope in discovered {
            if !self.known.contains(&scope) {
                self.known.insert(scope.clone());
                fresh.push(scope);
            }
        }
        fresh
    }

    pub fn known(&self) -> &BTreeSet<Scope> {
        &self.known
    }
}

/// The projections surfaced for one ledger instance.
#[derive(Debug)]
pub struct LedgerProjections {
    entry_id: String,
    friendly_name: String,
    tracker: ScopeTracker,
    projections: BTreeMap<Scope, Projection>,
}

impl LedgerProjections {
    pub fn new(entry_id: &str, friendly_name: &str) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            friendly_name: friendly_name.to_string(),
            tracker: ScopeTracker::new(),
            projections: BTreeMap::new(),
        }
    }

    pub fn projections(&self) -> impl Iterator<Item = &Projection> {
        self.projections.values()
    }

    pub fn get(&self, scope: &Scope) -> Option<&Projection> {
        self.projections.get(scope)
    }

    /// Runs discovery against the ledger and returns the newly surfaced
    /// projections. Call once at startup and again after each change.
    pub async fn sync(&mut self, handle: &LedgerHandle) -> LedgerResult<Vec<Projection>> {
        let discovered = handle.run(|conn| discover(conn)).await?;
        let fresh = self.tracker.reconcile(discovered);
        let mut added = Vec::with_capacity(fresh.len());
        for scope in fresh {
            let p = Projection::new(&self.entry_id, &self.friendly_name, scope.clone());
            self.projections.insert(scope, p.clone());
            added.push(p);
        }
        if !added.is_empty() {
            info!(entry_id = %self.entry_id, count = added.len(), "new projections discovered");
        }
        Ok(added)
    }

    /// Waits for the next change notification, then reconciles. `None` once
    /// the instance has been unloaded.
    pub async fn next_change(
        &mut self,
        handle: &LedgerHandle,
        rx: &mut UnboundedReceiver<LedgerChanged>,
    ) -> Option<LedgerResult<Vec<Projection>>> {
        rx.recv().await?;
        // Collapse a burst of notifications into one rescan.
        while rx.try_recv().is_ok() {}
        Some(self.sync(handle).await)
    }

    pub async fn read(
        &self,
        handle: &LedgerHandle,
        scope: &Scope,
        with_items: bool,
    ) -> LedgerResult<ProjectionValue> {
        let scope = scope.clone();
        handle.run(move |conn| read(conn, &scope, with_items)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_emits_only_delta() {
        let mut t = ScopeTracker::new();
        let first: BTreeSet<Scope> = [Scope::GrandTotal, Scope::Year { year: 2025 }].into();
        assert_eq!(t.reconcile(first.clone()).len(), 2);
        assert!(t.reconcile(first).is_empty());

        let second: BTreeSet<Scope> = [Scope::Year { year: 2026 }].into();
        assert_eq!(t.reconcile(second), vec![Scope::Year { year: 2026 }]);
        assert_eq!(t.known().len(), 3);
    }

    #[test]
    fn projection_naming() {
        let p = Projection::new("home", "Shop", Scope::Month { year: 2025, month: 1 });
        assert_eq!(p.name, "Shop Month 1/2025");
        assert_eq!(p.unique_id, "home_month_2025_1");
        let p = Projection::new(
            "home",
            "Shop",
            Scope::Category {
                year: 2025,
                category: "Electronics".into(),
            },
        );
        assert_eq!(p.name, "Shop Electronics 2025");
        assert_eq!(p.unique_id, "home_cat_Electronics_2025");
    }
}
