// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The `add_order` / `delete_order` command boundary.
//!
//! Each command validates its payload, routes to the owning ledger through
//! the registry, runs the write plus aggregate refresh as one transaction on
//! the blocking pool, and then notifies that ledger's subscribers. Failures
//! are logged here and reported as a [`CommandOutcome`]; nothing escapes.

use crate::errors::{LedgerError, LedgerResult};
use crate::notify::{ChangeKind, LedgerChanged};
use crate::orders::{self, AddOrderCall, DeleteOrderCall};
use crate::registry::LedgerRegistry;
use crate::utils::today;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Added { order_id: i64 },
    Deleted { order_id: i64 },
    NotFound { order_id: i64 },
    Failed { reason: String },
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CommandOutcome::Added { .. } | CommandOutcome::Deleted { .. }
        )
    }
}

pub struct OrderService {
    registry: Arc<LedgerRegistry>,
    clock: fn() -> NaiveDate,
}

impl OrderService {
    pub fn new(registry: Arc<LedgerRegistry>) -> Self {
        Self::with_clock(registry, today)
    }

    /// `clock` supplies the purchase date when a payload has none.
    pub fn with_clock(registry: Arc<LedgerRegistry>, clock: fn() -> NaiveDate) -> Self {
        Self { registry, clock }
    }

    pub fn registry(&self) -> &Arc<LedgerRegistry> {
        &self.registry
    }

    pub async fn add_order(&self, payload: &Value) -> CommandOutcome {
        match self.try_add_order(payload).await {
            Ok(order_id) => CommandOutcome::Added { order_id },
            Err(e) => {
                log_failure("add_order", &e);
                CommandOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub async fn delete_order(&self, payload: &Value) -> CommandOutcome {
        match self.try_delete_order(payload).await {
            Ok(order_id) => CommandOutcome::Deleted { order_id },
            Err(LedgerError::NotFound(order_id)) => {
                warn!(order_id, "delete_order: no such order, nothing recomputed");
                CommandOutcome::NotFound { order_id }
            }
            Err(e) => {
                log_failure("delete_order", &e);
                CommandOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Same as [`OrderService::add_order`] but hands the error back instead of
    /// logging it.
    pub async fn try_add_order(&self, payload: &Value) -> LedgerResult<i64> {
        let call = AddOrderCall::from_payload(payload)?;
        let handle = self.registry.get(&call.entry_id)?;
        let detail = call.order.normalize((self.clock)())?;
        let name = detail.name.clone();
        let order_id = handle
            .run(move |conn| orders::insert_order(conn, &detail))
            .await?;
        info!(entry_id = %call.entry_id, order_id, name = %name, "order added");
        handle.notify(LedgerChanged {
            entry_id: call.entry_id,
            kind: ChangeKind::Added,
            order_id,
        });
        Ok(order_id)
    }

    pub async fn try_delete_order(&self, payload: &Value) -> LedgerResult<i64> {
        let call = DeleteOrderCall::from_payload(payload)?;
        let handle = self.registry.get(&call.entry_id)?;
        let order_id = call.order_id;
        let removed = handle
            .run(move |conn| orders::delete_order(conn, order_id))
            .await?;
        info!(
            entry_id = %call.entry_id,
            order_id,
            name = %removed.detail.name,
            "order deleted"
        );
        handle.notify(LedgerChanged {
            entry_id: call.entry_id,
            kind: ChangeKind::Deleted,
            order_id,
        });
        Ok(order_id)
    }
}

fn log_failure(command: &str, e: &LedgerError) {
    match e {
        LedgerError::Validation(_) => warn!(command, error = %e, "rejected before any write"),
        LedgerError::UnknownInstance(_) => error!(command, error = %e, "unknown ledger instance"),
        _ if e.is_storage() => error!(command, error = %e, "storage failure, nothing committed"),
        _ => error!(command, error = %e, "command failed"),
    }
}
