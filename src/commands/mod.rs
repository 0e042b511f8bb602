// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod doctor;
pub mod exporter;
pub mod instances;
pub mod orders;
pub mod stats;

use crate::registry::LedgerHandle;
use crate::service::OrderService;
use anyhow::{Context as _, Result};
use std::sync::Arc;

/// What every ledger-bound command needs: the routed service and the
/// instance it was invoked for.
pub struct Context {
    pub service: OrderService,
    pub entry_id: String,
    pub friendly_name: String,
}

impl Context {
    pub fn handle(&self) -> Result<Arc<LedgerHandle>> {
        Ok(self.service.registry().get(&self.entry_id)?)
    }
}

pub(crate) fn required<'a>(m: &'a clap::ArgMatches, id: &str) -> Result<&'a String> {
    m.get_one::<String>(id)
        .with_context(|| format!("missing required argument '{}'", id))
}
