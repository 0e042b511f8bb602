// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::required;
use crate::config::Settings;
use crate::db;
use crate::utils::pretty_table;
use anyhow::Result;
use std::path::Path;

pub fn handle(
    settings: &mut Settings,
    config_path: &Path,
    storage_dir: &Path,
    m: &clap::ArgMatches,
) -> Result<()> {
    match m.subcommand() {
        Some(("list", _)) => {
            let data = settings
                .instances
                .iter()
                .map(|i| {
                    vec![
                        i.entry_id.clone(),
                        i.friendly_name.clone(),
                        db::ledger_path(storage_dir, &i.entry_id)
                            .display()
                            .to_string(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Entry", "Name", "Ledger"], data));
        }
        Some(("rm", sub)) => {
            let id = required(sub, "id")?.trim();
            if settings.remove_instance(id) {
                settings.save(config_path)?;
                println!("Removed instance '{}' (ledger file kept)", id);
            } else {
                println!("No instance '{}' configured", id);
            }
        }
        _ => {}
    }
    Ok(())
}
