// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use shoplog::commands::{self, Context};
use shoplog::config::Settings;
use shoplog::registry::LedgerRegistry;
use shoplog::service::OrderService;
use shoplog::{cli, db, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    logging::init_tracing(matches.get_flag("verbose"));

    let config_path = match matches.get_one::<String>("config") {
        Some(p) => PathBuf::from(p),
        None => db::default_config_path()?,
    };
    let mut settings = Settings::load(&config_path)?;
    let storage_dir = match matches.get_one::<String>("data-dir") {
        Some(d) => PathBuf::from(d),
        None => settings.storage_dir()?,
    };
    let entry_id = matches
        .get_one::<String>("entry")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| settings.default_entry_id().to_string());

    let Some((name, sub)) = matches.subcommand() else {
        cli::build_cli().print_help()?;
        println!();
        return Ok(());
    };
    if name == "instance" {
        return commands::instances::handle(&mut settings, &config_path, &storage_dir, sub);
    }

    let registry = Arc::new(LedgerRegistry::new(storage_dir));
    let handle = registry.setup_entry(&entry_id).await?;
    let ctx = Context {
        service: OrderService::new(Arc::clone(&registry)),
        friendly_name: settings.friendly_name(&entry_id).to_string(),
        entry_id: entry_id.clone(),
    };

    match name {
        "init" => {
            let friendly = sub
                .get_one::<String>("name")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| ctx.friendly_name.clone());
            settings.upsert_instance(&entry_id, &friendly)?;
            settings.save(&config_path)?;
            println!(
                "Ledger '{}' ({}) initialized at {}",
                entry_id,
                friendly,
                handle.path().display()
            );
        }
        "order" => commands::orders::handle(&ctx, sub).await?,
        "stats" => commands::stats::handle(&ctx, sub).await?,
        "scopes" => commands::stats::scopes(&ctx, sub).await?,
        "export" => commands::exporter::handle(&ctx, sub).await?,
        "doctor" => commands::doctor::handle(&ctx, sub).await?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }

    registry.unload_entry(&entry_id);
    Ok(())
}
