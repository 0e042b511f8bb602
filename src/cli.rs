// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON document per line"),
    )
}

fn items_flag(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("items")
            .long("items")
            .action(ArgAction::SetTrue)
            .help("Include the itemized purchase list"),
    )
}

fn year_arg() -> Arg {
    Arg::new("year")
        .required(true)
        .value_parser(value_parser!(i32))
}

pub fn build_cli() -> Command {
    Command::new("shoplog")
        .about("Purchase history ledger with pre-aggregated statistics")
        .version(clap::crate_version!())
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Configuration file (defaults to the platform config dir)"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .help("Directory holding the per-instance ledgers"),
        )
        .arg(
            Arg::new("entry")
                .long("entry")
                .global(true)
                .help("Ledger instance id"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("init")
                .about("Set up a ledger instance")
                .arg(Arg::new("name").long("name").help("Friendly display name")),
        )
        .subcommand(
            Command::new("instance")
                .about("Configured ledger instances")
                .subcommand(Command::new("list"))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true))),
        )
        .subcommand(
            Command::new("order")
                .about("Record, remove and list purchases")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("place").long("place").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("price").long("price").required(true))
                        .arg(Arg::new("quantity").long("quantity").required(true))
                        .arg(Arg::new("vat").long("vat").help("VAT percent"))
                        .arg(Arg::new("status").long("status").required(true))
                        .arg(Arg::new("model").long("model"))
                        .arg(Arg::new("manufacturer").long("manufacturer"))
                        .arg(Arg::new("warranty-months").long("warranty-months"))
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD, defaults to today")),
                )
                .subcommand(
                    Command::new("delete").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(
                            Arg::new("month")
                                .long("month")
                                .value_parser(value_parser!(u32).range(1..=12)),
                        )
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("place").long("place"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("stats")
                .about("Read aggregate projections")
                .subcommand(json_flags(Command::new("total")))
                .subcommand(json_flags(items_flag(
                    Command::new("year").arg(year_arg()),
                )))
                .subcommand(json_flags(items_flag(
                    Command::new("month").arg(year_arg()).arg(
                        Arg::new("month")
                            .required(true)
                            .value_parser(value_parser!(u32).range(1..=12)),
                    ),
                )))
                .subcommand(json_flags(items_flag(
                    Command::new("category")
                        .arg(year_arg())
                        .arg(Arg::new("category").required(true)),
                )))
                .subcommand(json_flags(items_flag(
                    Command::new("place")
                        .arg(year_arg())
                        .arg(Arg::new("place").required(true)),
                ))),
        )
        .subcommand(json_flags(
            Command::new("scopes").about("Discover every projection the ledger supports"),
        ))
        .subcommand(
            Command::new("export")
                .about("Export the ledger")
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("csv")
                        .help("csv|json"),
                )
                .arg(Arg::new("out").long("out").required(true)),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check stored aggregates against the ledger")
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Rebuild every aggregate table"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        build_cli().debug_assert();
    }
}
