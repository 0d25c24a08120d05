// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON instead of a table"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print newline-delimited JSON"),
    )
}

fn period_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("period")
            .long("period")
            .help("Named period: Today, This Week, This Month, Last Month, This Year, Last Year, All Time"),
    )
    .arg(Arg::new("from").long("from").help("Explicit start date (YYYY-MM-DD)"))
    .arg(Arg::new("to").long("to").help("Explicit end date (YYYY-MM-DD)"))
    .arg(Arg::new("company").long("company").help("Restrict to one company"))
}

pub fn build_cli() -> Command {
    Command::new("ledgerboard")
        .about("Balance aggregation and currency normalization for GL dashboards")
        .version(clap::crate_version!())
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Create the database and schema"))
        .subcommand(
            Command::new("account")
                .about("Manage the chart of accounts")
                .subcommand(
                    Command::new("add")
                        .about("Add an account")
                        .arg(Arg::new("name").required(true).help("Unique account id"))
                        .arg(
                            Arg::new("account-name")
                                .long("account-name")
                                .help("Display name (defaults to the id)"),
                        )
                        .arg(Arg::new("parent").long("parent").help("Parent group account"))
                        .arg(
                            Arg::new("root-type")
                                .long("root-type")
                                .help("Asset, Liability, Income, Expense or Equity"),
                        )
                        .arg(Arg::new("type").long("type").help("Account type, e.g. Tax, Fixed Asset"))
                        .arg(
                            Arg::new("currency")
                                .long("currency")
                                .help("Account currency (defaults to the base currency)"),
                        )
                        .arg(Arg::new("company").long("company"))
                        .arg(
                            Arg::new("group")
                                .long("group")
                                .action(ArgAction::SetTrue)
                                .help("Mark as a group (non-posting) account"),
                        )
                        .arg(
                            Arg::new("sort-order")
                                .long("sort-order")
                                .value_parser(clap::value_parser!(i64))
                                .help("Display order inside expense categories"),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("List accounts")
                        .arg(Arg::new("company").long("company"))
                        .arg(Arg::new("root-type").long("root-type")),
                )
                .subcommand(
                    Command::new("set-category")
                        .about("Set the manual dashboard category (use 'Hidden' to exclude)")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("category").required(true)),
                )
                .subcommand(
                    Command::new("disable")
                        .about("Exclude an account from dashboards")
                        .arg(Arg::new("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("posting")
                .about("Record and cancel GL postings")
                .subcommand(
                    Command::new("add")
                        .about("Record one posting leg")
                        .arg(Arg::new("account").required(true))
                        .arg(Arg::new("date").long("date").help("Posting date (defaults to today)"))
                        .arg(
                            Arg::new("debit")
                                .long("debit")
                                .help("Debit amount in the account currency"),
                        )
                        .arg(
                            Arg::new("credit")
                                .long("credit")
                                .help("Credit amount in the account currency"),
                        )
                        .arg(Arg::new("company").long("company"))
                        .arg(Arg::new("voucher-type").long("voucher-type"))
                        .arg(Arg::new("remarks").long("remarks")),
                )
                .subcommand(
                    Command::new("cancel")
                        .about("Cancel a posting (it stops contributing to aggregates)")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("List recent postings")
                        .arg(Arg::new("account").long("account"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(clap::value_parser!(usize)),
                        ),
                ),
        )
        .subcommand(
            Command::new("fx")
                .about("Exchange rates and base currency")
                .subcommand(
                    Command::new("set-base")
                        .about("Set the base (reporting) currency")
                        .arg(Arg::new("currency").required(true)),
                )
                .subcommand(
                    Command::new("fetch")
                        .about("Fetch live rates and store them in the historical table"),
                )
                .subcommand(Command::new("list").about("Show recent stored rates"))
                .subcommand(
                    Command::new("rate")
                        .about("Resolve the effective rate for a currency")
                        .arg(Arg::new("currency").required(true))
                        .arg(Arg::new("date").long("date").help("As-of date (defaults to today)")),
                ),
        )
        .subcommand(
            Command::new("section")
                .about("Inspect the dashboard section configuration")
                .subcommand(Command::new("list").about("List configured sections"))
                .subcommand(
                    Command::new("show")
                        .about("Show the account groups of one section")
                        .arg(Arg::new("key").required(true)),
                ),
        )
        .subcommand(
            Command::new("dashboard")
                .about("Compute dashboard snapshots")
                .subcommand(json_args(period_args(
                    Command::new("show")
                        .about("Build the snapshot for one section")
                        .arg(Arg::new("section").required(true).help("Section key, e.g. cash_liquidity_dashboard"))
                        .arg(
                            Arg::new("fiscal-year")
                                .long("fiscal-year")
                                .help("Use the bounds of a stored fiscal year"),
                        ),
                )))
                .subcommand(json_args(period_args(
                    Command::new("expenses")
                        .about("Categorized expense breakdown")
                        .arg(
                            Arg::new("include-zero")
                                .long("include-zero")
                                .action(ArgAction::SetTrue)
                                .help("Keep accounts with no movement"),
                        )
                        .arg(
                            Arg::new("compare")
                                .long("compare")
                                .action(ArgAction::SetTrue)
                                .help("Compare against the preceding period of equal length"),
                        ),
                ))),
        )
        .subcommand(Command::new("doctor").about("Check the data set for consistency issues"))
}
