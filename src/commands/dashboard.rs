// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cache::SystemClock;
use crate::config::SectionRegistry;
use crate::models::{AlertLevel, DashboardResponse, Indicator, Snapshot};
use crate::rates::RateProvider;
use crate::snapshot::{DashboardService, ExpenseBreakdown};
use crate::utils::{maybe_print_json, parse_date, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::Arc;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub),
        Some(("expenses", sub)) => expenses(conn, sub),
        _ => Ok(()),
    }
}

fn service(conn: &Connection) -> Result<DashboardService<'_>> {
    let registry = SectionRegistry::default_location()?;
    let rates = RateProvider::from_settings(conn)?;
    Ok(DashboardService::new(
        conn,
        registry,
        rates,
        Arc::new(SystemClock),
    ))
}

struct PeriodArgs<'a> {
    company: Option<&'a str>,
    period: Option<&'a str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

fn period_args(sub: &clap::ArgMatches) -> Result<PeriodArgs<'_>> {
    Ok(PeriodArgs {
        company: sub.get_one::<String>("company").map(String::as_str),
        period: sub.get_one::<String>("period").map(String::as_str),
        from: sub
            .get_one::<String>("from")
            .map(|d| parse_date(d))
            .transpose()?,
        to: sub
            .get_one::<String>("to")
            .map(|d| parse_date(d))
            .transpose()?,
    })
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let section = sub.get_one::<String>("section").unwrap();
    let args = period_args(sub)?;
    let svc = service(conn)?;
    let response = svc.get_dashboard_data(
        section,
        args.company,
        args.period,
        args.from,
        args.to,
        sub.get_one::<String>("fiscal-year").map(String::as_str),
    );

    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &response)? {
        return Ok(());
    }
    match response {
        DashboardResponse::Err { error, .. } => println!("Failed: {}", error),
        DashboardResponse::Ok { filters, data, .. } => {
            println!(
                "{} | {} ({} to {})",
                section, filters.period, filters.from_date, filters.to_date
            );
            print_snapshot(&data);
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    let kpi_rows = snapshot
        .kpis
        .iter()
        .map(|k| {
            vec![
                k.label.clone(),
                k.totals.base.round_dp(2).to_string(),
                indicator_str(k.indicator).to_string(),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["KPI", "Base Amount", "Indicator"], kpi_rows));

    for group in &snapshot.groups {
        if group.balances.is_empty() {
            continue;
        }
        println!("\n{}", group.label);
        let rows = group
            .balances
            .iter()
            .map(|b| {
                vec![
                    b.account.clone(),
                    b.balance.to_string(),
                    b.currency.clone(),
                    b.base_balance.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Account", "Balance", "Currency", "Base"], rows)
        );
    }

    println!("\nGrand total: {}", snapshot.grand_total.base.round_dp(2));
    for alert in &snapshot.alerts {
        println!("[{}] {}", alert_str(alert.level), alert.message);
    }
}

fn expenses(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let args = period_args(sub)?;
    let svc = service(conn)?;
    let response = svc.get_expense_breakdown(
        args.company,
        args.period,
        args.from,
        args.to,
        sub.get_flag("include-zero"),
        sub.get_flag("compare"),
    );

    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &response)? {
        return Ok(());
    }
    match response {
        DashboardResponse::Err { error, .. } => println!("Failed: {}", error),
        DashboardResponse::Ok { data, .. } => print_breakdown(&data),
    }
    Ok(())
}

fn print_breakdown(data: &ExpenseBreakdown) {
    println!(
        "Expenses {} ({} to {}), base {}",
        data.period_label, data.from_date, data.to_date, data.base_currency
    );
    let rows = data
        .categories
        .iter()
        .map(|c| {
            let change = c
                .percent_change
                .map(|p| format!("{}%", p))
                .unwrap_or_default();
            vec![
                c.label.clone(),
                c.accounts.len().to_string(),
                c.total_base.to_string(),
                format!("{}%", c.percentage),
                change,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Accounts", "Total", "Share", "Change"], rows)
    );
    println!("Grand total: {}", data.grand_total);
    if data.comparison.enabled {
        println!(
            "Previous period {} to {}: {} (difference {})",
            data.comparison.previous_from_date,
            data.comparison.previous_to_date,
            data.comparison.previous_grand_total,
            data.comparison.difference
        );
    }
    if !data.hidden_accounts.is_empty() {
        println!("Hidden accounts: {}", data.hidden_accounts.join(", "));
    }
}

fn indicator_str(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Positive => "positive",
        Indicator::Info => "info",
        Indicator::Warning => "warning",
        Indicator::Danger => "danger",
    }
}

fn alert_str(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Info => "info",
        AlertLevel::Warning => "warning",
        AlertLevel::Danger => "danger",
    }
}
