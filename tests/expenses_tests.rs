// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerboard::cache::ManualClock;
use ledgerboard::config::SectionRegistry;
use ledgerboard::db;
use ledgerboard::models::DashboardResponse;
use ledgerboard::rates::{PivotQuote, RateProvider};
use ledgerboard::snapshot::{DashboardService, ExpenseBreakdown};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn add_expense(conn: &Connection, name: &str, category: Option<&str>, sort_order: i64) {
    conn.execute(
        "INSERT INTO accounts(name, account_name, root_type, account_currency,
                              dashboard_category, dashboard_sort_order)
         VALUES (?1, ?1, 'Expense', 'EGP', ?2, ?3)",
        params![name, category, sort_order],
    )
    .unwrap();
}

fn spend(conn: &Connection, account: &str, date: &str, amount: f64) {
    conn.execute(
        "INSERT INTO gl_entries(account, posting_date, debit, credit,
                                debit_in_account_currency, credit_in_account_currency,
                                account_currency)
         VALUES (?1, ?2, ?3, 0, ?3, 0, 'EGP')",
        params![account, date, amount],
    )
    .unwrap();
}

fn service(conn: &Connection) -> (DashboardService<'_>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard_account_groups.json");
    std::fs::write(&path, "{}").unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let registry = SectionRegistry::new(path, clock.clone());
    let rates = RateProvider::new(conn, "EGP", "USD", PivotQuote::default(), None, clock.clone());
    let svc = DashboardService::new(conn, registry, rates, clock).with_today(d(2025, 3, 15));
    (svc, dir)
}

fn breakdown_of(response: DashboardResponse<ExpenseBreakdown>) -> ExpenseBreakdown {
    match response {
        DashboardResponse::Ok { data, .. } => data,
        DashboardResponse::Err { error, .. } => panic!("unexpected failure: {}", error),
    }
}

fn seed(conn: &Connection) {
    add_expense(conn, "Office Rent - Co", None, 1);
    add_expense(conn, "Salaries - Co", None, 2);
    add_expense(conn, "Owner Drawings - Co", Some("Hidden"), 3);
    spend(conn, "Office Rent - Co", "2025-03-05", 3000.0);
    spend(conn, "Salaries - Co", "2025-03-07", 7000.0);
    spend(conn, "Owner Drawings - Co", "2025-03-08", 9999.0);
}

#[test]
fn categorizes_debits_and_excludes_hidden_accounts() {
    let conn = db::open_in_memory().unwrap();
    seed(&conn);
    let (svc, _dir) = service(&conn);

    let data = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, false));

    assert_eq!(data.grand_total, Decimal::from_str("10000").unwrap());
    assert_eq!(data.hidden_accounts, vec!["Owner Drawings - Co".to_string()]);
    assert_eq!(data.base_currency, "EGP");

    let ops = data.categories.iter().find(|c| c.key == "Operations").unwrap();
    assert_eq!(ops.total_base, Decimal::from_str("3000").unwrap());
    assert_eq!(ops.percentage, Decimal::from_str("30").unwrap());
    assert_eq!(ops.accounts[0].account, "Office Rent - Co");

    let hr = data.categories.iter().find(|c| c.key == "HR").unwrap();
    assert_eq!(hr.total_base, Decimal::from_str("7000").unwrap());
    assert_eq!(hr.percentage, Decimal::from_str("70").unwrap());
}

#[test]
fn zero_movement_accounts_are_skipped_unless_requested() {
    let conn = db::open_in_memory().unwrap();
    seed(&conn);
    add_expense(&conn, "Dormant Rent - Co", None, 9);
    let (svc, _dir) = service(&conn);

    let data = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, false));
    let ops = data.categories.iter().find(|c| c.key == "Operations").unwrap();
    assert_eq!(ops.accounts.len(), 1);

    let with_zero = breakdown_of(svc.get_expense_breakdown(None, None, None, None, true, false));
    let ops = with_zero
        .categories
        .iter()
        .find(|c| c.key == "Operations")
        .unwrap();
    assert_eq!(ops.accounts.len(), 2);
    assert_eq!(ops.total_base, Decimal::from_str("3000").unwrap());
}

#[test]
fn comparison_reports_the_preceding_period() {
    let conn = db::open_in_memory().unwrap();
    seed(&conn);
    // February activity: previous period for a March "This Month" request.
    spend(&conn, "Office Rent - Co", "2025-02-10", 2000.0);
    spend(&conn, "Salaries - Co", "2025-02-12", 7000.0);
    let (svc, _dir) = service(&conn);

    let data = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, true));

    assert!(data.comparison.enabled);
    assert_eq!(data.comparison.previous_from_date, d(2025, 2, 1));
    assert_eq!(data.comparison.previous_to_date, d(2025, 2, 28));
    assert_eq!(
        data.comparison.previous_grand_total,
        Decimal::from_str("9000").unwrap()
    );
    assert_eq!(data.comparison.difference, Decimal::from_str("1000").unwrap());
    assert_eq!(
        data.comparison.percent_change,
        Some(Decimal::from_str("11.11").unwrap())
    );

    let ops = data.categories.iter().find(|c| c.key == "Operations").unwrap();
    assert_eq!(ops.previous_total_base, Decimal::from_str("2000").unwrap());
    assert_eq!(ops.percent_change, Some(Decimal::from_str("50").unwrap()));
    assert_eq!(
        ops.accounts[0].difference_base,
        Some(Decimal::from_str("1000").unwrap())
    );

    // HR is flat month over month.
    let hr = data.categories.iter().find(|c| c.key == "HR").unwrap();
    assert_eq!(hr.percent_change, Some(Decimal::from_str("0").unwrap()));
}

#[test]
fn accounts_with_only_previous_activity_survive_comparison() {
    let conn = db::open_in_memory().unwrap();
    add_expense(&conn, "Office Rent - Co", None, 1);
    spend(&conn, "Office Rent - Co", "2025-02-10", 2000.0);
    let (svc, _dir) = service(&conn);

    let data = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, true));
    let ops = data.categories.iter().find(|c| c.key == "Operations").unwrap();
    assert_eq!(ops.accounts.len(), 1);
    assert_eq!(ops.accounts[0].balance_base, Decimal::ZERO);
    assert_eq!(
        ops.accounts[0].previous_balance_base,
        Some(Decimal::from_str("2000").unwrap())
    );

    // Without comparison the dormant account disappears.
    let plain = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, false));
    assert!(!plain.categories.iter().any(|c| c.key == "Operations"));
}

#[test]
fn manual_categories_override_and_sort_order_applies() {
    let conn = db::open_in_memory().unwrap();
    add_expense(&conn, "Misc A - Co", Some("HR"), 5);
    add_expense(&conn, "Salaries - Co", None, 1);
    spend(&conn, "Misc A - Co", "2025-03-05", 100.0);
    spend(&conn, "Salaries - Co", "2025-03-06", 200.0);
    let (svc, _dir) = service(&conn);

    let data = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, false));
    let hr = data.categories.iter().find(|c| c.key == "HR").unwrap();
    assert_eq!(hr.accounts.len(), 2);
    // sort_order 1 before 5 regardless of spend size.
    assert_eq!(hr.accounts[0].account, "Salaries - Co");
    assert_eq!(hr.accounts[1].manual_category.as_deref(), Some("HR"));
}

#[test]
fn unknown_manual_category_folds_into_miscellaneous() {
    let conn = db::open_in_memory().unwrap();
    add_expense(&conn, "Odd - Co", Some("Bespoke Bucket"), 0);
    spend(&conn, "Odd - Co", "2025-03-05", 100.0);
    let (svc, _dir) = service(&conn);

    let data = breakdown_of(svc.get_expense_breakdown(None, None, None, None, false, false));
    let misc = data
        .categories
        .iter()
        .find(|c| c.key == "Miscellaneous")
        .unwrap();
    assert_eq!(misc.accounts[0].account, "Odd - Co");
}
