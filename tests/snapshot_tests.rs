// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerboard::cache::ManualClock;
use ledgerboard::config::SectionRegistry;
use ledgerboard::db;
use ledgerboard::models::{AlertLevel, DashboardResponse, Indicator, Snapshot};
use ledgerboard::rates::{PivotQuote, RateProvider};
use ledgerboard::snapshot::DashboardService;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn add_account(conn: &Connection, name: &str, currency: &str, root_type: &str) {
    conn.execute(
        "INSERT INTO accounts(name, account_name, root_type, account_currency)
         VALUES (?1, ?1, ?2, ?3)",
        params![name, root_type, currency],
    )
    .unwrap();
}

fn post(conn: &Connection, account: &str, date: &str, debit: f64, credit: f64, currency: &str) {
    conn.execute(
        "INSERT INTO gl_entries(account, posting_date, debit, credit,
                                debit_in_account_currency, credit_in_account_currency,
                                account_currency)
         VALUES (?1, ?2, ?3, ?4, ?3, ?4, ?5)",
        params![account, date, debit, credit, currency],
    )
    .unwrap();
}

fn write_config(dir: &tempfile::TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("dashboard_account_groups.json");
    fs::write(&path, json).unwrap();
    path
}

fn service<'c>(
    conn: &'c Connection,
    path: PathBuf,
    clock: Arc<ManualClock>,
) -> DashboardService<'c> {
    let registry = SectionRegistry::new(path, clock.clone());
    let rates = RateProvider::new(conn, "EGP", "USD", PivotQuote::default(), None, clock.clone());
    DashboardService::new(conn, registry, rates, clock).with_today(d(2025, 3, 15))
}

fn snapshot_of(response: DashboardResponse<Snapshot>) -> Snapshot {
    match response {
        DashboardResponse::Ok { data, .. } => data,
        DashboardResponse::Err { error, .. } => panic!("unexpected failure: {}", error),
    }
}

fn kpi_base(snapshot: &Snapshot, key: &str) -> Decimal {
    snapshot
        .kpis
        .iter()
        .find(|k| k.key == key)
        .unwrap_or_else(|| panic!("no kpi '{}'", key))
        .totals
        .base
}

const CASH_CONFIG: &str = r#"{
    "cash_liquidity_dashboard": {
        "treasury": {"name": "Treasury", "accounts": ["Cash USD - Co", "Cash EGP - Co"]},
        "facilities": ["Facility - Co"]
    }
}"#;

fn seed_cash(conn: &Connection) {
    add_account(conn, "Cash USD - Co", "USD", "Asset");
    add_account(conn, "Cash EGP - Co", "EGP", "Asset");
    add_account(conn, "Facility - Co", "EGP", "Liability");
    post(conn, "Cash USD - Co", "2025-03-05", 100.0, 0.0, "USD");
    post(conn, "Cash EGP - Co", "2025-03-10", 500.0, 0.0, "EGP");
    conn.execute(
        "INSERT INTO currency_exchange(date, from_currency, to_currency, rate)
         VALUES ('2025-01-01', 'USD', 'EGP', '50')",
        [],
    )
    .unwrap();
}

#[test]
fn multi_currency_balances_normalize_into_the_base_total() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        Some("This Month"),
        None,
        None,
        None,
    ));

    // 100 USD * 50 + 500 EGP = 5500 EGP.
    assert_eq!(kpi_base(&snap, "total_cash"), Decimal::from_str("5500").unwrap());
    assert_eq!(snap.grand_total.base, Decimal::from_str("5500").unwrap());

    let treasury = snap.groups.iter().find(|g| g.key == "treasury").unwrap();
    assert_eq!(treasury.label, "Treasury");
    assert_eq!(
        treasury.totals.by_currency["USD"],
        Decimal::from_str("100").unwrap()
    );
    assert_eq!(
        treasury.totals.by_currency["EGP"],
        Decimal::from_str("500").unwrap()
    );
    // Sorted by absolute base balance, largest first.
    assert_eq!(treasury.balances[0].account, "Cash USD - Co");
    assert_eq!(
        treasury.balances[0].base_balance,
        Decimal::from_str("5000").unwrap()
    );
}

#[test]
fn alerts_are_never_empty() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(snap.alerts.len(), 1);
    assert_eq!(snap.alerts[0].level, AlertLevel::Info);
    assert_eq!(snap.alerts[0].message, "No current alerts.");
}

#[test]
fn drawn_facilities_reduce_net_liquidity_and_raise_an_alert() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    post(&conn, "Facility - Co", "2025-03-12", 0.0, 6000.0, "EGP");
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));

    assert_eq!(kpi_base(&snap, "facilities"), Decimal::from_str("6000").unwrap());
    assert_eq!(kpi_base(&snap, "net_liquidity"), Decimal::from_str("-500").unwrap());
    let net = snap.kpis.iter().find(|k| k.key == "net_liquidity").unwrap();
    assert_eq!(net.indicator, Indicator::Danger);
    assert!(snap
        .alerts
        .iter()
        .any(|a| a.level == AlertLevel::Danger && a.message.contains("Net liquidity")));
}

#[test]
fn missing_section_config_is_a_structured_failure() {
    let conn = db::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), Arc::new(ManualClock::new(0)));

    let response =
        svc.get_dashboard_data("receivables_dashboard", None, None, None, None, None);
    assert!(!response.is_success());
    match response {
        DashboardResponse::Err { error, .. } => {
            assert!(error.contains("receivables_dashboard"));
        }
        DashboardResponse::Ok { .. } => panic!("expected a failure response"),
    }
}

#[test]
fn invalid_config_document_is_a_structured_failure() {
    let conn = db::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, "{not json"), Arc::new(ManualClock::new(0)));

    let response =
        svc.get_dashboard_data("cash_liquidity_dashboard", None, None, None, None, None);
    assert!(!response.is_success());
}

#[test]
fn snapshots_are_cached_until_invalidated() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), Arc::new(ManualClock::new(0)));

    let first = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(first.grand_total.base, Decimal::from_str("5500").unwrap());

    post(&conn, "Cash EGP - Co", "2025-03-11", 100.0, 0.0, "EGP");

    let cached = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(cached.grand_total.base, Decimal::from_str("5500").unwrap());

    svc.invalidate_snapshots();
    let fresh = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(fresh.grand_total.base, Decimal::from_str("5600").unwrap());
}

#[test]
fn snapshots_expire_with_the_clock() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), clock.clone());

    snapshot_of(svc.get_dashboard_data("cash_liquidity_dashboard", None, None, None, None, None));
    post(&conn, "Cash EGP - Co", "2025-03-11", 100.0, 0.0, "EGP");

    clock.advance(300);
    let fresh = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(fresh.grand_total.base, Decimal::from_str("5600").unwrap());
}

#[test]
fn failures_are_not_cached() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    // Start with no config file at all.
    let path = dir.path().join("dashboard_account_groups.json");
    let svc = service(&conn, path.clone(), clock.clone());

    let response =
        svc.get_dashboard_data("cash_liquidity_dashboard", None, None, None, None, None);
    assert!(!response.is_success());

    // Once the document appears the same request succeeds; the config cache
    // never stored the failure.
    fs::write(&path, CASH_CONFIG).unwrap();
    let response =
        svc.get_dashboard_data("cash_liquidity_dashboard", None, None, None, None, None);
    assert!(response.is_success());
}

#[test]
fn pl_section_uses_credit_polarity() {
    let conn = db::open_in_memory().unwrap();
    add_account(&conn, "Sales - Co", "EGP", "Income");
    add_account(&conn, "Rent - Co", "EGP", "Expense");
    post(&conn, "Sales - Co", "2025-03-05", 0.0, 1000.0, "EGP");
    post(&conn, "Rent - Co", "2025-03-06", 400.0, 0.0, "EGP");

    let config = r#"{
        "pl_performance_dashboard": {
            "direct_income": ["Sales - Co"],
            "direct_expenses": ["Rent - Co"]
        }
    }"#;
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, config), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "pl_performance_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));

    assert_eq!(kpi_base(&snap, "direct_income"), Decimal::from_str("1000").unwrap());
    assert_eq!(kpi_base(&snap, "direct_expenses"), Decimal::from_str("-400").unwrap());
    assert_eq!(kpi_base(&snap, "net_profit"), Decimal::from_str("600").unwrap());
    let net = snap.kpis.iter().find(|k| k.key == "net_profit").unwrap();
    assert_eq!(net.indicator, Indicator::Positive);
}

#[test]
fn year_end_closing_vouchers_do_not_erase_net_profit() {
    let conn = db::open_in_memory().unwrap();
    add_account(&conn, "Sales - Co", "EGP", "Income");
    post(&conn, "Sales - Co", "2025-03-05", 0.0, 1000.0, "EGP");
    // The closing sweep debits the income account back to zero; it is
    // bookkeeping mechanics, not a loss.
    conn.execute(
        "INSERT INTO gl_entries(account, posting_date, debit, credit,
                                debit_in_account_currency, credit_in_account_currency,
                                account_currency, voucher_type)
         VALUES ('Sales - Co', '2025-03-31', 1000, 0, 1000, 0, 'EGP',
                 'Period Closing Voucher')",
        [],
    )
    .unwrap();

    let config = r#"{
        "pl_performance_dashboard": {
            "direct_income": ["Sales - Co"]
        }
    }"#;
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, config), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "pl_performance_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(kpi_base(&snap, "net_profit"), Decimal::from_str("1000").unwrap());
}

#[test]
fn executive_alerts_fire_on_breaches() {
    let conn = db::open_in_memory().unwrap();
    add_account(&conn, "Cash - Co", "EGP", "Asset");
    add_account(&conn, "Stock - Co", "EGP", "Asset");
    add_account(&conn, "Payables - Co", "EGP", "Liability");
    add_account(&conn, "Loan Due - Co", "EGP", "Liability");
    post(&conn, "Cash - Co", "2025-03-03", 1000.0, 0.0, "EGP");
    post(&conn, "Stock - Co", "2025-03-04", 500.0, 0.0, "EGP");
    post(&conn, "Payables - Co", "2025-03-05", 0.0, 800.0, "EGP");
    post(&conn, "Loan Due - Co", "2025-03-06", 0.0, 2000.0, "EGP");

    let config = r#"{
        "executive_control_center": {
            "total_cash": ["Cash - Co"],
            "wc_assets": ["Cash - Co", "Stock - Co"],
            "wc_liabilities": ["Payables - Co"],
            "critical_commitments": ["Loan Due - Co"]
        }
    }"#;
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, config), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "executive_control_center",
        None,
        None,
        None,
        None,
        None,
    ));

    // wc = (1000 + 500) - 800 = 700; cash 1000 < commitments 2000.
    assert_eq!(kpi_base(&snap, "net_working_capital"), Decimal::from_str("700").unwrap());
    assert!(snap
        .alerts
        .iter()
        .any(|a| a.level == AlertLevel::Danger && a.message.contains("critical commitments")));
    assert!(!snap
        .alerts
        .iter()
        .any(|a| a.message.contains("working capital")));
}

#[test]
fn company_filter_flows_into_the_aggregation() {
    let conn = db::open_in_memory().unwrap();
    add_account(&conn, "Cash - Co", "EGP", "Asset");
    conn.execute(
        "INSERT INTO gl_entries(account, posting_date, debit, credit,
                                debit_in_account_currency, credit_in_account_currency,
                                account_currency, company)
         VALUES ('Cash - Co', '2025-03-05', 100, 0, 100, 0, 'EGP', 'Alpha'),
                ('Cash - Co', '2025-03-06', 40, 0, 40, 0, 'EGP', 'Beta')",
        [],
    )
    .unwrap();

    let config = r#"{"cash_liquidity_dashboard": {"treasury": ["Cash - Co"]}}"#;
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, config), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        Some("Alpha"),
        None,
        None,
        None,
        None,
    ));
    assert_eq!(snap.grand_total.base, Decimal::from_str("100").unwrap());
}

#[test]
fn configured_group_accounts_expand_to_their_leaves() {
    let conn = db::open_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO accounts(name, account_name, account_currency, is_group, lft, rgt)
         VALUES ('Banks - Co', 'Banks', 'EGP', 1, 1, 6);
         INSERT INTO accounts(name, account_name, parent_account, account_currency, lft, rgt)
         VALUES ('Bank A - Co', 'Bank A', 'Banks - Co', 'EGP', 2, 3);
         INSERT INTO accounts(name, account_name, parent_account, account_currency, lft, rgt)
         VALUES ('Bank B - Co', 'Bank B', 'Banks - Co', 'EGP', 4, 5);",
    )
    .unwrap();
    post(&conn, "Bank A - Co", "2025-03-05", 300.0, 0.0, "EGP");
    post(&conn, "Bank B - Co", "2025-03-06", 200.0, 0.0, "EGP");

    let config = r#"{"cash_liquidity_dashboard": {"treasury": ["Banks - Co"]}}"#;
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, config), Arc::new(ManualClock::new(0)));

    let snap = snapshot_of(svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        None,
    ));
    assert_eq!(snap.grand_total.base, Decimal::from_str("500").unwrap());
    let treasury = snap.groups.iter().find(|g| g.key == "treasury").unwrap();
    assert_eq!(treasury.accounts, vec!["Bank A - Co", "Bank B - Co"]);
}

#[test]
fn fiscal_year_reference_sets_the_bounds() {
    let conn = db::open_in_memory().unwrap();
    seed_cash(&conn);
    post(&conn, "Cash EGP - Co", "2024-08-01", 70.0, 0.0, "EGP");
    conn.execute(
        "INSERT INTO fiscal_years(name, year_start_date, year_end_date)
         VALUES ('FY 2024-2025', '2024-07-01', '2025-06-30')",
        [],
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let svc = service(&conn, write_config(&dir, CASH_CONFIG), Arc::new(ManualClock::new(0)));

    let response = svc.get_dashboard_data(
        "cash_liquidity_dashboard",
        None,
        None,
        None,
        None,
        Some("FY 2024-2025"),
    );
    match response {
        DashboardResponse::Ok { filters, data, .. } => {
            assert_eq!(filters.from_date, d(2024, 7, 1));
            assert_eq!(filters.to_date, d(2025, 6, 30));
            // The prior-August posting is inside the fiscal window.
            assert_eq!(data.grand_total.base, Decimal::from_str("5570").unwrap());
        }
        DashboardResponse::Err { error, .. } => panic!("unexpected failure: {}", error),
    }
}
