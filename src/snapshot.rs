// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate;
use crate::cache::{Clock, TtlCache, SNAPSHOT_TTL_SECS};
use crate::classify::{self, CATEGORY_RULES, DEFAULT_CATEGORY, HIDDEN_CATEGORY};
use crate::config::SectionRegistry;
use crate::db;
use crate::models::{
    AccountBalance, Alert, AlertLevel, DashboardResponse, Filters, GroupSummary, Indicator, Kpi,
    Snapshot, Totals,
};
use crate::period::{self, ResolvedPeriod};
use crate::rates::RateProvider;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use log::error;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sign convention applied to raw debit/credit sums for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Debit,
    Credit,
}

/// Composes period resolution, section config, aggregation and rate
/// normalization into cacheable snapshots. One service instance owns the
/// process-wide snapshot cache; ledger-mutating events call
/// `invalidate_snapshots`.
pub struct DashboardService<'c> {
    conn: &'c Connection,
    registry: SectionRegistry,
    rates: RateProvider<'c>,
    snapshots: TtlCache<Snapshot>,
    expenses: TtlCache<ExpenseBreakdown>,
    today: NaiveDate,
}

impl<'c> DashboardService<'c> {
    pub fn new(
        conn: &'c Connection,
        registry: SectionRegistry,
        rates: RateProvider<'c>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        DashboardService {
            conn,
            registry,
            rates,
            snapshots: TtlCache::new(SNAPSHOT_TTL_SECS, clock.clone()),
            expenses: TtlCache::new(SNAPSHOT_TTL_SECS, clock),
            today: Utc::now().date_naive(),
        }
    }

    /// Fixed "today" for deterministic period resolution under test.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    /// Coarse bulk invalidation, fired on submit/cancel of any
    /// ledger-mutating document.
    pub fn invalidate_snapshots(&self) {
        self.snapshots.invalidate_all();
        self.expenses.invalidate_all();
    }

    /// The per-section query operation behind every dashboard endpoint.
    /// Failures inside the build are caught here and converted into a
    /// structured failure response; they never propagate to the transport
    /// and are never cached.
    pub fn get_dashboard_data(
        &self,
        section: &str,
        company: Option<&str>,
        period_name: Option<&str>,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
        fiscal_year: Option<&str>,
    ) -> DashboardResponse<Snapshot> {
        let fiscal = match self.fiscal_bounds(fiscal_year) {
            Ok(f) => f,
            Err(err) => return self.fail(section, err),
        };
        let resolved =
            match period::resolve(period_name, from_date, to_date, fiscal, self.today) {
                Ok(p) => p,
                Err(err) => return self.fail(section, err.into()),
            };

        let filters = Filters {
            company: company.map(str::to_string),
            period: resolved.label.clone(),
            from_date: resolved.from_date,
            to_date: resolved.to_date,
        };

        // Keyed on the resolved bounds, not the raw period label, so "This
        // Month" cannot leak a stale entry across a month boundary.
        let key = format!(
            "snapshot:{}:{}:{}:{}",
            section,
            company.unwrap_or(""),
            resolved.from_date,
            resolved.to_date
        );
        let built = self
            .snapshots
            .get_or_build(&key, || self.build_snapshot(section, company, &resolved));
        match built {
            Ok(snapshot) => DashboardResponse::ok(filters, snapshot),
            Err(err) => self.fail(section, err),
        }
    }

    fn fail<T>(&self, section: &str, err: anyhow::Error) -> DashboardResponse<T> {
        error!("{} - get_dashboard_data: {}", section, err);
        DashboardResponse::failure(err.to_string())
    }

    fn fiscal_bounds(
        &self,
        fiscal_year: Option<&str>,
    ) -> Result<Option<(NaiveDate, NaiveDate)>> {
        match fiscal_year {
            Some(name) => db::fiscal_year_bounds(self.conn, name),
            None => Ok(None),
        }
    }

    fn build_snapshot(
        &self,
        section: &str,
        company: Option<&str>,
        period: &ResolvedPeriod,
    ) -> Result<Snapshot> {
        let mapping = self.registry.section(section)?;

        // Balance-sheet sections report positions as of the period end;
        // only the P&L section sums movements inside the period itself.
        let cumulative = section != "pl_performance_dashboard";

        let mut groups = Vec::new();
        let mut grand_total = Totals::default();
        for (key, group) in &mapping {
            let polarity = group_polarity(section, key);
            let exclude_closing = profit_scope(section, key);
            let summary = self.build_group(
                key,
                &group.label,
                &group.accounts,
                company,
                period,
                polarity,
                cumulative,
                exclude_closing,
            )?;
            grand_total.merge(&summary.totals);
            groups.push(summary);
        }

        let kpis = self.section_kpis(section, &groups, &grand_total);
        let alerts = section_alerts(section, &kpis);

        Ok(Snapshot {
            section: section.to_string(),
            kpis,
            groups,
            grand_total,
            alerts,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_group(
        &self,
        key: &str,
        label: &Option<String>,
        accounts: &[String],
        company: Option<&str>,
        period: &ResolvedPeriod,
        polarity: Polarity,
        cumulative: bool,
        exclude_closing: bool,
    ) -> Result<GroupSummary> {
        let accounts = self.expand_groups(accounts)?;
        let movements = if cumulative {
            aggregate::aggregate_through(
                self.conn,
                &accounts,
                period.to_date,
                company,
                exclude_closing,
            )?
        } else {
            aggregate::aggregate(
                self.conn,
                &accounts,
                period.from_date,
                period.to_date,
                company,
                true,
                exclude_closing,
            )?
        };

        let mut balances = Vec::new();
        let mut totals = Totals::default();
        for account in &accounts {
            let Some(movement) = movements.get(account) else {
                continue;
            };
            let balance = match polarity {
                Polarity::Debit => movement.net(),
                Polarity::Credit => movement.net_credit(),
            };
            let currency = if movement.currency.is_empty() {
                self.rates.base_currency().to_string()
            } else {
                movement.currency.clone()
            };
            let base_balance = self.rates.convert(balance, &currency, period.to_date);
            totals.add(&currency, balance, base_balance);
            balances.push(AccountBalance {
                account: account.clone(),
                balance,
                currency,
                base_balance,
            });
        }

        // Largest movements first; stable, so configured order breaks ties.
        balances.sort_by(|a, b| b.base_balance.abs().cmp(&a.base_balance.abs()));

        Ok(GroupSummary {
            key: key.to_string(),
            label: label.clone().unwrap_or_else(|| key.to_string()),
            accounts,
            balances,
            totals,
        })
    }

    /// A configured group account stands for its leaf descendants.
    fn expand_groups(&self, accounts: &[String]) -> Result<Vec<String>> {
        let mut expanded = Vec::with_capacity(accounts.len());
        for name in accounts {
            let is_group = aggregate::load_account(self.conn, name)?
                .map(|a| a.is_group)
                .unwrap_or(false);
            if is_group {
                for leaf in aggregate::leaf_accounts_under(self.conn, name)? {
                    expanded.push(leaf.name);
                }
            } else {
                expanded.push(name.clone());
            }
        }
        Ok(expanded)
    }

    fn section_kpis(&self, section: &str, groups: &[GroupSummary], grand: &Totals) -> Vec<Kpi> {
        let total = |key: &str| group_totals(groups, key);

        match section {
            "cash_liquidity_dashboard" => {
                let mut cash = total("treasury");
                cash.merge(&total("banks"));
                let cards = total("credit_cards");
                let facilities = total("facilities");
                let net_liquidity = cash.base - facilities.base.max(Decimal::ZERO);
                vec![
                    kpi("total_cash", "Total available liquidity", cash, Indicator::Positive),
                    kpi(
                        "credit_cards",
                        "Credit card balance",
                        cards.clone(),
                        indicator_if(cards.base < Decimal::ZERO, Indicator::Warning),
                    ),
                    kpi(
                        "facilities",
                        "Facilities and loans",
                        facilities.clone(),
                        indicator_if(facilities.base > Decimal::ZERO, Indicator::Danger),
                    ),
                    kpi(
                        "net_liquidity",
                        "Net liquidity after commitments",
                        base_only(net_liquidity),
                        if net_liquidity >= Decimal::ZERO {
                            Indicator::Positive
                        } else {
                            Indicator::Danger
                        },
                    ),
                ]
            }
            "receivables_dashboard" => {
                let cheques = total("outstanding_cheques");
                let overdue = total("overdue");
                vec![
                    kpi("customers", "Customer balances", total("customers"), Indicator::Info),
                    kpi("notes", "Notes receivable", total("notes_receivable"), Indicator::Info),
                    kpi(
                        "cheques",
                        "Cheques under collection",
                        cheques.clone(),
                        indicator_if(cheques.base > Decimal::ZERO, Indicator::Warning),
                    ),
                    kpi(
                        "overdue",
                        "Overdue balance (>30 days)",
                        overdue.clone(),
                        if overdue.base > Decimal::ZERO {
                            Indicator::Danger
                        } else {
                            Indicator::Positive
                        },
                    ),
                ]
            }
            "pl_performance_dashboard" => {
                let direct_income = total("direct_income");
                let indirect_income = total("indirect_income");
                let direct_expenses = total("direct_expenses");
                let indirect_expenses = total("indirect_expenses");
                let net_profit = direct_income.base + indirect_income.base
                    + direct_expenses.base
                    + indirect_expenses.base;
                vec![
                    kpi("direct_income", "Direct income", direct_income, Indicator::Positive),
                    kpi("indirect_income", "Indirect income", indirect_income, Indicator::Info),
                    kpi("direct_expenses", "Direct expenses", direct_expenses, Indicator::Info),
                    kpi(
                        "indirect_expenses",
                        "Indirect expenses",
                        indirect_expenses,
                        Indicator::Info,
                    ),
                    kpi(
                        "net_profit",
                        "Net profit",
                        base_only(net_profit),
                        if net_profit >= Decimal::ZERO {
                            Indicator::Positive
                        } else {
                            Indicator::Danger
                        },
                    ),
                ]
            }
            "equity_profit_dashboard" => {
                let mut kpis = vec![kpi(
                    "total_equity",
                    "Total equity",
                    grand.clone(),
                    if grand.base >= Decimal::ZERO {
                        Indicator::Positive
                    } else {
                        Indicator::Danger
                    },
                )];
                kpis.extend(group_kpis(groups));
                kpis
            }
            "executive_control_center" => {
                let cash = total("total_cash");
                let wc_assets = total("wc_assets");
                let wc_liabilities = total("wc_liabilities");
                let net_profit = total("net_profit");
                let critical = total("critical_commitments");
                let net_wc = wc_assets.base - wc_liabilities.base;
                vec![
                    kpi("total_cash", "Total liquidity", cash, Indicator::Positive),
                    kpi(
                        "net_working_capital",
                        "Net working capital",
                        base_only(net_wc),
                        indicator_if(net_wc < Decimal::ZERO, Indicator::Danger),
                    ),
                    kpi(
                        "net_profit",
                        "Cumulative net profit",
                        net_profit.clone(),
                        if net_profit.base >= Decimal::ZERO {
                            Indicator::Positive
                        } else {
                            Indicator::Warning
                        },
                    ),
                    kpi(
                        "critical_commitments",
                        "Critical commitments",
                        critical.clone(),
                        indicator_if(critical.base > Decimal::ZERO, Indicator::Danger),
                    ),
                ]
            }
            "liabilities_dashboard" => {
                let mut kpis = vec![kpi(
                    "total_liabilities",
                    "Total liabilities",
                    grand.clone(),
                    indicator_if(grand.base > Decimal::ZERO, Indicator::Danger),
                )];
                kpis.extend(group_kpis(groups));
                kpis
            }
            _ => {
                let mut kpis = group_kpis(groups);
                kpis.push(kpi("grand_total", "Grand total", grand.clone(), Indicator::Info));
                kpis
            }
        }
    }

    /// Classifier-driven expense categorization with optional
    /// previous-period comparison; the companion operation to the section
    /// snapshots.
    pub fn get_expense_breakdown(
        &self,
        company: Option<&str>,
        period_name: Option<&str>,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
        include_zero: bool,
        compare_to_previous: bool,
    ) -> DashboardResponse<ExpenseBreakdown> {
        let resolved = match period::resolve(period_name, from_date, to_date, None, self.today) {
            Ok(p) => p,
            Err(err) => return self.fail("expenses", err.into()),
        };
        let filters = Filters {
            company: company.map(str::to_string),
            period: resolved.label.clone(),
            from_date: resolved.from_date,
            to_date: resolved.to_date,
        };
        let key = format!(
            "expenses:{}:{}:{}:{}:{}",
            company.unwrap_or(""),
            resolved.from_date,
            resolved.to_date,
            include_zero,
            compare_to_previous
        );
        let built = self.expenses.get_or_build(&key, || {
            self.build_expense_breakdown(company, &resolved, include_zero, compare_to_previous)
        });
        match built {
            Ok(data) => DashboardResponse::ok(filters, data),
            Err(err) => self.fail("expenses", err),
        }
    }

    fn build_expense_breakdown(
        &self,
        company: Option<&str>,
        period: &ResolvedPeriod,
        include_zero: bool,
        compare_to_previous: bool,
    ) -> Result<ExpenseBreakdown> {
        let accounts = aggregate::fetch_leaf_accounts(self.conn, Some("Expense"), company)?;
        let names: Vec<String> = accounts.iter().map(|a| a.name.clone()).collect();
        let base_currency = self.rates.base_currency().to_string();

        // Expenses report gross debits, no credit netting; closing vouchers
        // are sweep mechanics, not spend.
        let current = aggregate::aggregate(
            self.conn,
            &names,
            period.from_date,
            period.to_date,
            company,
            true,
            true,
        )?;
        let previous = if compare_to_previous {
            aggregate::aggregate(
                self.conn,
                &names,
                period.previous_from_date,
                period.previous_to_date,
                company,
                true,
                true,
            )?
        } else {
            Default::default()
        };

        let mut buckets: BTreeMap<&str, ExpenseCategoryBucket> = BTreeMap::new();
        for rule in CATEGORY_RULES {
            buckets.insert(
                rule.key,
                ExpenseCategoryBucket {
                    key: rule.key.to_string(),
                    label: rule.label.to_string(),
                    color: rule.color.to_string(),
                    accounts: Vec::new(),
                    total_base: Decimal::ZERO,
                    previous_total_base: Decimal::ZERO,
                    by_currency: BTreeMap::new(),
                    percentage: Decimal::ZERO,
                    percent_change: None,
                },
            );
        }

        let threshold = Decimal::new(1, 2); // 0.01
        let mut hidden_accounts = Vec::new();
        let mut grand_total = Decimal::ZERO;
        let mut previous_grand_total = Decimal::ZERO;

        for account in &accounts {
            let category = classify::classify(account);
            if category == HIDDEN_CATEGORY {
                hidden_accounts.push(account.name.clone());
                continue;
            }
            // Free-form overrides without a configured bucket fold into the
            // default one.
            let category_key = if buckets.contains_key(category.as_str()) {
                category.as_str()
            } else {
                DEFAULT_CATEGORY
            };

            let zero = Default::default();
            let cur = current.get(&account.name).unwrap_or(&zero);
            let prev = previous.get(&account.name).unwrap_or(&zero);
            let currency = if cur.currency.is_empty() {
                account.account_currency.clone()
            } else {
                cur.currency.clone()
            };

            if !include_zero && !compare_to_previous && cur.debit_base.abs() < threshold {
                continue;
            }
            if !include_zero
                && compare_to_previous
                && cur.debit_base.abs() < threshold
                && prev.debit_base.abs() < threshold
            {
                continue;
            }

            let row = ExpenseAccountRow {
                account: account.name.clone(),
                account_name: account.account_name.clone(),
                company: account.company.clone(),
                balance: cur.debit,
                currency: currency.clone(),
                balance_base: cur.debit_base,
                sort_order: account.dashboard_sort_order,
                category: category_key.to_string(),
                manual_category: account.dashboard_category.clone(),
                previous_balance: compare_to_previous.then_some(prev.debit),
                previous_balance_base: compare_to_previous.then_some(prev.debit_base),
                difference_base: compare_to_previous.then_some(cur.debit_base - prev.debit_base),
            };

            if let Some(bucket) = buckets.get_mut(category_key) {
                bucket.total_base += cur.debit_base;
                bucket.previous_total_base += prev.debit_base;
                *bucket
                    .by_currency
                    .entry(currency)
                    .or_insert(Decimal::ZERO) += cur.debit;
                bucket.accounts.push(row);
            }
            grand_total += cur.debit_base;
            previous_grand_total += prev.debit_base;
        }

        // Category order is the rule order, not the map order.
        let mut categories = Vec::new();
        for rule in CATEGORY_RULES {
            let Some(mut bucket) = buckets.remove(rule.key) else {
                continue;
            };
            if bucket.accounts.is_empty() {
                continue;
            }
            bucket
                .accounts
                .sort_by(|a, b| (a.sort_order, &a.account_name).cmp(&(b.sort_order, &b.account_name)));
            if !grand_total.is_zero() {
                bucket.percentage = (bucket.total_base / grand_total * Decimal::new(100, 0)).round_dp(2);
            }
            if compare_to_previous && bucket.previous_total_base.abs() > threshold {
                bucket.percent_change = Some(
                    ((bucket.total_base - bucket.previous_total_base) / bucket.previous_total_base
                        * Decimal::new(100, 0))
                    .round_dp(2),
                );
            }
            categories.push(bucket);
        }

        let percent_change = if compare_to_previous && previous_grand_total.abs() > threshold {
            Some(
                ((grand_total - previous_grand_total) / previous_grand_total
                    * Decimal::new(100, 0))
                .round_dp(2),
            )
        } else {
            None
        };

        Ok(ExpenseBreakdown {
            period_label: period.label.clone(),
            from_date: period.from_date,
            to_date: period.to_date,
            grand_total,
            categories,
            hidden_accounts,
            base_currency,
            comparison: ExpenseComparison {
                enabled: compare_to_previous,
                previous_from_date: period.previous_from_date,
                previous_to_date: period.previous_to_date,
                previous_grand_total,
                difference: grand_total - previous_grand_total,
                percent_change,
            },
        })
    }
}

/// Category buckets over debit-only expense totals for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseBreakdown {
    pub period_label: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub grand_total: Decimal,
    pub categories: Vec<ExpenseCategoryBucket>,
    pub hidden_accounts: Vec<String>,
    pub base_currency: String,
    pub comparison: ExpenseComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseCategoryBucket {
    pub key: String,
    pub label: String,
    pub color: String,
    pub accounts: Vec<ExpenseAccountRow>,
    pub total_base: Decimal,
    pub previous_total_base: Decimal,
    pub by_currency: BTreeMap<String, Decimal>,
    pub percentage: Decimal,
    pub percent_change: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseAccountRow {
    pub account: String,
    pub account_name: String,
    pub company: Option<String>,
    pub balance: Decimal,
    pub currency: String,
    pub balance_base: Decimal,
    pub sort_order: i64,
    pub category: String,
    pub manual_category: Option<String>,
    pub previous_balance: Option<Decimal>,
    pub previous_balance_base: Option<Decimal>,
    pub difference_base: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseComparison {
    pub enabled: bool,
    pub previous_from_date: NaiveDate,
    pub previous_to_date: NaiveDate,
    pub previous_grand_total: Decimal,
    pub difference: Decimal,
    pub percent_change: Option<Decimal>,
}

/// Groups whose totals are profit or equity figures. Period closing
/// vouchers must not count there: they only sweep P&L balances into
/// retained earnings, and counting them zeroes every closed year.
fn profit_scope(section: &str, group_key: &str) -> bool {
    match section {
        "pl_performance_dashboard" | "equity_profit_dashboard" => true,
        "executive_control_center" => group_key == "net_profit",
        _ => false,
    }
}

/// Liability-style groups report credit-positive balances; everything else
/// reports debit-positive.
fn group_polarity(section: &str, group_key: &str) -> Polarity {
    match section {
        "pl_performance_dashboard" | "equity_profit_dashboard" | "liabilities_dashboard" => {
            Polarity::Credit
        }
        "executive_control_center" => match group_key {
            "wc_liabilities" | "critical_commitments" | "net_profit" => Polarity::Credit,
            _ => Polarity::Debit,
        },
        // Drawn facilities are owed money: report them credit-positive so
        // the net-liquidity deduction reads naturally.
        "cash_liquidity_dashboard" if group_key == "facilities" => Polarity::Credit,
        _ => Polarity::Debit,
    }
}

fn group_totals(groups: &[GroupSummary], key: &str) -> Totals {
    groups
        .iter()
        .find(|g| g.key == key)
        .map(|g| g.totals.clone())
        .unwrap_or_default()
}

fn group_kpis(groups: &[GroupSummary]) -> Vec<Kpi> {
    groups
        .iter()
        .map(|g| kpi(&g.key, &g.label, g.totals.clone(), Indicator::Info))
        .collect()
}

fn kpi(key: &str, label: &str, totals: Totals, indicator: Indicator) -> Kpi {
    Kpi {
        key: key.to_string(),
        label: label.to_string(),
        totals,
        indicator,
    }
}

fn base_only(base: Decimal) -> Totals {
    Totals {
        by_currency: BTreeMap::new(),
        base,
    }
}

fn indicator_if(breached: bool, level: Indicator) -> Indicator {
    if breached {
        level
    } else {
        Indicator::Info
    }
}

/// Threshold breaches become human-readable alerts; a snapshot never
/// carries an empty alert list.
fn section_alerts(section: &str, kpis: &[Kpi]) -> Vec<Alert> {
    let kpi_base = |key: &str| {
        kpis.iter()
            .find(|k| k.key == key)
            .map(|k| k.totals.base)
            .unwrap_or(Decimal::ZERO)
    };

    let mut alerts = Vec::new();
    match section {
        "executive_control_center" => {
            if kpi_base("total_cash") < kpi_base("critical_commitments") {
                alerts.push(Alert {
                    level: AlertLevel::Danger,
                    message: "Liquidity is below critical commitments; review the funding plan."
                        .to_string(),
                });
            }
            if kpi_base("net_working_capital") < Decimal::ZERO {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    message: "Net working capital is negative; expect short-term funding pressure."
                        .to_string(),
                });
            }
        }
        "cash_liquidity_dashboard" => {
            if kpi_base("net_liquidity") < Decimal::ZERO {
                alerts.push(Alert {
                    level: AlertLevel::Danger,
                    message: "Net liquidity after commitments is negative.".to_string(),
                });
            }
        }
        "receivables_dashboard" => {
            if kpi_base("overdue") > Decimal::ZERO {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    message: "Receivables overdue beyond 30 days are outstanding.".to_string(),
                });
            }
        }
        "pl_performance_dashboard" => {
            if kpi_base("net_profit") < Decimal::ZERO {
                alerts.push(Alert {
                    level: AlertLevel::Danger,
                    message: "The period closed at a net loss.".to_string(),
                });
            }
        }
        _ => {}
    }

    if alerts.is_empty() {
        alerts.push(Alert {
            level: AlertLevel::Info,
            message: "No current alerts.".to_string(),
        });
    }
    alerts
}
