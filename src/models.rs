// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chart-of-accounts node. The tree is encoded with lft/rgt bounds so
/// subtree lookups are a single range query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub account_name: String,
    pub parent_account: Option<String>,
    pub root_type: Option<String>,
    pub account_type: Option<String>,
    pub account_currency: String,
    pub company: Option<String>,
    pub is_group: bool,
    pub dashboard_category: Option<String>,
    pub dashboard_sort_order: i64,
    pub disabled: bool,
}

/// One general-ledger movement. Immutable once posted except for the
/// cancelled flag; cancelled entries never contribute to aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlEntry {
    pub id: i64,
    pub account: String,
    pub posting_date: NaiveDate,
    pub debit: Decimal,
    pub credit: Decimal,
    pub debit_in_account_currency: Decimal,
    pub credit_in_account_currency: Decimal,
    pub account_currency: String,
    pub company: Option<String>,
    pub voucher_type: Option<String>,
    pub is_cancelled: bool,
    pub remarks: Option<String>,
}

/// Net movement for one account over one resolved period, in both the
/// account currency and the base currency. Raw debit/credit sums are kept
/// so every dashboard can apply its own sign convention without
/// re-querying.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountMovement {
    pub debit: Decimal,
    pub credit: Decimal,
    pub debit_base: Decimal,
    pub credit_base: Decimal,
    pub currency: String,
}

impl AccountMovement {
    /// Asset/expense polarity.
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    pub fn net_base(&self) -> Decimal {
        self.debit_base - self.credit_base
    }

    /// Income/equity/liability polarity.
    pub fn net_credit(&self) -> Decimal {
        self.credit - self.debit
    }

    pub fn net_credit_base(&self) -> Decimal {
        self.credit_base - self.debit_base
    }
}

/// Derived per-account balance as rendered in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: String,
    pub balance: Decimal,
    pub currency: String,
    pub base_balance: Decimal,
}

/// Totals keyed by currency plus the base-currency sum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub by_currency: BTreeMap<String, Decimal>,
    pub base: Decimal,
}

impl Totals {
    pub fn add(&mut self, currency: &str, amount: Decimal, base_amount: Decimal) {
        *self
            .by_currency
            .entry(currency.to_string())
            .or_insert(Decimal::ZERO) += amount;
        self.base += base_amount;
    }

    pub fn merge(&mut self, other: &Totals) {
        for (ccy, amount) in &other.by_currency {
            *self.by_currency.entry(ccy.clone()).or_insert(Decimal::ZERO) += *amount;
        }
        self.base += other.base;
    }
}

/// Qualitative indicator attached to a KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Positive,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kpi {
    pub key: String,
    pub label: String,
    pub totals: Totals,
    pub indicator: Indicator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

/// One named account group inside a snapshot, balances sorted descending
/// by absolute base amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: String,
    pub label: String,
    pub accounts: Vec<String>,
    pub balances: Vec<AccountBalance>,
    pub totals: Totals,
}

/// The full computed result of one dashboard request. This is the cache
/// entry; it must stay cheaply cloneable and JSON-serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub section: String,
    pub kpis: Vec<Kpi>,
    pub groups: Vec<GroupSummary>,
    pub grand_total: Totals,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filters {
    pub company: Option<String>,
    pub period: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// Wire shape of every dashboard operation: either `{success, filters,
/// data}` or `{success: false, error}`. Failures never raise past this
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashboardResponse<T> {
    Ok {
        success: bool,
        filters: Filters,
        data: T,
    },
    Err {
        success: bool,
        error: String,
    },
}

impl<T> DashboardResponse<T> {
    pub fn ok(filters: Filters, data: T) -> Self {
        DashboardResponse::Ok {
            success: true,
            filters,
            data,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        DashboardResponse::Err {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DashboardResponse::Ok { .. })
    }
}
