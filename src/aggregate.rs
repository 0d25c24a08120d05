// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::DashboardError;
use crate::models::{Account, AccountMovement};
use crate::period::ALL_TIME_EPOCH;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Year-end vouchers that sweep P&L balances into retained earnings. They
/// must not count as income or expense movement, or every closed year
/// reports zero profit.
pub const CLOSING_VOUCHER: &str = "Period Closing Voucher";

/// Net ledger movement per account over an inclusive date range.
///
/// Cancelled postings never contribute. With `exclude_closing`, period
/// closing vouchers are filtered out as well; profit and equity callers
/// set it. Accounts with no postings in the range are absent from the
/// result; callers default to zero on lookup. Both debit and credit sums
/// are returned (account currency and base) so each dashboard applies its
/// own sign convention without re-querying.
pub fn aggregate(
    conn: &Connection,
    accounts: &[String],
    from_date: NaiveDate,
    to_date: NaiveDate,
    company: Option<&str>,
    group_by_currency: bool,
    exclude_closing: bool,
) -> Result<HashMap<String, AccountMovement>, DashboardError> {
    if accounts.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = (1..=accounts.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(",");
    let mut sql = format!(
        "SELECT account, COALESCE(account_currency, '') AS currency,
                IFNULL(SUM(debit_in_account_currency), 0),
                IFNULL(SUM(credit_in_account_currency), 0),
                IFNULL(SUM(debit), 0),
                IFNULL(SUM(credit), 0)
         FROM gl_entries
         WHERE account IN ({}) AND posting_date BETWEEN ?{} AND ?{}
           AND is_cancelled = 0",
        placeholders,
        accounts.len() + 1,
        accounts.len() + 2,
    );

    let mut values: Vec<String> = accounts.to_vec();
    values.push(from_date.to_string());
    values.push(to_date.to_string());
    if let Some(company) = company {
        sql.push_str(&format!(" AND company = ?{}", values.len() + 1));
        values.push(company.to_string());
    }
    if exclude_closing {
        sql.push_str(&format!(
            " AND IFNULL(voucher_type, '') != ?{}",
            values.len() + 1
        ));
        values.push(CLOSING_VOUCHER.to_string());
    }
    sql.push_str(if group_by_currency {
        " GROUP BY account, account_currency"
    } else {
        " GROUP BY account"
    });

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(values))?;

    let mut result: HashMap<String, AccountMovement> = HashMap::new();
    while let Some(row) = rows.next()? {
        let account: String = row.get(0)?;
        let currency: String = row.get(1)?;
        let entry = result.entry(account).or_default();
        entry.debit += money(row.get::<_, f64>(2)?);
        entry.credit += money(row.get::<_, f64>(3)?);
        entry.debit_base += money(row.get::<_, f64>(4)?);
        entry.credit_base += money(row.get::<_, f64>(5)?);
        if !currency.is_empty() {
            entry.currency = currency;
        }
    }
    Ok(result)
}

/// All-time balance as of a date (fixed-epoch lower bound).
pub fn aggregate_through(
    conn: &Connection,
    accounts: &[String],
    to_date: NaiveDate,
    company: Option<&str>,
    exclude_closing: bool,
) -> Result<HashMap<String, AccountMovement>, DashboardError> {
    let (y, m, d) = ALL_TIME_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(to_date);
    aggregate(conn, accounts, epoch, to_date, company, true, exclude_closing)
}

pub fn load_account(
    conn: &Connection,
    name: &str,
) -> Result<Option<Account>, DashboardError> {
    let mut stmt = conn.prepare(&format!("{} WHERE name = ?1", ACCOUNT_SELECT))?;
    Ok(stmt.query_row(params![name], account_from_row).optional()?)
}

/// Enabled leaf accounts, optionally filtered by root type and company,
/// ordered by name.
pub fn fetch_leaf_accounts(
    conn: &Connection,
    root_type: Option<&str>,
    company: Option<&str>,
) -> Result<Vec<Account>, DashboardError> {
    let mut sql = format!("{} WHERE is_group = 0 AND disabled = 0", ACCOUNT_SELECT);
    let mut values: Vec<String> = Vec::new();
    if let Some(root) = root_type {
        values.push(root.to_string());
        sql.push_str(&format!(" AND root_type = ?{}", values.len()));
    }
    if let Some(company) = company {
        values.push(company.to_string());
        sql.push_str(&format!(" AND company = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY name");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), account_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Leaf descendants of a group account via the lft/rgt tree bounds.
pub fn leaf_accounts_under(
    conn: &Connection,
    parent: &str,
) -> Result<Vec<Account>, DashboardError> {
    let bounds: Option<(i64, i64)> = conn
        .query_row(
            "SELECT lft, rgt FROM accounts WHERE name = ?1",
            params![parent],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((lft, rgt)) = bounds else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(&format!(
        "{} WHERE lft > ?1 AND rgt < ?2 AND is_group = 0 AND disabled = 0 ORDER BY lft",
        ACCOUNT_SELECT
    ))?;
    let rows = stmt.query_map(params![lft, rgt], account_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

const ACCOUNT_SELECT: &str = "SELECT name, account_name, parent_account, root_type, account_type,
        account_currency, company, is_group, dashboard_category, dashboard_sort_order, disabled
 FROM accounts";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        name: row.get(0)?,
        account_name: row.get(1)?,
        parent_account: row.get(2)?,
        root_type: row.get(3)?,
        account_type: row.get(4)?,
        account_currency: row.get(5)?,
        company: row.get(6)?,
        is_group: row.get::<_, i64>(7)? != 0,
        dashboard_category: row.get(8)?,
        dashboard_sort_order: row.get(9)?,
        disabled: row.get::<_, i64>(10)? != 0,
    })
}

fn money(v: f64) -> Decimal {
    Decimal::try_from(v).unwrap_or_default().round_dp(2)
}
