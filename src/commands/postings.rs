// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate;
use crate::rates::RateProvider;
use crate::utils::{parse_date, parse_decimal, pretty_table};
use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add_posting(conn, sub)?,
        Some(("cancel", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let n = conn.execute(
                "UPDATE gl_entries SET is_cancelled=1 WHERE id=?1",
                params![id],
            )?;
            if n == 0 {
                println!("No posting with id {}", id);
            } else {
                println!("Cancelled posting {}", id);
            }
        }
        Some(("list", sub)) => list_postings(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add_posting(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let account_name = sub.get_one::<String>("account").unwrap();
    let Some(account) = aggregate::load_account(conn, account_name)? else {
        bail!("no account named '{}'", account_name);
    };
    if account.is_group {
        bail!("'{}' is a group account; postings go to leaves", account_name);
    }

    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => Utc::now().date_naive(),
    };
    let debit = sub
        .get_one::<String>("debit")
        .map(|v| parse_decimal(v))
        .transpose()?
        .unwrap_or(Decimal::ZERO);
    let credit = sub
        .get_one::<String>("credit")
        .map(|v| parse_decimal(v))
        .transpose()?
        .unwrap_or(Decimal::ZERO);
    if debit.is_zero() && credit.is_zero() {
        bail!("a posting needs a --debit or --credit amount");
    }

    // Base-currency legs via the effective rate for the posting date.
    let rates = RateProvider::from_settings(conn)?;
    let debit_base = rates.convert(debit, &account.account_currency, date);
    let credit_base = rates.convert(credit, &account.account_currency, date);

    conn.execute(
        "INSERT INTO gl_entries(account, posting_date, debit, credit,
                                debit_in_account_currency, credit_in_account_currency,
                                account_currency, company, voucher_type, remarks)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            account.name,
            date.to_string(),
            debit_base.to_f64().unwrap_or(0.0),
            credit_base.to_f64().unwrap_or(0.0),
            debit.to_f64().unwrap_or(0.0),
            credit.to_f64().unwrap_or(0.0),
            account.account_currency,
            sub.get_one::<String>("company").or(account.company.as_ref()),
            sub.get_one::<String>("voucher-type"),
            sub.get_one::<String>("remarks"),
        ],
    )?;
    println!(
        "Posted to '{}' on {}: debit {} / credit {} {}",
        account.name, date, debit, credit, account.account_currency
    );
    Ok(())
}

fn list_postings(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let limit = sub.get_one::<usize>("limit").copied().unwrap_or(50);
    let mut sql = String::from(
        "SELECT id, account, posting_date, debit_in_account_currency,
                credit_in_account_currency, account_currency, is_cancelled
         FROM gl_entries",
    );
    let mut values: Vec<String> = Vec::new();
    if let Some(account) = sub.get_one::<String>("account") {
        values.push(account.clone());
        sql.push_str(" WHERE account = ?1");
    }
    sql.push_str(&format!(" ORDER BY posting_date DESC, id DESC LIMIT {}", limit));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values), |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, f64>(3)?,
            r.get::<_, f64>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, account, date, debit, credit, ccy, cancelled) = row?;
        data.push(vec![
            id.to_string(),
            account,
            date,
            format!("{:.2}", debit),
            format!("{:.2}", credit),
            ccy,
            if cancelled != 0 { "yes".into() } else { String::new() },
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Id", "Account", "Date", "Debit", "Credit", "Currency", "Cancelled"],
            data
        )
    );
    Ok(())
}
