// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db;
use crate::rates::RateProvider;
use crate::utils::{parse_date, pretty_table};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set-base", sub)) => {
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            db::set_base_currency(conn, &ccy)?;
            println!("Base currency set to {}", ccy);
        }
        Some(("fetch", _)) => {
            let rates = RateProvider::from_settings(conn)?;
            let today = Utc::now().date_naive();
            let stored = rates.store_live_rates(today)?;
            println!("Stored {} rates for {}", stored, today);
        }
        Some(("list", _)) => list_rates(conn)?,
        Some(("rate", sub)) => {
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            let date = match sub.get_one::<String>("date") {
                Some(d) => parse_date(d)?,
                None => Utc::now().date_naive(),
            };
            let rates = RateProvider::from_settings(conn)?;
            println!(
                "1 {} = {} {} (as of {})",
                ccy,
                rates.rate(&ccy, date),
                rates.base_currency(),
                date
            );
        }
        _ => {}
    }
    Ok(())
}

fn list_rates(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT date, from_currency, to_currency, rate FROM currency_exchange
         ORDER BY date DESC, from_currency LIMIT 50",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (d, f, t, rate) = row?;
        data.push(vec![d, f, t, rate]);
    }
    println!("{}", pretty_table(&["Date", "From", "To", "Rate"], data));
    Ok(())
}
