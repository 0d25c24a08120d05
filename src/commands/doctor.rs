// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::SectionRegistry;
use crate::db;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Postings against accounts missing from the chart
    let mut stmt = conn.prepare(
        "SELECT DISTINCT account FROM gl_entries
         WHERE account NOT IN (SELECT name FROM accounts)",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let account: String = r.get(0)?;
        rows.push(vec!["posting_unknown_account".into(), account]);
    }

    // 2) Non-base currencies with no stored rate at all
    let base = db::get_base_currency(conn)?;
    let mut stmt2 = conn.prepare(
        "SELECT DISTINCT account_currency FROM gl_entries WHERE account_currency != ?1",
    )?;
    let mut cur2 = stmt2.query([&base])?;
    while let Some(r) = cur2.next()? {
        let ccy: String = r.get(0)?;
        let mut st = conn.prepare(
            "SELECT 1 FROM currency_exchange WHERE from_currency=?1 AND to_currency=?2 LIMIT 1",
        )?;
        let hit: Option<i32> = st.query_row((&ccy, &base), |r| r.get(0)).optional()?;
        if hit.is_none() {
            rows.push(vec!["no_stored_rate".into(), ccy]);
        }
    }

    // 3) Section config references to unknown accounts
    match SectionRegistry::default_location() {
        Ok(registry) => match registry.section_keys() {
            Ok(keys) => {
                for key in keys {
                    let groups = registry.section(&key)?;
                    for (group, normalized) in groups {
                        for account in &normalized.accounts {
                            let hit: Option<i32> = conn
                                .query_row(
                                    "SELECT 1 FROM accounts WHERE name=?1",
                                    [account],
                                    |r| r.get(0),
                                )
                                .optional()?;
                            if hit.is_none() {
                                rows.push(vec![
                                    "config_unknown_account".into(),
                                    format!("{}/{}: {}", key, group, account),
                                ]);
                            }
                        }
                    }
                }
            }
            Err(err) => rows.push(vec!["config_unreadable".into(), err.to_string()]),
        },
        Err(err) => rows.push(vec!["config_unreadable".into(), err.to_string()]),
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
