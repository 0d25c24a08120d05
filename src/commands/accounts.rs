// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate;
use crate::db;
use crate::utils::pretty_table;
use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Opens a nested-set slot for a new account. Children land just inside
/// the parent's right bound; every bound at or past it shifts by two so
/// the tree stays contiguous. Roots append after the current maximum.
fn open_tree_slot(conn: &Connection, parent: Option<&str>) -> Result<(i64, i64)> {
    match parent {
        Some(parent) => {
            let rgt: Option<i64> = conn
                .query_row(
                    "SELECT rgt FROM accounts WHERE name = ?1",
                    params![parent],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(rgt) = rgt else {
                bail!("No parent account named '{}'", parent);
            };
            conn.execute(
                "UPDATE accounts SET rgt = rgt + 2 WHERE rgt >= ?1",
                params![rgt],
            )?;
            conn.execute(
                "UPDATE accounts SET lft = lft + 2 WHERE lft > ?1",
                params![rgt],
            )?;
            Ok((rgt, rgt + 1))
        }
        None => {
            let max: i64 =
                conn.query_row("SELECT IFNULL(MAX(rgt), 0) FROM accounts", [], |r| r.get(0))?;
            Ok((max + 1, max + 2))
        }
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let account_name = sub
                .get_one::<String>("account-name")
                .cloned()
                .unwrap_or_else(|| name.clone());
            let currency = match sub.get_one::<String>("currency") {
                Some(c) => c.to_uppercase(),
                None => db::get_base_currency(conn)?,
            };
            let sort_order = sub.get_one::<i64>("sort-order").copied().unwrap_or(0);
            let parent = sub.get_one::<String>("parent").map(String::as_str);
            let (lft, rgt) = open_tree_slot(conn, parent)?;
            conn.execute(
                "INSERT INTO accounts(name, account_name, parent_account, root_type, account_type,
                                      account_currency, company, is_group, dashboard_sort_order,
                                      lft, rgt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    name,
                    account_name,
                    parent,
                    sub.get_one::<String>("root-type"),
                    sub.get_one::<String>("type"),
                    currency,
                    sub.get_one::<String>("company"),
                    sub.get_flag("group") as i64,
                    sort_order,
                    lft,
                    rgt,
                ],
            )?;
            println!("Added account '{}' ({})", name, currency);
        }
        Some(("list", sub)) => {
            let accounts = aggregate::fetch_leaf_accounts(
                conn,
                sub.get_one::<String>("root-type").map(String::as_str),
                sub.get_one::<String>("company").map(String::as_str),
            )?;
            let mut data = Vec::new();
            for a in accounts {
                data.push(vec![
                    a.name,
                    a.root_type.unwrap_or_default(),
                    a.account_currency,
                    a.company.unwrap_or_default(),
                    a.dashboard_category.unwrap_or_default(),
                ]);
            }
            println!(
                "{}",
                pretty_table(
                    &["Name", "Root Type", "Currency", "Company", "Category"],
                    data
                )
            );
        }
        Some(("set-category", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let category = sub.get_one::<String>("category").unwrap();
            let n = conn.execute(
                "UPDATE accounts SET dashboard_category=?2 WHERE name=?1",
                params![name, category],
            )?;
            if n == 0 {
                println!("No account named '{}'", name);
            } else {
                println!("Account '{}' categorized as '{}'", name, category);
            }
        }
        Some(("disable", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute(
                "UPDATE accounts SET disabled=1 WHERE name=?1",
                params![name],
            )?;
            println!("Disabled account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
