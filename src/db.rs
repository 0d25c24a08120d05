// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerboard", "ledgerboard"));

pub fn data_path(file: &str) -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join(file))
}

pub fn db_path() -> Result<PathBuf> {
    data_path("ledgerboard.sqlite")
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// In-memory store with the full schema; used by tests and `doctor`.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Chart of accounts. The tree is kept as lft/rgt bounds so subtree
    -- lookups are a single range scan.
    CREATE TABLE IF NOT EXISTS accounts(
        name TEXT PRIMARY KEY,
        account_name TEXT NOT NULL,
        parent_account TEXT,
        root_type TEXT,
        account_type TEXT,
        account_currency TEXT NOT NULL,
        company TEXT,
        is_group INTEGER NOT NULL DEFAULT 0,
        lft INTEGER NOT NULL DEFAULT 0,
        rgt INTEGER NOT NULL DEFAULT 0,
        dashboard_category TEXT,
        dashboard_sort_order INTEGER NOT NULL DEFAULT 0,
        disabled INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY(parent_account) REFERENCES accounts(name)
    );

    -- GL postings. debit/credit are in the base currency; the *_in_account_
    -- currency pair carries the account-currency leg.
    CREATE TABLE IF NOT EXISTS gl_entries(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account TEXT NOT NULL,
        posting_date TEXT NOT NULL,
        debit REAL NOT NULL DEFAULT 0,
        credit REAL NOT NULL DEFAULT 0,
        debit_in_account_currency REAL NOT NULL DEFAULT 0,
        credit_in_account_currency REAL NOT NULL DEFAULT 0,
        account_currency TEXT NOT NULL,
        company TEXT,
        voucher_type TEXT,
        is_cancelled INTEGER NOT NULL DEFAULT 0,
        remarks TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account) REFERENCES accounts(name)
    );
    CREATE INDEX IF NOT EXISTS idx_gl_entries_date ON gl_entries(posting_date);
    CREATE INDEX IF NOT EXISTS idx_gl_entries_account ON gl_entries(account);

    -- Historical exchange rates: from_currency -> to_currency per day.
    -- The applicable rate for a date is the latest one not after it.
    CREATE TABLE IF NOT EXISTS currency_exchange(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        from_currency TEXT NOT NULL,
        to_currency TEXT NOT NULL,
        rate TEXT NOT NULL,
        UNIQUE(date, from_currency, to_currency)
    );

    CREATE TABLE IF NOT EXISTS fiscal_years(
        name TEXT PRIMARY KEY,
        year_start_date TEXT NOT NULL,
        year_end_date TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}

// Base currency settings
pub fn get_base_currency(conn: &Connection) -> Result<String> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='base_currency'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| "EGP".to_string()))
}

pub fn set_base_currency(conn: &Connection, ccy: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('base_currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy],
    )?;
    Ok(())
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Stored start/end bounds of a named fiscal year, if configured.
pub fn fiscal_year_bounds(conn: &Connection, name: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT year_start_date, year_end_date FROM fiscal_years WHERE name=?1",
            params![name],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        Some((s, e)) => {
            let start = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid fiscal year start '{}' for {}", s, name))?;
            let end = NaiveDate::parse_from_str(&e, "%Y-%m-%d")
                .with_context(|| format!("Invalid fiscal year end '{}' for {}", e, name))?;
            Ok(Some((start, end)))
        }
        None => Ok(None),
    }
}
