// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cache::{Clock, SystemClock, TtlCache, RATE_TTL_SECS};
use crate::db;
use crate::utils::http_client;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use log::warn;
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Last-resort constants for currencies with no live or stored rate.
/// Unknown codes resolve to 1.0.
static FALLBACK_RATES: Lazy<HashMap<&'static str, Decimal>> = Lazy::new(|| {
    HashMap::from([
        ("USD", Decimal::new(500, 1)),
        ("EUR", Decimal::new(545, 1)),
        ("SAR", Decimal::new(133, 1)),
        ("AED", Decimal::new(136, 1)),
        ("GBP", Decimal::new(630, 1)),
    ])
});

/// Which way the live source quotes against its pivot currency. Deployments
/// differ, so the inversion direction is explicit configuration rather than
/// a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotQuote {
    /// `rates[c]` is the amount of `c` per one pivot unit
    /// (openexchangerates style). `rate(c -> base) = rates[base] / rates[c]`.
    #[default]
    UnitsPerPivot,
    /// `rates[c]` is the amount of pivot per one unit of `c`.
    /// `rate(c -> base) = rates[c] / rates[base]`.
    PivotPerUnit,
}

impl PivotQuote {
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some("pivot_per_unit") => PivotQuote::PivotPerUnit,
            _ => PivotQuote::UnitsPerPivot,
        }
    }
}

/// External live-rate endpoint: one batch per pivot currency.
pub trait LiveRateSource: Send + Sync {
    fn latest(&self, pivot: &str) -> Result<HashMap<String, f64>>;
}

/// HTTP source keyed by an API credential. Any failure (timeout, non-2xx,
/// malformed body) falls through to the next resolution tier.
pub struct OpenExchangeSource {
    client: reqwest::blocking::Client,
    app_id: String,
}

impl OpenExchangeSource {
    pub fn new(app_id: String) -> Result<Self> {
        Ok(OpenExchangeSource {
            client: http_client()?,
            app_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: HashMap<String, f64>,
}

impl LiveRateSource for OpenExchangeSource {
    fn latest(&self, pivot: &str) -> Result<HashMap<String, f64>> {
        let url = format!(
            "https://openexchangerates.org/api/latest.json?app_id={}&base={}",
            self.app_id, pivot
        );
        let resp = self.client.get(url).send()?.error_for_status()?;
        let body: LatestRates = resp.json()?;
        Ok(body.rates)
    }
}

/// Multiplicative rate to the base currency for a currency code and an
/// as-of date. Resolution order, first success wins: live batch (cached
/// per pivot), stored historical table, fallback constants. Never fails;
/// the caller always receives a usable rate.
pub struct RateProvider<'c> {
    conn: &'c Connection,
    base: String,
    pivot: String,
    quote: PivotQuote,
    live: Option<Box<dyn LiveRateSource>>,
    live_cache: TtlCache<HashMap<String, Decimal>>,
}

impl<'c> RateProvider<'c> {
    pub fn new(
        conn: &'c Connection,
        base: impl Into<String>,
        pivot: impl Into<String>,
        quote: PivotQuote,
        live: Option<Box<dyn LiveRateSource>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        RateProvider {
            conn,
            base: into_upper(base),
            pivot: into_upper(pivot),
            quote,
            live,
            live_cache: TtlCache::new(RATE_TTL_SECS, clock),
        }
    }

    /// Provider wired from the settings table: base currency, optional
    /// live credential and the configured inversion direction.
    pub fn from_settings(conn: &'c Connection) -> Result<Self> {
        let base = db::get_base_currency(conn)?;
        let quote = PivotQuote::from_setting(db::get_setting(conn, "pivot_quote")?.as_deref());
        let live: Option<Box<dyn LiveRateSource>> = match db::get_setting(conn, "rates_app_id")? {
            Some(app_id) if !app_id.is_empty() => Some(Box::new(OpenExchangeSource::new(app_id)?)),
            _ => None,
        };
        Ok(Self::new(conn, base, "USD", quote, live, Arc::new(SystemClock)))
    }

    pub fn base_currency(&self) -> &str {
        &self.base
    }

    pub fn rate(&self, currency: &str, as_of: NaiveDate) -> Decimal {
        let currency = currency.trim().to_uppercase();
        if currency.is_empty() || currency == self.base {
            return Decimal::ONE;
        }

        if let Some(rates) = self.live_rates() {
            if let Some(rate) = rates.get(&currency) {
                return *rate;
            }
        }

        match self.stored_rate(&currency, as_of) {
            Ok(Some(rate)) => return rate,
            Ok(None) => {}
            Err(err) => warn!("stored rate lookup failed for {}: {}", currency, err),
        }

        FALLBACK_RATES
            .get(currency.as_str())
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    pub fn convert(&self, amount: Decimal, currency: &str, as_of: NaiveDate) -> Decimal {
        if amount.is_zero() {
            return Decimal::ZERO;
        }
        (amount * self.rate(currency, as_of)).round_dp(2)
    }

    /// One batch fetch per pivot, cached; failure degrades silently to the
    /// stored-rate tier.
    fn live_rates(&self) -> Option<HashMap<String, Decimal>> {
        let live = self.live.as_ref()?;
        let key = format!("live:{}", self.pivot);
        if let Some(hit) = self.live_cache.get(&key) {
            return Some(hit);
        }
        match live.latest(&self.pivot) {
            Ok(raw) => {
                let rates = self.to_base_rates(&raw);
                self.live_cache.insert(&key, rates.clone());
                Some(rates)
            }
            Err(err) => {
                warn!("live rate fetch degraded to stored rates: {}", err);
                None
            }
        }
    }

    /// Cross-rate via the pivot, honoring the configured quote direction.
    /// Zero or unparsable legs are skipped rather than mapped to zero.
    fn to_base_rates(&self, raw: &HashMap<String, f64>) -> HashMap<String, Decimal> {
        let base_leg = if self.base == self.pivot {
            1.0
        } else {
            match raw.get(&self.base) {
                Some(v) if *v > 0.0 => *v,
                _ => return HashMap::new(),
            }
        };

        let mut rates = HashMap::new();
        rates.insert(self.base.clone(), Decimal::ONE);
        for (currency, leg) in raw {
            if *leg <= 0.0 {
                continue;
            }
            let value = match self.quote {
                PivotQuote::UnitsPerPivot => base_leg / leg,
                PivotQuote::PivotPerUnit => leg / base_leg,
            };
            if let Ok(rate) = Decimal::try_from(value) {
                rates.insert(currency.to_uppercase(), rate.round_dp(6));
            }
        }
        // The pivot itself quotes as one pivot unit.
        let pivot_rate = match self.quote {
            PivotQuote::UnitsPerPivot => Decimal::try_from(base_leg).ok(),
            PivotQuote::PivotPerUnit => Decimal::try_from(1.0 / base_leg).ok(),
        };
        if let Some(rate) = pivot_rate {
            rates.insert(self.pivot.clone(), rate.round_dp(6));
        }
        rates
    }

    /// Persist the current live batch into the historical table so future
    /// lookups survive without the live source.
    pub fn store_live_rates(&self, as_of: NaiveDate) -> Result<usize> {
        let rates = self
            .live_rates()
            .ok_or_else(|| anyhow!("no live rate source configured, or the fetch failed"))?;
        let mut stored = 0;
        for (currency, rate) in &rates {
            if currency == &self.base {
                continue;
            }
            self.conn.execute(
                "INSERT INTO currency_exchange(date, from_currency, to_currency, rate)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(date, from_currency, to_currency) DO UPDATE SET rate=excluded.rate",
                params![as_of.to_string(), currency, self.base, rate.to_string()],
            )?;
            stored += 1;
        }
        Ok(stored)
    }

    /// Most recent stored rate with `date <= as_of` for currency -> base.
    fn stored_rate(&self, currency: &str, as_of: NaiveDate) -> Result<Option<Decimal>> {
        let mut stmt = self.conn.prepare(
            "SELECT rate FROM currency_exchange
             WHERE from_currency=?1 AND to_currency=?2 AND date<=?3
             ORDER BY date DESC LIMIT 1",
        )?;
        let raw: Option<String> = stmt
            .query_row(params![currency, self.base, as_of.to_string()], |r| {
                r.get(0)
            })
            .optional()?;
        match raw {
            Some(s) => Ok(Some(s.parse::<Decimal>()?)),
            None => Ok(None),
        }
    }
}

fn into_upper(s: impl Into<String>) -> String {
    s.into().trim().to_uppercase()
}
