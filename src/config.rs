// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cache::{Clock, SystemClock, TtlCache, CONFIG_TTL_SECS};
use crate::db;
use crate::errors::DashboardError;
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const CONFIG_FILE: &str = "dashboard_account_groups.json";

/// Section keys the shipped dashboards use. The registry itself accepts
/// any key; this list exists for `section list` and doctor output.
pub const KNOWN_SECTIONS: &[&str] = &[
    "cash_liquidity_dashboard",
    "receivables_dashboard",
    "liabilities_dashboard",
    "operations_assets_dashboard",
    "fixed_assets_dashboard",
    "pl_performance_dashboard",
    "equity_profit_dashboard",
    "employee_custody_dashboard",
    "executive_control_center",
];

/// A group as written in the mapping document: a bare account, a flat
/// list, or a named block. Normalized once at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountGroup {
    Single(String),
    Flat(Vec<String>),
    Named {
        name: Option<String>,
        accounts: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct NormalizedGroup {
    pub label: Option<String>,
    pub accounts: Vec<String>,
}

impl AccountGroup {
    pub fn normalize(self) -> NormalizedGroup {
        match self {
            AccountGroup::Single(account) => NormalizedGroup {
                label: None,
                accounts: vec![account],
            },
            AccountGroup::Flat(accounts) => NormalizedGroup {
                label: None,
                accounts,
            },
            AccountGroup::Named { name, accounts } => NormalizedGroup {
                label: name,
                accounts,
            },
        }
    }
}

type SectionMap = BTreeMap<String, BTreeMap<String, NormalizedGroup>>;

/// Loads and caches the section -> group -> accounts mapping document.
/// Invalidated only by an explicit administrative action, never implicitly.
pub struct SectionRegistry {
    path: PathBuf,
    cache: TtlCache<SectionMap>,
}

impl SectionRegistry {
    pub fn new(path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        SectionRegistry {
            path,
            cache: TtlCache::new(CONFIG_TTL_SECS, clock),
        }
    }

    /// Registry over the mapping document in the platform data dir.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(db::data_path(CONFIG_FILE)?, Arc::new(SystemClock)))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The normalized group mapping for one section.
    pub fn section(
        &self,
        key: &str,
    ) -> Result<BTreeMap<String, NormalizedGroup>, DashboardError> {
        let sections = self.load()?;
        sections.get(key).cloned().ok_or_else(|| {
            DashboardError::ConfigurationMissing(format!(
                "no account-group mapping for section '{}'",
                key
            ))
        })
    }

    pub fn section_keys(&self) -> Result<Vec<String>, DashboardError> {
        Ok(self.load()?.keys().cloned().collect())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    fn load(&self) -> Result<SectionMap, DashboardError> {
        self.cache.get_or_build("sections", || self.load_document())
    }

    fn load_document(&self) -> Result<SectionMap, DashboardError> {
        let raw = fs::read_to_string(&self.path).map_err(|_| {
            DashboardError::ConfigurationMissing(format!(
                "account group mapping not found at {}",
                self.path.display()
            ))
        })?;
        let parsed: BTreeMap<String, BTreeMap<String, AccountGroup>> =
            serde_json::from_str(&raw).map_err(|err| {
                DashboardError::ConfigurationMissing(format!(
                    "account group mapping at {} is invalid: {}",
                    self.path.display(),
                    err
                ))
            })?;
        Ok(parsed
            .into_iter()
            .map(|(section, groups)| {
                let groups = groups
                    .into_iter()
                    .map(|(name, group)| (name, group.normalize()))
                    .collect();
                (section, groups)
            })
            .collect())
    }
}
