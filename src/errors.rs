// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Engine-level failures that dashboards must report in a structured way.
///
/// Anything else (I/O while loading config, JSON decoding, ...) travels as
/// `anyhow::Error` and is converted to a `{success: false, error}` response
/// at the section boundary.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Caller-supplied date bounds are inverted, or a required bound is
    /// missing for a Custom period.
    #[error("invalid period range: {0}")]
    InvalidRange(String),

    /// The ledger store could not be queried. Aggregations never return
    /// partial results.
    #[error("ledger store unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// The section's account-group mapping is absent. Fatal for that
    /// section only.
    #[error("dashboard configuration missing: {0}")]
    ConfigurationMissing(String),
}
