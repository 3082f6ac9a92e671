// KYC Crowdfund Client
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Provides [Config] for timeouts and read fan-out.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_QUERY_TIMEOUT: &str = "KYC_CROWDFUND_QUERY_TIMEOUT_MS";
const ENV_CONFIRMATION_TIMEOUT: &str = "KYC_CROWDFUND_CONFIRMATION_TIMEOUT_MS";
const ENV_PENDING_FETCH_CONCURRENCY: &str = "KYC_CROWDFUND_PENDING_FETCH_CONCURRENCY";
const ENV_STALENESS_TOLERANCE: &str = "KYC_CROWDFUND_STALENESS_TOLERANCE_MS";

/// Session configuration.
///
/// Missing fields take their [Default] value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound for a single read.
    pub query_timeout_ms: u64,
    /// Upper bound for waiting on a transaction confirmation.
    pub confirmation_timeout_ms: u64,
    /// Maximum number of identity details fetched at the same time.
    pub pending_fetch_concurrency: usize,
    /// Age after which a snapshot is reported as stale.
    pub staleness_tolerance_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            query_timeout_ms: 10_000,
            confirmation_timeout_ms: 60_000,
            pending_fetch_concurrency: 4,
            staleness_tolerance_ms: 30_000,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {name}")]
    InvalidVariable { name: &'static str, value: String },
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `KYC_CROWDFUND_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [Config::from_env] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            query_timeout_ms: parse_var(&lookup, ENV_QUERY_TIMEOUT, defaults.query_timeout_ms)?,
            confirmation_timeout_ms: parse_var(
                &lookup,
                ENV_CONFIRMATION_TIMEOUT,
                defaults.confirmation_timeout_ms,
            )?,
            pending_fetch_concurrency: parse_var(
                &lookup,
                ENV_PENDING_FETCH_CONCURRENCY,
                defaults.pending_fetch_concurrency,
            )?,
            staleness_tolerance_ms: parse_var(
                &lookup,
                ENV_STALENESS_TOLERANCE,
                defaults.staleness_tolerance_ms,
            )?,
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn staleness_tolerance(&self) -> Duration {
        Duration::from_millis(self.staleness_tolerance_ms)
    }

    /// Concurrency for pending detail reads. Never zero.
    pub fn pending_fan_out(&self) -> usize {
        self.pending_fetch_concurrency.max(1)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVariable { name, value }),
    }
}
