// Copyright 2019 Stichting Organism
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-party swap settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{Confirmation, Layer};
use crate::plan::{FeePolicy, Payer};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value `{value}` for {key}")]
    Env { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    pub fee_policy: FeePolicy,
    /// Level `Swap::wait` waits for.
    pub confirmation: Confirmation,
    /// Where this party's deposit is paid from.
    pub deposit_layer: Layer,
    /// Draw a fresh CREATE2 salt for every attempt the provider prepares.
    pub randomize_salt: bool,
    pub wait_timeout_secs: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        SwapConfig {
            fee_policy: FeePolicy::default(),
            confirmation: Confirmation::Committed,
            deposit_layer: Layer::L2,
            randomize_salt: true,
            wait_timeout_secs: 600,
        }
    }
}

impl SwapConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SwapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `MUSIG_SWAP_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = SwapConfig::default();

        if let Some(v) = read_env("MUSIG_SWAP_WAIT_TIMEOUT_SECS") {
            config.wait_timeout_secs = v.parse().map_err(|_| env_error("MUSIG_SWAP_WAIT_TIMEOUT_SECS", v))?;
        }
        if let Some(v) = read_env("MUSIG_SWAP_RANDOMIZE_SALT") {
            config.randomize_salt = v.parse().map_err(|_| env_error("MUSIG_SWAP_RANDOMIZE_SALT", v))?;
        }
        if let Some(v) = read_env("MUSIG_SWAP_DEPOSIT_LAYER") {
            config.deposit_layer = parse_layer(&v).ok_or_else(|| env_error("MUSIG_SWAP_DEPOSIT_LAYER", v))?;
        }
        if let Some(v) = read_env("MUSIG_SWAP_CONFIRMATION") {
            config.confirmation = match v.to_ascii_lowercase().as_str() {
                "committed" => Confirmation::Committed,
                "verified" => Confirmation::Verified,
                _ => return Err(env_error("MUSIG_SWAP_CONFIRMATION", v)),
            };
        }
        if let Some(v) = read_env("MUSIG_SWAP_CHANGE_PUBKEY_PAYER") {
            config.fee_policy.change_pub_key =
                parse_payer(&v).ok_or_else(|| env_error("MUSIG_SWAP_CHANGE_PUBKEY_PAYER", v))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_timeout_secs == 0 {
            return Err(ConfigError::Invalid("wait_timeout_secs must be positive"));
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_error(key: &'static str, value: String) -> ConfigError {
    ConfigError::Env { key, value }
}

fn parse_layer(value: &str) -> Option<Layer> {
    match value.to_ascii_lowercase().as_str() {
        "l1" => Some(Layer::L1),
        "l2" => Some(Layer::L2),
        _ => None,
    }
}

fn parse_payer(value: &str) -> Option<Payer> {
    match value.to_ascii_lowercase().as_str() {
        "provider" => Some(Payer::Provider),
        "client" => Some(Payer::Client),
        _ => None,
    }
}
