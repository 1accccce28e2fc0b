use serde::Deserialize;

use std::fs;
use std::path::Path;

use crate::error::WalletError;
use crate::{err_custom_create, err_from};
use web3::types::Address;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub chain: Chain,
    pub fees: Fees,
    pub gas: Gas,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Chain {
    pub rpc_endpoint: String,
    pub contract_address: Address,
    pub chain_id: Option<u64>,
    pub currency_symbol: Option<String>,
    /// Seconds
    pub confirmation_timeout: u64,
    #[serde(default)]
    pub confirmation_blocks: u64,
    /// Milliseconds
    #[serde(default = "default_poll_interval_initial")]
    pub poll_interval_initial: u64,
    /// Milliseconds
    #[serde(default = "default_poll_interval_max")]
    pub poll_interval_max: u64,
    #[serde(default = "default_nonce_rebuilds")]
    pub nonce_rebuilds: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeeStrategyName {
    Eip1559,
    Legacy,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Fees {
    pub strategy: FeeStrategyName,
    #[serde(default = "default_legacy_price_multiplier")]
    pub legacy_price_multiplier: f64,
    /// Gwei
    pub fallback_priority_fee: Option<f64>,
    /// Gwei
    pub max_fee_per_gas: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasPolicyName {
    Estimate,
    Fixed,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct GasPolicy {
    pub policy: GasPolicyName,
    pub buffer_percent: Option<u64>,
    pub fallback_limit: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Gas {
    pub deposit: GasPolicy,
    pub withdraw: GasPolicy,
}

fn default_poll_interval_initial() -> u64 {
    1000
}

fn default_poll_interval_max() -> u64 {
    15000
}

fn default_nonce_rebuilds() -> u32 {
    1
}

fn default_legacy_price_multiplier() -> f64 {
    1.1
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        Self::load_from_str(&fs::read_to_string(path).map_err(err_from!())?)
    }

    pub fn load_from_str(content: &str) -> Result<Self, WalletError> {
        match toml::from_str(content) {
            Ok(config) => Ok(config),
            Err(e) => Err(err_custom_create!("Failed to parse toml {:?}", e)),
        }
    }
}
