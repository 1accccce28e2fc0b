use crate::config::{Config, FeeStrategyName, GasPolicy, GasPolicyName};
use crate::error::WalletError;
use crate::err_from;
use crate::fee::{FeeEstimator, FeeStrategy};
use crate::process::ConfirmSettings;
use crate::transaction::GasLimitPolicy;
use crate::utils::gwei_to_u256;
use std::time::Duration;
use web3::types::Address;

/// Validated settings, built once from the config file at startup
#[derive(Clone, Debug)]
pub struct WalletSetup {
    pub rpc_endpoint: String,
    pub contract_address: Address,
    pub chain_id: Option<u64>,
    pub currency_symbol: String,
    pub fee_estimator: FeeEstimator,
    pub deposit_gas: GasLimitPolicy,
    pub withdraw_gas: GasLimitPolicy,
    pub confirm: ConfirmSettings,
    pub nonce_rebuilds: u32,
}

fn gas_limit_policy(name: &str, gas: &GasPolicy) -> Result<GasLimitPolicy, WalletError> {
    match gas.policy {
        GasPolicyName::Estimate => Ok(GasLimitPolicy::Estimate {
            buffer_percent: gas.buffer_percent.unwrap_or(20),
            fallback_limit: gas.fallback_limit.ok_or_else(|| {
                WalletError::ConfigError(format!("gas.{}: fallback-limit is required", name))
            })?,
        }),
        GasPolicyName::Fixed => Ok(GasLimitPolicy::Fixed {
            limit: gas.limit.ok_or_else(|| {
                WalletError::ConfigError(format!("gas.{}: limit is required", name))
            })?,
        }),
    }
}

impl WalletSetup {
    pub fn new(config: &Config) -> Result<Self, WalletError> {
        let chain = &config.chain;
        if chain.poll_interval_initial == 0
            || chain.poll_interval_max < chain.poll_interval_initial
        {
            return Err(WalletError::ConfigError(format!(
                "Invalid poll intervals: initial {} ms, max {} ms",
                chain.poll_interval_initial, chain.poll_interval_max
            )));
        }
        if chain.confirmation_timeout == 0 {
            return Err(WalletError::ConfigError(
                "confirmation-timeout must be positive".to_string(),
            ));
        }

        let strategy = match config.fees.strategy {
            FeeStrategyName::Eip1559 => FeeStrategy::Eip1559 {
                fallback_priority_fee: config
                    .fees
                    .fallback_priority_fee
                    .map(gwei_to_u256)
                    .transpose()
                    .map_err(err_from!())?,
            },
            FeeStrategyName::Legacy => {
                let multiplier = config.fees.legacy_price_multiplier;
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(WalletError::ConfigError(format!(
                        "legacy-price-multiplier must be at least 1.0, got {}",
                        multiplier
                    )));
                }
                FeeStrategy::Legacy {
                    multiplier_permille: (multiplier * 1000.0).round() as u64,
                }
            }
        };
        let max_fee_per_gas = config
            .fees
            .max_fee_per_gas
            .map(gwei_to_u256)
            .transpose()
            .map_err(err_from!())?;

        Ok(WalletSetup {
            rpc_endpoint: chain.rpc_endpoint.clone(),
            contract_address: chain.contract_address,
            chain_id: chain.chain_id,
            currency_symbol: chain
                .currency_symbol
                .clone()
                .unwrap_or_else(|| "ETH".to_string()),
            fee_estimator: FeeEstimator::new(strategy, max_fee_per_gas),
            deposit_gas: gas_limit_policy("deposit", &config.gas.deposit)?,
            withdraw_gas: gas_limit_policy("withdraw", &config.gas.withdraw)?,
            confirm: ConfirmSettings {
                timeout: Duration::from_secs(chain.confirmation_timeout),
                poll_interval_initial: Duration::from_millis(chain.poll_interval_initial),
                poll_interval_max: Duration::from_millis(chain.poll_interval_max),
                confirmation_blocks: chain.confirmation_blocks,
            },
            nonce_rebuilds: chain.nonce_rebuilds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::TEST_CONFIG;
    use web3::types::U256;

    #[test]
    fn test_setup_from_config() {
        let config = Config::load_from_str(TEST_CONFIG).unwrap();
        let setup = WalletSetup::new(&config).unwrap();
        assert_eq!(
            setup.fee_estimator.strategy,
            FeeStrategy::Legacy {
                multiplier_permille: 1250
            }
        );
        assert_eq!(setup.fee_estimator.max_fee_per_gas, None);
        assert_eq!(
            setup.deposit_gas,
            GasLimitPolicy::Estimate {
                buffer_percent: 20,
                fallback_limit: 300000
            }
        );
        assert_eq!(setup.withdraw_gas, GasLimitPolicy::Fixed { limit: 100000 });
        assert_eq!(setup.confirm.timeout, Duration::from_secs(300));
        assert_eq!(setup.confirm.poll_interval_initial, Duration::from_millis(1000));
        assert_eq!(setup.currency_symbol, "ETH");
        assert_eq!(setup.chain_id, Some(11155111));
    }

    #[test]
    fn test_eip1559_setup_converts_gwei() {
        let toml = TEST_CONFIG.replace(
            "strategy = \"legacy\"",
            "strategy = \"eip1559\"\nfallback-priority-fee = 1.5\nmax-fee-per-gas = 100.0",
        );
        let setup = WalletSetup::new(&Config::load_from_str(&toml).unwrap()).unwrap();
        assert_eq!(
            setup.fee_estimator.strategy,
            FeeStrategy::Eip1559 {
                fallback_priority_fee: Some(U256::from(1_500_000_000u64))
            }
        );
        assert_eq!(
            setup.fee_estimator.max_fee_per_gas,
            Some(U256::from(100_000_000_000u64))
        );
    }

    #[test]
    fn test_missing_fixed_limit_rejected() {
        let toml = TEST_CONFIG.replace("limit = 100000", "");
        let err = WalletSetup::new(&Config::load_from_str(&toml).unwrap()).unwrap_err();
        assert!(matches!(err, WalletError::ConfigError(_)));
    }

    #[test]
    fn test_multiplier_below_one_rejected() {
        let toml = TEST_CONFIG.replace(
            "legacy-price-multiplier = 1.25",
            "legacy-price-multiplier = 0.5",
        );
        assert!(WalletSetup::new(&Config::load_from_str(&toml).unwrap()).is_err());
    }
}
