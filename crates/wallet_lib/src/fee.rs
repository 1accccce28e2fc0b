use web3::types::U256;

use crate::err_custom_create;
use crate::error::WalletError;
use crate::eth::ChainClient;

/// Fee fields of a transaction, legacy or EIP-1559, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    Legacy {
        gas_price: U256,
    },
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl FeeFields {
    /// Highest price per gas unit the transaction may pay
    pub fn max_price(&self) -> U256 {
        match self {
            FeeFields::Legacy { gas_price } => *gas_price,
            FeeFields::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeStrategy {
    /// max fee = priority fee quote + base fee
    Eip1559 {
        /// used only when the node does not implement eth_maxPriorityFeePerGas
        fallback_priority_fee: Option<U256>,
    },
    /// gas price quote scaled by multiplier_permille / 1000
    Legacy { multiplier_permille: u64 },
}

#[derive(Debug, Clone)]
pub struct FeeEstimator {
    pub strategy: FeeStrategy,
    pub max_fee_per_gas: Option<U256>,
}

pub fn apply_multiplier(price: U256, multiplier_permille: u64) -> U256 {
    let scaled = price * U256::from(multiplier_permille);
    (scaled + U256::from(999)) / U256::from(1000)
}

impl FeeEstimator {
    pub fn new(strategy: FeeStrategy, max_fee_per_gas: Option<U256>) -> Self {
        Self {
            strategy,
            max_fee_per_gas,
        }
    }

    pub async fn estimate(&self, client: &dyn ChainClient) -> Result<FeeFields, WalletError> {
        let fees = match &self.strategy {
            FeeStrategy::Eip1559 {
                fallback_priority_fee,
            } => {
                let priority_fee = match client.max_priority_fee().await {
                    Ok(fee) => fee,
                    Err(WalletError::NetworkUnavailable(msg)) => {
                        return Err(WalletError::NetworkUnavailable(msg));
                    }
                    Err(err) => match fallback_priority_fee {
                        Some(fallback) => {
                            log::warn!(
                                "Node did not quote priority fee ({}), using configured {}",
                                err,
                                fallback
                            );
                            *fallback
                        }
                        None => return Err(err),
                    },
                };
                let base_fee = match client.base_fee().await? {
                    Some(base_fee) => base_fee,
                    None => client.gas_price().await?,
                };
                FeeFields::Eip1559 {
                    max_fee_per_gas: priority_fee + base_fee,
                    max_priority_fee_per_gas: priority_fee,
                }
            }
            FeeStrategy::Legacy {
                multiplier_permille,
            } => {
                let gas_price = client.gas_price().await?;
                FeeFields::Legacy {
                    gas_price: apply_multiplier(gas_price, *multiplier_permille),
                }
            }
        };
        if let Some(max_fee_per_gas) = self.max_fee_per_gas {
            if fees.max_price() > max_fee_per_gas {
                return Err(err_custom_create!(
                    "Estimated fee {} exceeds configured maximum {}",
                    fees.max_price(),
                    max_fee_per_gas
                ));
            }
        }
        log::debug!("Estimated fees: {:?}", fees);
        Ok(fees)
    }
}
