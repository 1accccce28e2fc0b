use web3::types::{Address, Bytes, CallRequest, TransactionParameters, U256, U64};

use crate::error::WalletError;
use crate::eth::ChainClient;
use crate::fee::{FeeEstimator, FeeFields};
use crate::model::TransactionKind;
use crate::utils::checksum_address;

/// Canonical cost of a plain value transfer
pub const TRANSFER_GAS_LIMIT: u64 = 21000;

const EIP1559_TX_TYPE: u64 = 2;
const LEGACY_TX_TYPE: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasLimitPolicy {
    /// Ask the node, add `buffer_percent`, use `fallback_limit` if the node cannot estimate
    Estimate {
        buffer_percent: u64,
        fallback_limit: u64,
    },
    Fixed {
        limit: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionCall {
    /// Value transfer without call data
    Transfer,
    /// Contract method with ABI encoded arguments
    Contract { method: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub kind: TransactionKind,
    pub method: String,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub fees: FeeFields,
    pub chain_id: u64,
    pub call_data: Vec<u8>,
}

impl UnsignedTransaction {
    pub fn sender_checksum(&self) -> String {
        checksum_address(&self.from)
    }

    pub fn to_transaction_parameters(&self) -> TransactionParameters {
        let (gas_price, max_fee_per_gas, max_priority_fee_per_gas, transaction_type) =
            match self.fees {
                FeeFields::Legacy { gas_price } => {
                    (Some(gas_price), None, None, U64::from(LEGACY_TX_TYPE))
                }
                FeeFields::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                } => (
                    None,
                    Some(max_fee_per_gas),
                    Some(max_priority_fee_per_gas),
                    U64::from(EIP1559_TX_TYPE),
                ),
            };
        TransactionParameters {
            nonce: Some(U256::from(self.nonce)),
            to: Some(self.to),
            gas: U256::from(self.gas_limit),
            gas_price,
            value: self.value,
            data: Bytes(self.call_data.clone()),
            chain_id: Some(self.chain_id),
            transaction_type: Some(transaction_type),
            access_list: None,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        }
    }
}

/// Buffered gas limit, rounded up: 50000 with 20% gives 60000
pub fn apply_gas_buffer(estimated_gas: U256, buffer_percent: u64) -> U256 {
    let scaled = estimated_gas * U256::from(100 + buffer_percent);
    (scaled + U256::from(99)) / U256::from(100)
}

fn candidate_call_request(
    from: Address,
    to: Address,
    value: U256,
    data: &[u8],
    fees: &FeeFields,
) -> CallRequest {
    let (gas_price, max_fee_per_gas, max_priority_fee_per_gas, transaction_type) = match fees {
        FeeFields::Legacy { gas_price } => (Some(*gas_price), None, None, None),
        FeeFields::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => (
            None,
            Some(*max_fee_per_gas),
            Some(*max_priority_fee_per_gas),
            Some(U64::from(EIP1559_TX_TYPE)),
        ),
    };
    CallRequest {
        from: Some(from),
        to: Some(to),
        gas: None,
        gas_price,
        value: Some(value),
        data: if data.is_empty() {
            None
        } else {
            Some(Bytes(data.to_vec()))
        },
        transaction_type,
        access_list: None,
        max_fee_per_gas,
        max_priority_fee_per_gas,
    }
}

pub struct TransactionBuilder<'a> {
    client: &'a dyn ChainClient,
    fee_estimator: &'a FeeEstimator,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(client: &'a dyn ChainClient, fee_estimator: &'a FeeEstimator) -> Self {
        Self {
            client,
            fee_estimator,
        }
    }

    /// Nonce is read fresh from the node; the caller holds the sender's sequencer guard.
    #[allow(clippy::too_many_arguments)]
    pub async fn build(
        &self,
        kind: TransactionKind,
        from: Address,
        to: Address,
        value: U256,
        chain_id: u64,
        call: TransactionCall,
        gas_policy: GasLimitPolicy,
    ) -> Result<UnsignedTransaction, WalletError> {
        let nonce = self.client.transaction_count(from, true).await?;
        let fees = self.fee_estimator.estimate(self.client).await?;
        let (method, call_data) = match call {
            TransactionCall::Transfer => ("transfer".to_string(), vec![]),
            TransactionCall::Contract { method, data } => (method, data),
        };
        let gas_limit = match gas_policy {
            GasLimitPolicy::Fixed { limit } => limit,
            GasLimitPolicy::Estimate {
                buffer_percent,
                fallback_limit,
            } => {
                self.estimate_gas_limit(
                    from,
                    to,
                    value,
                    &call_data,
                    &fees,
                    buffer_percent,
                    fallback_limit,
                )
                .await?
            }
        };
        let tx = UnsignedTransaction {
            kind,
            method,
            from,
            to,
            value,
            nonce,
            gas_limit,
            fees,
            chain_id,
            call_data,
        };
        log::debug!("Built transaction: {:?}", tx);
        Ok(tx)
    }

    #[allow(clippy::too_many_arguments)]
    async fn estimate_gas_limit(
        &self,
        from: Address,
        to: Address,
        value: U256,
        call_data: &[u8],
        fees: &FeeFields,
        buffer_percent: u64,
        fallback_limit: u64,
    ) -> Result<u64, WalletError> {
        if call_data.is_empty() {
            match self.client.code(to).await {
                Ok(code) if code.0.is_empty() => return Ok(TRANSFER_GAS_LIMIT),
                Ok(_) => {}
                Err(err) => return Ok(fallback_gas_limit(err, fallback_limit)),
            }
        }
        let call_request = candidate_call_request(from, to, value, call_data, fees);
        match self.client.estimate_gas(call_request).await {
            Ok(gas_est) => {
                let gas_limit = apply_gas_buffer(gas_est, buffer_percent);
                log::info!(
                    "Set gas limit basing on gas estimation: {gas_est}. Setting {gas_limit} increased by {buffer_percent}% for safe execution."
                );
                if gas_limit > U256::from(u64::MAX) {
                    return Err(WalletError::GasEstimationFailed(format!(
                        "Gas limit {} out of range",
                        gas_limit
                    )));
                }
                Ok(gas_limit.as_u64())
            }
            Err(err) => Ok(fallback_gas_limit(err, fallback_limit)),
        }
    }
}

fn fallback_gas_limit(err: WalletError, fallback_limit: u64) -> u64 {
    let err = WalletError::GasEstimationFailed(err.to_string());
    log::warn!("{}, using fallback gas limit {}", err, fallback_limit);
    fallback_limit
}
