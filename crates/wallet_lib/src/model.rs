use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use web3::types::{Address, H256, U256};

use crate::error::WalletError;
use crate::err_custom_create;

/// Which wallet operation produced a transaction
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            _ => Err(err_custom_create!("Unknown transaction type: {}", s)),
        }
    }
}

/// Receipt as reported by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub tx_hash: H256,
    /// None until mined
    pub block_number: Option<u64>,
    pub gas_used: U256,
    pub status: bool,
    pub effective_gas_price: Option<U256>,
}

/// Transaction as reported by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub tx_hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: Option<U256>,
    pub block_number: Option<u64>,
}

/// Mined transaction with the fields read back from the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub gas_used: U256,
    pub status: bool,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: U256,
}

impl TransactionReceipt {
    pub fn from_chain(
        receipt: ChainReceipt,
        transaction: ChainTransaction,
    ) -> Result<Self, WalletError> {
        let block_number = receipt.block_number.ok_or_else(|| {
            err_custom_create!("Receipt {:#x} has no block number", receipt.tx_hash)
        })?;
        let gas_price = transaction
            .gas_price
            .or(receipt.effective_gas_price)
            .ok_or_else(|| {
                err_custom_create!("Node reported no gas price for {:#x}", receipt.tx_hash)
            })?;
        Ok(TransactionReceipt {
            tx_hash: receipt.tx_hash,
            block_number,
            gas_used: receipt.gas_used,
            status: receipt.status,
            from: transaction.from,
            to: transaction.to,
            value: transaction.value,
            gas_price,
        })
    }
}
