use std::fmt::{Display, Formatter};

use thiserror::Error;
use web3::ethabi::ethereum_types::FromDecStrErr;
use web3::types::{Address, H256};

use crate::error::CustomError;
use crate::utils::ConversionError;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Node unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),
    #[error("Transaction {tx_hash:#x} not confirmed before timeout")]
    ConfirmationTimeout { tx_hash: H256 },
    #[error("AuthorizationError: sender {sender:#x} is not the contract owner {owner:#x}")]
    Authorization { sender: Address, owner: Address },
    #[error("Transaction {0} already recorded")]
    DuplicateRecord(String),
    #[error("Nonce rejected by node: {0}")]
    StaleNonce(String),
    #[error("Transaction already known to node: {0}")]
    AlreadyKnown(String),
    #[error("web3 error: {0}")]
    Web3(String),
    #[error("Hex conversion error: {0}")]
    HexError(#[from] rustc_hex::FromHexError),
    #[error("Dec conversion error: {0}")]
    DecError(#[from] FromDecStrErr),
    #[error("Decimal error: {0}")]
    DecimalError(#[from] rust_decimal::Error),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("conversion error: {0}")]
    ConversionError(#[from] ConversionError),
    #[error("abi error: {0}")]
    Web3AbiError(#[from] web3::ethabi::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("{0}")]
    Custom(#[from] CustomError),
}

impl From<web3::Error> for WalletError {
    fn from(err: web3::Error) -> Self {
        match err {
            web3::Error::Unreachable | web3::Error::Transport(_) | web3::Error::Io(_) => {
                WalletError::NetworkUnavailable(err.to_string())
            }
            web3::Error::Rpc(rpc_err) => {
                let msg = rpc_err.message.to_lowercase();
                if msg.contains("nonce too low")
                    || msg.contains("replacement transaction underpriced")
                {
                    WalletError::StaleNonce(rpc_err.message)
                } else if msg.contains("already known") {
                    WalletError::AlreadyKnown(rpc_err.message)
                } else {
                    WalletError::Web3(format!(
                        "rpc error {}: {}",
                        rpc_err.code.code(),
                        rpc_err.message
                    ))
                }
            }
            other => WalletError::Web3(other.to_string()),
        }
    }
}

impl WalletError {
    /// Errors after which the same intent may be attempted again.
    /// A confirmation timeout is retryable only by polling the known hash.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::NetworkUnavailable(_)
                | WalletError::StaleNonce(_)
                | WalletError::ConfirmationTimeout { .. }
        )
    }
}

/// Failure of a whole deposit/withdraw operation.
///
/// Carries the hash of the broadcast transaction when the failure happened
/// after submission, so the operator can reconcile manually.
#[derive(Debug)]
pub struct OperationFailure {
    pub error: WalletError,
    pub tx_hash: Option<H256>,
}

impl OperationFailure {
    pub fn after_submit(error: WalletError, tx_hash: H256) -> Self {
        Self {
            error,
            tx_hash: Some(tx_hash),
        }
    }
}

impl From<WalletError> for OperationFailure {
    fn from(error: WalletError) -> Self {
        Self {
            error,
            tx_hash: None,
        }
    }
}

impl Display for OperationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.tx_hash {
            Some(tx_hash) => write!(f, "{} (last tx hash: {:#x})", self.error, tx_hash),
            None => write!(f, "{} (nothing submitted)", self.error),
        }
    }
}

impl std::error::Error for OperationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
