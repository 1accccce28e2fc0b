use secp256k1::SecretKey;
use std::fmt::{Debug, Formatter};
use web3::types::{Address, Bytes, H256};

use crate::contracts::DUMMY_RPC_PROVIDER;
use crate::err_custom_create;
use crate::error::WalletError;
use crate::eth::get_eth_addr_from_secret;
use crate::transaction::UnsignedTransaction;

/// Unsigned transaction plus its raw signed encoding. Consumed by the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub unsigned: UnsignedTransaction,
    pub raw_transaction: Bytes,
    pub tx_hash: H256,
}

/// Holds the account key for the lifetime of the process
pub struct Signer {
    secret_key: SecretKey,
    address: Address,
}

impl Debug for Signer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(secret_key: SecretKey) -> Self {
        let address = get_eth_addr_from_secret(&secret_key);
        Self {
            secret_key,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn sign(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, WalletError> {
        if tx.from != self.address {
            return Err(err_custom_create!(
                "From addr not match with secret key {:#x} != {:#x}",
                tx.from,
                self.address
            ));
        }

        let tx_object = tx.to_transaction_parameters();
        log::debug!("Signing transaction: {:#?}", tx_object);
        // nonce, fees and chain id are all set, so no request reaches the provider
        let signed = DUMMY_RPC_PROVIDER
            .accounts()
            .sign_transaction(tx_object, &self.secret_key)
            .await
            .map_err(|e| err_custom_create!("Failed to sign transaction: {}", e))?;

        log::debug!(
            "Transaction signed successfully: {:#x}",
            signed.transaction_hash
        );
        Ok(SignedTransaction {
            unsigned: tx,
            raw_transaction: signed.raw_transaction,
            tx_hash: signed.transaction_hash,
        })
    }
}
