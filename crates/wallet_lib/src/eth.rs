use async_trait::async_trait;
use secp256k1::{PublicKey, SecretKey};
use sha3::Digest;
use sha3::Keccak256;
use web3::transports::Http;
use web3::types::{
    Address, BlockId, BlockNumber, Bytes, CallRequest, TransactionId, H256, U256,
};
use web3::{Transport, Web3};

use crate::error::WalletError;
use crate::model::{ChainReceipt, ChainTransaction};
use crate::{err_custom_create, err_from};

/// Node capabilities used by the transaction lifecycle.
///
/// Implemented over JSON-RPC by [`Web3ChainClient`]; tests substitute a fake.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, WalletError>;
    async fn block_number(&self) -> Result<u64, WalletError>;
    /// Nonce for the next transaction; `pending` includes mempool transactions
    async fn transaction_count(&self, address: Address, pending: bool) -> Result<u64, WalletError>;
    async fn gas_price(&self) -> Result<U256, WalletError>;
    async fn max_priority_fee(&self) -> Result<U256, WalletError>;
    /// Base fee of the latest block, None on pre-London chains
    async fn base_fee(&self) -> Result<Option<U256>, WalletError>;
    async fn estimate_gas(&self, call_request: CallRequest) -> Result<U256, WalletError>;
    async fn code(&self, address: Address) -> Result<Bytes, WalletError>;
    async fn balance(&self, address: Address) -> Result<U256, WalletError>;
    async fn call(&self, call_request: CallRequest) -> Result<Bytes, WalletError>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, WalletError>;
    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<ChainReceipt>, WalletError>;
    async fn transaction(&self, tx_hash: H256) -> Result<Option<ChainTransaction>, WalletError>;
}

#[derive(Clone, Debug)]
pub struct Web3ChainClient {
    web3: Web3<Http>,
}

impl Web3ChainClient {
    pub fn new(url: &str) -> Result<Self, WalletError> {
        let transport = web3::transports::Http::new(url).map_err(err_from!())?;
        Ok(Self {
            web3: Web3::new(transport),
        })
    }
}

#[async_trait]
impl ChainClient for Web3ChainClient {
    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.web3.eth().chain_id().await.map_err(err_from!())?.as_u64())
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        Ok(self.web3.eth().block_number().await.map_err(err_from!())?.as_u64())
    }

    async fn transaction_count(&self, address: Address, pending: bool) -> Result<u64, WalletError> {
        let nonce_type = match pending {
            true => BlockNumber::Pending,
            false => BlockNumber::Latest,
        };
        let nonce = self
            .web3
            .eth()
            .transaction_count(address, Some(nonce_type))
            .await
            .map_err(err_from!())?;
        Ok(nonce.as_u64())
    }

    async fn gas_price(&self) -> Result<U256, WalletError> {
        self.web3.eth().gas_price().await.map_err(err_from!())
    }

    async fn max_priority_fee(&self) -> Result<U256, WalletError> {
        // not wrapped by web3 0.18
        let value = self
            .web3
            .transport()
            .execute("eth_maxPriorityFeePerGas", vec![])
            .await
            .map_err(err_from!())?;
        serde_json::from_value::<U256>(value)
            .map_err(|e| err_custom_create!("Invalid eth_maxPriorityFeePerGas response: {}", e))
    }

    async fn base_fee(&self) -> Result<Option<U256>, WalletError> {
        let block = self
            .web3
            .eth()
            .block(BlockId::Number(BlockNumber::Latest))
            .await
            .map_err(err_from!())?;
        Ok(block.and_then(|b| b.base_fee_per_gas))
    }

    async fn estimate_gas(&self, call_request: CallRequest) -> Result<U256, WalletError> {
        self.web3
            .eth()
            .estimate_gas(call_request, None)
            .await
            .map_err(err_from!())
    }

    async fn code(&self, address: Address) -> Result<Bytes, WalletError> {
        self.web3.eth().code(address, None).await.map_err(err_from!())
    }

    async fn balance(&self, address: Address) -> Result<U256, WalletError> {
        self.web3.eth().balance(address, None).await.map_err(err_from!())
    }

    async fn call(&self, call_request: CallRequest) -> Result<Bytes, WalletError> {
        self.web3
            .eth()
            .call(call_request, None)
            .await
            .map_err(err_from!())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, WalletError> {
        self.web3
            .eth()
            .send_raw_transaction(raw)
            .await
            .map_err(err_from!())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ChainReceipt>, WalletError> {
        let receipt = self
            .web3
            .eth()
            .transaction_receipt(tx_hash)
            .await
            .map_err(err_from!())?;
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        log::debug!("receipt: {:?}", receipt);
        Ok(Some(ChainReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|x| x.as_u64()),
            gas_used: receipt
                .gas_used
                .ok_or_else(|| err_custom_create!("Gas used expected"))?,
            status: receipt.status.map(|x| x.as_u64() == 1).unwrap_or(false),
            effective_gas_price: receipt.effective_gas_price,
        }))
    }

    async fn transaction(&self, tx_hash: H256) -> Result<Option<ChainTransaction>, WalletError> {
        let tx = self
            .web3
            .eth()
            .transaction(TransactionId::Hash(tx_hash))
            .await
            .map_err(err_from!())?;
        let Some(tx) = tx else {
            return Ok(None);
        };
        Ok(Some(ChainTransaction {
            tx_hash: tx.hash,
            from: tx
                .from
                .ok_or_else(|| err_custom_create!("Transaction {:#x} without sender", tx_hash))?,
            to: tx.to,
            value: tx.value,
            gas_price: tx.gas_price,
            block_number: tx.block_number.map(|x| x.as_u64()),
        }))
    }
}

pub fn get_eth_addr_from_secret(secret_key: &SecretKey) -> Address {
    Address::from_slice(
        &Keccak256::digest(
            &PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), secret_key)
                .serialize_uncompressed()[1..65],
        )
        .as_slice()[12..],
    )
}
