use crate::config::Config;
use crate::contracts::{
    decode_wallet_balance, decode_wallet_owner, get_wallet_balance, get_wallet_owner,
    get_wallet_withdraw,
};
use crate::db::connection::create_sqlite_connection;
use crate::err_from;
use crate::error::{OperationFailure, WalletError};
use crate::eth::{ChainClient, Web3ChainClient};
use crate::model::{TransactionKind, TransactionReceipt};
use crate::nonce::NonceSequencer;
use crate::process::{confirm_transaction, submit_transaction};
use crate::service::{record_transaction, transaction_from_chain, RecordOutcome};
use crate::setup::WalletSetup;
use crate::signer::Signer;
use crate::transaction::{GasLimitPolicy, TransactionBuilder, TransactionCall};
use crate::utils::{checksum_address, ether_to_wei, wei_to_ether};

use rust_decimal::Decimal;
use secp256k1::SecretKey;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tokio::sync::Mutex;
use web3::types::{Address, Bytes, CallRequest, H256, U256};

/// Confirmed transaction and what happened when it was recorded
#[derive(Debug, Clone)]
pub struct CompletedTransaction {
    pub receipt: TransactionReceipt,
    pub record: RecordOutcome,
}

pub struct WalletRuntime {
    pub setup: WalletSetup,
    pub chain_id: u64,
    pub conn: Arc<Mutex<SqliteConnection>>,
    client: Arc<dyn ChainClient>,
    signer: Signer,
    sequencer: NonceSequencer,
}

/// Builds the runtime from the config file settings, connecting to the node and the database
pub async fn start_wallet_runtime(
    config: &Config,
    secret_key: SecretKey,
    db_filename: Option<&str>,
) -> Result<WalletRuntime, WalletError> {
    let setup = WalletSetup::new(config)?;
    log::debug!("Starting wallet runtime: {:#?}", setup);
    let client = Arc::new(Web3ChainClient::new(&setup.rpc_endpoint)?);
    log::info!("connecting to sqlite file db: {:?}", db_filename);
    let conn = create_sqlite_connection(db_filename, true).await?;
    WalletRuntime::new(setup, client, secret_key, Arc::new(Mutex::new(conn))).await
}

impl WalletRuntime {
    /// Fails with `NetworkUnavailable` when the node cannot be reached
    pub async fn new(
        setup: WalletSetup,
        client: Arc<dyn ChainClient>,
        secret_key: SecretKey,
        conn: Arc<Mutex<SqliteConnection>>,
    ) -> Result<Self, WalletError> {
        let chain_id = client.chain_id().await?;
        if let Some(expected) = setup.chain_id {
            if expected != chain_id {
                return Err(WalletError::ConfigError(format!(
                    "Node reports chain id {}, configured {}",
                    chain_id, expected
                )));
            }
        }
        let signer = Signer::new(secret_key);
        log::info!(
            "Connected to chain {}, sender {}, contract {}",
            chain_id,
            checksum_address(&signer.address()),
            checksum_address(&setup.contract_address)
        );
        Ok(Self {
            setup,
            chain_id,
            conn,
            client,
            signer,
            sequencer: NonceSequencer::new(),
        })
    }

    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Sends `amount` ether to the wallet contract
    pub async fn deposit(&self, amount: Decimal) -> Result<CompletedTransaction, OperationFailure> {
        let value = ether_to_wei(amount).map_err(err_from!())?;
        log::info!(
            "Depositing {} {} into {}",
            amount,
            self.setup.currency_symbol,
            checksum_address(&self.setup.contract_address)
        );
        self.execute(
            TransactionKind::Deposit,
            value,
            TransactionCall::Transfer,
            self.setup.deposit_gas,
        )
        .await
    }

    /// Calls `withdraw(recipient, amount)` on the wallet contract, recipient defaults to the sender
    pub async fn withdraw(
        &self,
        recipient: Option<Address>,
        amount: Decimal,
    ) -> Result<CompletedTransaction, OperationFailure> {
        let value = ether_to_wei(amount).map_err(err_from!())?;
        let recipient = recipient.unwrap_or_else(|| self.sender());

        let owner = self.contract_owner().await?;
        if owner != self.sender() {
            log::error!(
                "Sender {} is not the owner {} of the contract",
                checksum_address(&self.sender()),
                checksum_address(&owner)
            );
            return Err(WalletError::Authorization {
                sender: self.sender(),
                owner,
            }
            .into());
        }
        let contract_balance = self.contract_balance().await?;
        if contract_balance < value {
            log::warn!(
                "Contract balance {} {} is lower than requested {} {}",
                wei_to_ether(contract_balance).map_err(err_from!())?,
                self.setup.currency_symbol,
                amount,
                self.setup.currency_symbol
            );
        }

        log::info!(
            "Withdrawing {} {} to {}",
            amount,
            self.setup.currency_symbol,
            checksum_address(&recipient)
        );
        let data = get_wallet_withdraw(recipient, value).map_err(err_from!())?;
        self.execute(
            TransactionKind::Withdraw,
            U256::zero(),
            TransactionCall::Contract {
                method: "withdraw".to_string(),
                data,
            },
            self.setup.withdraw_gas,
        )
        .await
    }

    /// Polls a known hash again and records it
    pub async fn recheck(
        &self,
        tx_hash: &str,
        kind: TransactionKind,
    ) -> Result<RecordOutcome, WalletError> {
        transaction_from_chain(
            self.client.as_ref(),
            &self.conn,
            tx_hash,
            kind,
            &self.setup.confirm,
        )
        .await
    }

    pub async fn contract_owner(&self) -> Result<Address, WalletError> {
        let output = self.view_call(get_wallet_owner().map_err(err_from!())?).await?;
        decode_wallet_owner(&output.0)
    }

    pub async fn contract_balance(&self) -> Result<U256, WalletError> {
        let output = self
            .view_call(get_wallet_balance().map_err(err_from!())?)
            .await?;
        decode_wallet_balance(&output.0)
    }

    pub async fn sender_balance(&self) -> Result<U256, WalletError> {
        self.client.balance(self.sender()).await
    }

    async fn view_call(&self, data: Vec<u8>) -> Result<Bytes, WalletError> {
        self.client
            .call(CallRequest {
                from: Some(self.sender()),
                to: Some(self.setup.contract_address),
                data: Some(Bytes(data)),
                ..Default::default()
            })
            .await
    }

    async fn execute(
        &self,
        kind: TransactionKind,
        value: U256,
        call: TransactionCall,
        gas_policy: GasLimitPolicy,
    ) -> Result<CompletedTransaction, OperationFailure> {
        let tx_hash = self.build_and_submit(kind, value, call, gas_policy).await?;

        let receipt = confirm_transaction(self.client.as_ref(), tx_hash, &self.setup.confirm)
            .await
            .map_err(|e| OperationFailure::after_submit(e, tx_hash))?;
        if !receipt.status {
            log::warn!(
                "Transaction {:#x} reverted in block {}",
                tx_hash,
                receipt.block_number
            );
        }

        let record = {
            let mut conn = self.conn.lock().await;
            record_transaction(&mut conn, &receipt, kind)
                .await
                .map_err(|e| OperationFailure::after_submit(e, tx_hash))?
        };
        Ok(CompletedTransaction { receipt, record })
    }

    /// Holds the sender's sequencer slot until the node answered the broadcast.
    /// A nonce rejected as stale is rebuilt from scratch, never re-signed.
    /// Any other send failure carries the local hash, the node may have the transaction.
    async fn build_and_submit(
        &self,
        kind: TransactionKind,
        value: U256,
        call: TransactionCall,
        gas_policy: GasLimitPolicy,
    ) -> Result<H256, OperationFailure> {
        let builder = TransactionBuilder::new(self.client.as_ref(), &self.setup.fee_estimator);
        let mut rebuilds = 0;
        loop {
            let _guard = self.sequencer.acquire(self.sender()).await;
            let unsigned = builder
                .build(
                    kind,
                    self.sender(),
                    self.setup.contract_address,
                    value,
                    self.chain_id,
                    call.clone(),
                    gas_policy,
                )
                .await?;
            let signed = self.signer.sign(unsigned).await?;
            let local_hash = signed.tx_hash;
            match submit_transaction(self.client.as_ref(), signed).await {
                Ok(tx_hash) => return Ok(tx_hash),
                Err(WalletError::StaleNonce(msg)) if rebuilds < self.setup.nonce_rebuilds => {
                    rebuilds += 1;
                    log::warn!(
                        "Nonce rejected ({}), rebuilding transaction ({}/{})",
                        msg,
                        rebuilds,
                        self.setup.nonce_rebuilds
                    );
                }
                Err(err @ WalletError::StaleNonce(_)) => return Err(err.into()),
                Err(err) => return Err(OperationFailure::after_submit(err, local_hash)),
            }
        }
    }
}
