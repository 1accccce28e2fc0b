use sqlx::SqliteConnection;
use std::str::FromStr;
use tokio::sync::Mutex;
use web3::types::{H256, U256};

use crate::db::model::*;
use crate::db::ops::*;
use crate::error::WalletError;
use crate::eth::ChainClient;
use crate::model::{TransactionKind, TransactionReceipt};
use crate::process::{confirm_transaction, ConfirmSettings};
use crate::utils::{checksum_address, wei_to_ether, wei_to_gwei, ConversionError};
use crate::err_from;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Inserted(TransactionDao),
    AlreadyRecorded,
}

fn u256_to_i64(value: U256, field: &str) -> Result<i64, ConversionError> {
    if value > U256::from(i64::MAX as u64) {
        return Err(ConversionError::from(format!(
            "{} {} does not fit the record",
            field, value
        )));
    }
    Ok(value.as_u64() as i64)
}

pub fn receipt_to_dao(
    receipt: &TransactionReceipt,
    kind: TransactionKind,
) -> Result<TransactionDao, WalletError> {
    Ok(TransactionDao {
        id: 0,
        tx_hash: format!("{:#x}", receipt.tx_hash),
        block_number: u256_to_i64(U256::from(receipt.block_number), "block number")
            .map_err(err_from!())?,
        from_address: checksum_address(&receipt.from),
        to_address: receipt.to.as_ref().map(checksum_address),
        value: wei_to_ether(receipt.value).map_err(err_from!())?.to_string(),
        gas_used: u256_to_i64(receipt.gas_used, "gas used").map_err(err_from!())?,
        gas_price: wei_to_gwei(receipt.gas_price)
            .map_err(err_from!())?
            .to_string(),
        status: receipt.status,
        transaction_type: kind.to_string(),
        created_at: chrono::Utc::now(),
    })
}

/// Persists a confirmed transaction. Recording the same hash again is a no-op.
pub async fn record_transaction(
    conn: &mut SqliteConnection,
    receipt: &TransactionReceipt,
    kind: TransactionKind,
) -> Result<RecordOutcome, WalletError> {
    let dao = receipt_to_dao(receipt, kind)?;
    match insert_transaction(conn, &dao).await {
        Ok(inserted) => {
            log::info!(
                "Recorded {} transaction {} as id {}",
                inserted.transaction_type,
                inserted.tx_hash,
                inserted.id
            );
            Ok(RecordOutcome::Inserted(inserted))
        }
        Err(WalletError::DuplicateRecord(tx_hash)) => {
            log::info!("Transaction {} already recorded, skipping", tx_hash);
            Ok(RecordOutcome::AlreadyRecorded)
        }
        Err(err) => Err(err),
    }
}

/// Polls a known hash and records it, used after a confirmation timeout or restart.
/// The connection is locked only for the insert.
pub async fn transaction_from_chain(
    client: &dyn ChainClient,
    conn: &Mutex<SqliteConnection>,
    tx_hash: &str,
    kind: TransactionKind,
    settings: &ConfirmSettings,
) -> Result<RecordOutcome, WalletError> {
    let tx_hash = H256::from_str(tx_hash)
        .map_err(|_err| ConversionError::from(format!("Cannot parse tx_hash {}", tx_hash)))
        .map_err(err_from!())?;
    log::info!("Checking transaction {:#x} on chain", tx_hash);
    let receipt = confirm_transaction(client, tx_hash, settings).await?;
    let mut conn = conn.lock().await;
    record_transaction(&mut conn, &receipt, kind).await
}
