use std::time::Duration;
use tokio::time::Instant;
use web3::types::H256;

use crate::error::WalletError;
use crate::eth::ChainClient;
use crate::model::TransactionReceipt;
use crate::signer::SignedTransaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmSettings {
    pub timeout: Duration,
    pub poll_interval_initial: Duration,
    pub poll_interval_max: Duration,
    pub confirmation_blocks: u64,
}

impl Default for ConfirmSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval_initial: Duration::from_millis(1000),
            poll_interval_max: Duration::from_millis(15000),
            confirmation_blocks: 0,
        }
    }
}

/// Broadcasts the signed transaction and returns its hash.
///
/// The locally computed hash is the one polled for; a different hash reported
/// by the node is only logged. A node that already holds the same signed
/// transaction counts as a successful broadcast.
pub async fn submit_transaction(
    client: &dyn ChainClient,
    signed: SignedTransaction,
) -> Result<H256, WalletError> {
    log::info!(
        "Sending {} transaction from {} with nonce {}",
        signed.unsigned.kind,
        signed.unsigned.sender_checksum(),
        signed.unsigned.nonce
    );
    let node_hash = match client
        .send_raw_transaction(signed.raw_transaction.clone())
        .await
    {
        Ok(node_hash) => node_hash,
        Err(WalletError::AlreadyKnown(msg)) => {
            log::warn!("Node already knows transaction {:#x}: {}", signed.tx_hash, msg);
            signed.tx_hash
        }
        Err(err) => return Err(err),
    };
    if node_hash != signed.tx_hash {
        log::warn!(
            "Node reported tx hash {:#x}, expected {:#x}",
            node_hash,
            signed.tx_hash
        );
    }
    log::info!("Transaction sent, tx hash: {:#x}", signed.tx_hash);
    Ok(signed.tx_hash)
}

/// Polls for the receipt of `tx_hash` until it is mined with enough confirmations.
///
/// The sleep doubles after every empty poll up to `poll_interval_max` and is
/// cut short at the deadline. Nothing is resubmitted.
pub async fn confirm_transaction(
    client: &dyn ChainClient,
    tx_hash: H256,
    settings: &ConfirmSettings,
) -> Result<TransactionReceipt, WalletError> {
    let deadline = Instant::now() + settings.timeout;
    let mut interval = settings.poll_interval_initial;
    loop {
        if let Some(receipt) = client.transaction_receipt(tx_hash).await? {
            if let Some(block_number) = receipt.block_number {
                let current_block_number = if settings.confirmation_blocks > 0 {
                    client.block_number().await?
                } else {
                    block_number
                };
                if block_number + settings.confirmation_blocks <= current_block_number {
                    let transaction = client.transaction(tx_hash).await?.ok_or_else(|| {
                        WalletError::Web3(format!(
                            "Transaction {:#x} has a receipt but is not known to the node",
                            tx_hash
                        ))
                    })?;
                    let receipt = TransactionReceipt::from_chain(receipt, transaction)?;
                    log::info!(
                        "Transaction confirmed: tx_hash: {:#x} block: {} status: {}",
                        tx_hash,
                        receipt.block_number,
                        receipt.status
                    );
                    return Ok(receipt);
                }
                log::info!(
                    "Waiting for confirmations: tx_hash: {:#x}. Current block {}, expected at least: {}",
                    tx_hash,
                    current_block_number,
                    block_number + settings.confirmation_blocks
                );
            }
        } else {
            log::debug!("Receipt not found: {:#x}", tx_hash);
        }

        let now = Instant::now();
        if now >= deadline {
            log::warn!(
                "Transaction {:#x} not confirmed within {:?}",
                tx_hash,
                settings.timeout
            );
            return Err(WalletError::ConfirmationTimeout { tx_hash });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = (interval * 2).min(settings.poll_interval_max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::FeeFields;
    use crate::model::TransactionKind;
    use crate::signer::Signer;
    use crate::testing::{test_contract, test_secret_key, test_sender, FakeChainClient};
    use crate::transaction::{UnsignedTransaction, TRANSFER_GAS_LIMIT};
    use web3::types::U256;

    fn fast_settings() -> ConfirmSettings {
        ConfirmSettings {
            timeout: Duration::from_millis(200),
            poll_interval_initial: Duration::from_millis(5),
            poll_interval_max: Duration::from_millis(20),
            confirmation_blocks: 0,
        }
    }

    async fn signed_deposit() -> SignedTransaction {
        Signer::new(test_secret_key())
            .sign(UnsignedTransaction {
                kind: TransactionKind::Deposit,
                method: "transfer".to_string(),
                from: test_sender(),
                to: test_contract(),
                value: U256::from(100_000_000_000_000u64),
                nonce: 0,
                gas_limit: TRANSFER_GAS_LIMIT,
                fees: FeeFields::Eip1559 {
                    max_fee_per_gas: U256::from(3_000_000_000u64),
                    max_priority_fee_per_gas: U256::from(1_000_000_000u64),
                },
                chain_id: 11155111,
                call_data: vec![],
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_local_hash() {
        let client = FakeChainClient::new();
        let signed = signed_deposit().await;
        let expected = signed.tx_hash;
        let tx_hash = submit_transaction(&client, signed).await.unwrap();
        assert_eq!(tx_hash, expected);
        assert_eq!(client.state().sent.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_already_known_is_success() {
        let client = FakeChainClient::new();
        client.state().already_known_responses = 1;
        let signed = signed_deposit().await;
        let expected = signed.tx_hash;
        let tx_hash = submit_transaction(&client, signed).await.unwrap();
        assert_eq!(tx_hash, expected);
        assert_eq!(client.state().sent.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_after_some_polls() {
        let client = FakeChainClient::new();
        client.state().polls_before_mined = 3;
        client.state().mined_value = U256::from(100_000_000_000_000u64);
        let tx_hash = submit_transaction(&client, signed_deposit().await)
            .await
            .unwrap();
        let receipt = confirm_transaction(&client, tx_hash, &fast_settings())
            .await
            .unwrap();
        assert_eq!(receipt.tx_hash, tx_hash);
        assert!(receipt.status);
        assert_eq!(receipt.block_number, 100);
        assert_eq!(receipt.from, test_sender());
        assert_eq!(receipt.value, U256::from(100_000_000_000_000u64));
        assert_eq!(client.state().receipt_polls, 4);
    }

    #[tokio::test]
    async fn test_confirm_times_out_without_resubmitting() {
        let client = FakeChainClient::new();
        client.state().mine = false;
        let tx_hash = submit_transaction(&client, signed_deposit().await)
            .await
            .unwrap();
        let started = Instant::now();
        let err = confirm_transaction(&client, tx_hash, &fast_settings())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::ConfirmationTimeout { tx_hash: h } if h == tx_hash));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(client.state().sent.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_blocks_wait_for_depth() {
        let client = FakeChainClient::new();
        let tx_hash = submit_transaction(&client, signed_deposit().await)
            .await
            .unwrap();
        let settings = ConfirmSettings {
            confirmation_blocks: 5,
            ..fast_settings()
        };
        // receipt block equals head block, never deep enough
        let err = confirm_transaction(&client, tx_hash, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::ConfirmationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_confirm_propagates_network_error() {
        let client = FakeChainClient::new();
        client.state().offline = true;
        let err = confirm_transaction(&client, H256::from_low_u64_be(1), &fast_settings())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NetworkUnavailable(_)));
    }
}
