use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use web3::types::Address;

/// At most one in-flight nonce allocation per sender.
///
/// The guard returned by [`NonceSequencer::acquire`] is held from the nonce
/// fetch until the node accepted (or rejected) the broadcast, so the next
/// allocation for that sender sees the previous transaction in the pending count.
#[derive(Default)]
pub struct NonceSequencer {
    senders: DashMap<Address, Arc<Mutex<()>>>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, sender: Address) -> OwnedMutexGuard<()> {
        let lock = self
            .senders
            .entry(sender)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        log::debug!("Waiting for nonce allocation slot of {:#x}", sender);
        lock.lock_owned().await
    }
}
