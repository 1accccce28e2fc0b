use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use web3::types::{Address, Bytes, CallRequest, H256, U256};

use secp256k1::SecretKey;

use crate::contracts::{get_wallet_balance, get_wallet_owner};
use crate::error::WalletError;
use crate::eth::ChainClient;
use crate::model::{ChainReceipt, ChainTransaction};

pub const TEST_SECRET: &str = "0000000000000000000000000000000000000000000000000000000000000001";

pub fn test_secret_key() -> SecretKey {
    SecretKey::from_str(TEST_SECRET).unwrap()
}

/// Address of [`TEST_SECRET`]
pub fn test_sender() -> Address {
    Address::from_str("7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap()
}

pub fn test_contract() -> Address {
    Address::from_str("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap()
}

fn rpc_error(message: &str) -> web3::Error {
    web3::Error::Rpc(
        serde_json::from_value(serde_json::json!({
            "code": -32000,
            "message": message
        }))
        .unwrap(),
    )
}

pub struct FakeState {
    pub offline: bool,
    pub chain_id: u64,
    pub block_number: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub priority_fee: Result<U256, String>,
    pub base_fee: Option<U256>,
    pub estimate: Result<U256, String>,
    pub estimate_requests: Vec<CallRequest>,
    pub codes: HashMap<Address, Vec<u8>>,
    pub owner: Address,
    pub contract_balance: U256,
    pub balance: U256,
    /// next sends rejected with a nonce error
    pub stale_nonce_rejections: u32,
    /// next sends rejected as underpriced replacements
    pub underpriced_rejections: u32,
    /// next sends accepted, then answered with "already known"
    pub already_known_responses: u32,
    /// next sends accepted, then the connection drops before the answer
    pub dropped_responses: u32,
    pub sent: Vec<Bytes>,
    /// when false receipts never show up
    pub mine: bool,
    /// receipt polls answered with None before the receipt shows up
    pub polls_before_mined: u32,
    pub receipt_polls: u32,
    pub mined_status: bool,
    pub mined_gas_used: U256,
    pub mined_from: Address,
    pub mined_to: Option<Address>,
    pub mined_value: U256,
    pub mined_gas_price: Option<U256>,
}

pub struct FakeChainClient {
    state: Mutex<FakeState>,
}

impl FakeChainClient {
    pub fn new() -> Self {
        let mut codes = HashMap::new();
        codes.insert(test_contract(), vec![0x60, 0x80, 0x60, 0x40]);
        Self {
            state: Mutex::new(FakeState {
                offline: false,
                chain_id: 11155111,
                block_number: 100,
                nonce: 0,
                gas_price: U256::from(2_000_000_000u64),
                priority_fee: Ok(U256::from(1_000_000_000u64)),
                base_fee: Some(U256::from(1_000_000_000u64)),
                estimate: Ok(U256::from(50000)),
                estimate_requests: vec![],
                codes,
                owner: test_sender(),
                contract_balance: U256::zero(),
                balance: U256::exp10(18),
                stale_nonce_rejections: 0,
                underpriced_rejections: 0,
                already_known_responses: 0,
                dropped_responses: 0,
                sent: vec![],
                mine: true,
                polls_before_mined: 0,
                receipt_polls: 0,
                mined_status: true,
                mined_gas_used: U256::from(21000),
                mined_from: test_sender(),
                mined_to: Some(test_contract()),
                mined_value: U256::zero(),
                mined_gas_price: Some(U256::from(2_000_000_000u64)),
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn online(&self) -> Result<MutexGuard<'_, FakeState>, WalletError> {
        let state = self.state();
        if state.offline {
            return Err(WalletError::NetworkUnavailable(
                "error sending request: connection refused".to_string(),
            ));
        }
        Ok(state)
    }

    fn is_sent(state: &FakeState, tx_hash: H256) -> bool {
        state
            .sent
            .iter()
            .any(|raw| H256::from_slice(&Keccak256::digest(&raw.0)) == tx_hash)
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.online()?.chain_id)
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        Ok(self.online()?.block_number)
    }

    async fn transaction_count(
        &self,
        _address: Address,
        _pending: bool,
    ) -> Result<u64, WalletError> {
        Ok(self.online()?.nonce)
    }

    async fn gas_price(&self) -> Result<U256, WalletError> {
        Ok(self.online()?.gas_price)
    }

    async fn max_priority_fee(&self) -> Result<U256, WalletError> {
        self.online()?.priority_fee.clone().map_err(WalletError::Web3)
    }

    async fn base_fee(&self) -> Result<Option<U256>, WalletError> {
        Ok(self.online()?.base_fee)
    }

    async fn estimate_gas(&self, call_request: CallRequest) -> Result<U256, WalletError> {
        let mut state = self.online()?;
        state.estimate_requests.push(call_request);
        state.estimate.clone().map_err(WalletError::Web3)
    }

    async fn code(&self, address: Address) -> Result<Bytes, WalletError> {
        Ok(Bytes(
            self.online()?.codes.get(&address).cloned().unwrap_or_default(),
        ))
    }

    async fn balance(&self, _address: Address) -> Result<U256, WalletError> {
        Ok(self.online()?.balance)
    }

    async fn call(&self, call_request: CallRequest) -> Result<Bytes, WalletError> {
        let state = self.online()?;
        let data = call_request.data.map(|d| d.0).unwrap_or_default();
        let mut output = [0u8; 32];
        if data == get_wallet_owner()? {
            output[12..].copy_from_slice(state.owner.as_bytes());
        } else if data == get_wallet_balance()? {
            state.contract_balance.to_big_endian(&mut output);
        } else {
            return Err(WalletError::Web3("execution reverted".to_string()));
        }
        Ok(Bytes(output.to_vec()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, WalletError> {
        let mut state = self.online()?;
        if state.stale_nonce_rejections > 0 {
            state.stale_nonce_rejections -= 1;
            // another transaction took the nonce in the meantime
            state.nonce += 1;
            return Err(rpc_error("nonce too low").into());
        }
        if state.underpriced_rejections > 0 {
            state.underpriced_rejections -= 1;
            state.nonce += 1;
            return Err(rpc_error("replacement transaction underpriced").into());
        }
        let tx_hash = H256::from_slice(&Keccak256::digest(&raw.0));
        if !state.sent.contains(&raw) {
            state.sent.push(raw);
            state.nonce += 1;
        }
        if state.already_known_responses > 0 {
            state.already_known_responses -= 1;
            return Err(rpc_error("already known").into());
        }
        if state.dropped_responses > 0 {
            state.dropped_responses -= 1;
            return Err(WalletError::NetworkUnavailable(
                "connection reset by peer".to_string(),
            ));
        }
        Ok(tx_hash)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ChainReceipt>, WalletError> {
        let mut state = self.online()?;
        state.receipt_polls += 1;
        if !state.mine || !Self::is_sent(&state, tx_hash) {
            return Ok(None);
        }
        if state.receipt_polls <= state.polls_before_mined {
            return Ok(None);
        }
        Ok(Some(ChainReceipt {
            tx_hash,
            block_number: Some(state.block_number),
            gas_used: state.mined_gas_used,
            status: state.mined_status,
            effective_gas_price: state.mined_gas_price,
        }))
    }

    async fn transaction(&self, tx_hash: H256) -> Result<Option<ChainTransaction>, WalletError> {
        let state = self.online()?;
        if !Self::is_sent(&state, tx_hash) {
            return Ok(None);
        }
        Ok(Some(ChainTransaction {
            tx_hash,
            from: state.mined_from,
            to: state.mined_to,
            value: state.mined_value,
            gas_price: state.mined_gas_price,
            block_number: state.mine.then_some(state.block_number),
        }))
    }
}
