use lazy_static::lazy_static;
use std::error;
use web3::contract::tokens::Tokenize;
use web3::contract::Contract;
use web3::ethabi::Token;
use web3::transports::Http;
use web3::types::{Address, U256};
use web3::{Transport, Web3};

use crate::err_custom_create;
use crate::error::WalletError;

lazy_static! {
    pub static ref DUMMY_RPC_PROVIDER: Web3<Http> = {
        let transport = web3::transports::Http::new("http://noconn").unwrap();
        Web3::new(transport)
    };
    pub static ref WALLET_CONTRACT_TEMPLATE: Contract<Http> =
        prepare_contract_template(include_bytes!("../contracts/wallet.json")).unwrap();
}

pub fn prepare_contract_template(json_abi: &[u8]) -> Result<Contract<Http>, Box<dyn error::Error>> {
    let contract = Contract::from_json(DUMMY_RPC_PROVIDER.eth(), Address::zero(), json_abi)?;

    Ok(contract)
}

pub fn contract_encode<P, T>(
    contract: &Contract<T>,
    func: &str,
    params: P,
) -> Result<Vec<u8>, web3::ethabi::Error>
where
    P: Tokenize,
    T: Transport,
{
    contract
        .abi()
        .function(func)
        .and_then(|function| function.encode_input(&params.into_tokens()))
}

fn contract_decode<T>(
    contract: &Contract<T>,
    func: &str,
    output: &[u8],
) -> Result<Vec<Token>, WalletError>
where
    T: Transport,
{
    let tokens = contract
        .abi()
        .function(func)
        .and_then(|function| function.decode_output(output))?;
    Ok(tokens)
}

pub fn get_wallet_withdraw(to: Address, amount: U256) -> Result<Vec<u8>, web3::ethabi::Error> {
    contract_encode(&WALLET_CONTRACT_TEMPLATE, "withdraw", (to, amount))
}

pub fn get_wallet_owner() -> Result<Vec<u8>, web3::ethabi::Error> {
    WALLET_CONTRACT_TEMPLATE
        .abi()
        .function("owner")
        .and_then(|function| function.encode_input(&[]))
}

pub fn get_wallet_balance() -> Result<Vec<u8>, web3::ethabi::Error> {
    WALLET_CONTRACT_TEMPLATE
        .abi()
        .function("getBalance")
        .and_then(|function| function.encode_input(&[]))
}

pub fn decode_wallet_owner(output: &[u8]) -> Result<Address, WalletError> {
    contract_decode(&WALLET_CONTRACT_TEMPLATE, "owner", output)?
        .into_iter()
        .next()
        .and_then(|token| token.into_address())
        .ok_or_else(|| err_custom_create!("Invalid response from owner() {}", hex::encode(output)))
}

pub fn decode_wallet_balance(output: &[u8]) -> Result<U256, WalletError> {
    contract_decode(&WALLET_CONTRACT_TEMPLATE, "getBalance", output)?
        .into_iter()
        .next()
        .and_then(|token| token.into_uint())
        .ok_or_else(|| {
            err_custom_create!("Invalid response from getBalance() {}", hex::encode(output))
        })
}
