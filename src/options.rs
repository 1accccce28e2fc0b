use rust_decimal::Decimal;
use std::path::PathBuf;
use structopt::StructOpt;
use wallet_lib::model::TransactionKind;
use web3::types::Address;

#[derive(Debug, StructOpt)]
pub struct AmountOptions {
    #[structopt(long = "amount", help = "Amount in ether, e.g. 0.0001")]
    pub amount: Decimal,
}

#[derive(Debug, StructOpt)]
pub struct WithdrawOptions {
    #[structopt(long = "amount", help = "Amount in ether, e.g. 0.0001")]
    pub amount: Decimal,

    #[structopt(
        long = "recipient",
        help = "Address receiving the funds, defaults to the sender"
    )]
    pub recipient: Option<Address>,
}

#[derive(Debug, StructOpt)]
pub struct RecheckOptions {
    #[structopt(long = "tx-hash", help = "Hash of an already broadcast transaction")]
    pub tx_hash: String,

    #[structopt(long = "kind", help = "deposit or withdraw")]
    pub kind: TransactionKind,
}

#[derive(Debug, StructOpt)]
pub struct ServerOptions {
    #[structopt(long = "host", default_value = "127.0.0.1")]
    pub host: String,

    #[structopt(long = "port", default_value = "8000")]
    pub port: u16,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Send ether to the wallet contract
    #[structopt(name = "deposit")]
    Deposit(AmountOptions),
    /// Withdraw ether from the wallet contract (owner only)
    #[structopt(name = "withdraw")]
    Withdraw(WithdrawOptions),
    /// Poll a known transaction hash and record it
    #[structopt(name = "recheck")]
    Recheck(RecheckOptions),
    /// Show sender and contract balances
    #[structopt(name = "balance")]
    Balance,
    /// Serve recorded transactions over HTTP
    #[structopt(name = "server")]
    Server(ServerOptions),
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "eth_wallet",
    about = "Deposit to and withdraw from a wallet contract, recording every transaction"
)]
pub struct CliOptions {
    #[structopt(
        long = "config",
        default_value = "config-wallet.toml",
        parse(from_os_str)
    )]
    pub config: PathBuf,

    #[structopt(subcommand)]
    pub command: Command,
}
