mod options;

use actix_cors::Cors;
use actix_web::web::Data;
use actix_web::{middleware, App, HttpServer};
use secp256k1::SecretKey;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use structopt::StructOpt;
use tokio::sync::Mutex;

use wallet_lib::config::Config;
use wallet_lib::db::connection::create_sqlite_connection;
use wallet_lib::error::{OperationFailure, WalletError};
use wallet_lib::runtime::{start_wallet_runtime, CompletedTransaction, WalletRuntime};
use wallet_lib::server::{configure_routes, ServerData};
use wallet_lib::service::RecordOutcome;
use wallet_lib::utils::wei_to_ether;
use wallet_lib::{err_custom_create, err_from};

use crate::options::{CliOptions, Command};

const DEFAULT_DB_FILENAME: &str = "wallet.sqlite";

fn load_secret_key() -> Result<SecretKey, WalletError> {
    let key = env::var("ETH_PRIVATE_KEY")
        .map_err(|_| WalletError::ConfigError("ETH_PRIVATE_KEY is not set".to_string()))?;
    let key = key.trim();
    SecretKey::from_str(key.strip_prefix("0x").unwrap_or(key))
        .map_err(|_| WalletError::ConfigError("ETH_PRIVATE_KEY is not a valid key".to_string()))
}

fn db_filename() -> String {
    env::var("DB_SQLITE_FILENAME").unwrap_or_else(|_| DEFAULT_DB_FILENAME.to_string())
}

fn report(completed: &CompletedTransaction) {
    let receipt = &completed.receipt;
    log::info!(
        "Transaction {:#x} mined in block {}, status: {}, gas used: {}",
        receipt.tx_hash,
        receipt.block_number,
        if receipt.status { "success" } else { "reverted" },
        receipt.gas_used
    );
    match &completed.record {
        RecordOutcome::Inserted(dao) => log::info!("Saved as record {}", dao.id),
        RecordOutcome::AlreadyRecorded => log::info!("Record already existed"),
    }
}

async fn start_runtime(config: &Config) -> Result<WalletRuntime, WalletError> {
    let secret_key = load_secret_key()?;
    let db_filename = db_filename();
    start_wallet_runtime(config, secret_key, Some(db_filename.as_str())).await
}

async fn run_server(host: &str, port: u16) -> Result<(), WalletError> {
    let db_filename = db_filename();
    log::info!("connecting to sqlite file db: {}", db_filename);
    let conn = create_sqlite_connection(Some(db_filename.as_str()), true).await?;
    let server_data = Data::new(Box::new(ServerData {
        db_connection: Arc::new(Mutex::new(conn)),
    }));

    log::info!("Starting http server on {}:{}", host, port);
    HttpServer::new(move || {
        let cors = Cors::permissive();
        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(server_data.clone())
            .configure(configure_routes)
    })
    .workers(1)
    .bind((host, port))
    .map_err(err_from!())?
    .run()
    .await
    .map_err(err_from!())
}

async fn run(cli: CliOptions) -> Result<(), OperationFailure> {
    let config = Config::load(&cli.config)?;
    match cli.command {
        Command::Deposit(opt) => {
            let runtime = start_runtime(&config).await?;
            report(&runtime.deposit(opt.amount).await?);
        }
        Command::Withdraw(opt) => {
            let runtime = start_runtime(&config).await?;
            report(&runtime.withdraw(opt.recipient, opt.amount).await?);
        }
        Command::Recheck(opt) => {
            let runtime = start_runtime(&config).await?;
            match runtime.recheck(&opt.tx_hash, opt.kind).await? {
                RecordOutcome::Inserted(dao) => {
                    log::info!("Transaction {} saved as record {}", dao.tx_hash, dao.id)
                }
                RecordOutcome::AlreadyRecorded => {
                    log::info!("Transaction {} was already recorded", opt.tx_hash)
                }
            }
        }
        Command::Balance => {
            let runtime = start_runtime(&config).await?;
            let symbol = &runtime.setup.currency_symbol;
            let sender_balance = runtime.sender_balance().await?;
            let contract_balance = runtime.contract_balance().await?;
            let owner = runtime.contract_owner().await?;
            println!(
                "sender {:#x}: {} {}",
                runtime.sender(),
                wei_to_ether(sender_balance).map_err(err_from!())?,
                symbol
            );
            println!(
                "contract {:#x}: {} {} (owner {:#x})",
                runtime.setup.contract_address,
                wei_to_ether(contract_balance).map_err(err_from!())?,
                symbol,
                owner
            );
        }
        Command::Server(opt) => {
            run_server(&opt.host, opt.port).await?;
        }
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<(), WalletError> {
    let dotenv_result = dotenv::dotenv();
    env_logger::init();
    if let Err(err) = dotenv_result {
        log::debug!("No .env file loaded: {}", err);
    }

    let cli = CliOptions::from_args();
    if let Err(failure) = run(cli).await {
        log::error!("{}", failure);
        match failure.tx_hash {
            Some(tx_hash) => log::info!(
                "Transaction may still be mined, check it later with: recheck --tx-hash {:#x}",
                tx_hash
            ),
            None if failure.error.is_retryable() => log::info!("The operation can be retried"),
            None => {}
        }
        return Err(err_custom_create!("{}", failure));
    }
    Ok(())
}
