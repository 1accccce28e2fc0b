pub mod config;
pub mod contracts;
pub mod db;
pub mod error;
pub mod eth;
pub mod fee;
pub mod model;
pub mod nonce;
pub mod process;
pub mod runtime;
pub mod service;
pub mod setup;
pub mod signer;
pub mod transaction;
pub mod utils;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;
