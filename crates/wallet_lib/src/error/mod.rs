mod custom;
mod wrapped;

pub use custom::CustomError;
pub use wrapped::{OperationFailure, WalletError};

/// Export macros for creating errors
mod macros;
