/// Create a `WalletError::Custom` from a format string
#[macro_export]
macro_rules! err_custom_create {
    ($($t:tt)*) => {
        $crate::error::WalletError::Custom($crate::error::CustomError::new(&format!($($t)*)))
    };
}

/// Closure converting any error with a `WalletError` conversion, for use in `map_err`
#[macro_export]
macro_rules! err_from {
    () => {
        |e| $crate::error::WalletError::from(e)
    };
}
