mod transaction_ops;

pub use transaction_ops::*;

#[cfg(test)]
pub(crate) use transaction_ops::tests::sample_dao;
