use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::str::FromStr;

/// Stored as exact decimal text, served as a JSON number
fn decimal_as_number<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let value = Decimal::from_str(value).map_err(serde::ser::Error::custom)?;
    rust_decimal::serde::arbitrary_precision::serialize(&value, serializer)
}

/// Row of the `transactions` table. Written once after confirmation.
#[derive(Serialize, sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct TransactionDao {
    pub id: i64,
    pub tx_hash: String,
    pub block_number: i64,
    pub from_address: String,
    pub to_address: Option<String>,
    /// ether
    #[serde(serialize_with = "decimal_as_number")]
    pub value: String,
    pub gas_used: i64,
    /// gwei
    #[serde(serialize_with = "decimal_as_number")]
    pub gas_price: String,
    pub status: bool,
    pub transaction_type: String,
    pub created_at: DateTime<Utc>,
}
