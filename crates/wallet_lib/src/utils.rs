use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sha3::{Digest, Keccak256};
use std::error::Error;
use std::fmt::{Display, Formatter};
use web3::types::{Address, U256};

pub const ETHER_DECIMALS: u32 = 18;
pub const GWEI_DECIMALS: u32 = 9;

#[derive(Debug, Clone)]
pub struct ConversionError {
    pub msg: String,
}

impl ConversionError {
    pub fn from(msg: String) -> Self {
        Self { msg }
    }
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error during conversion: {}", self.msg)
    }
}

impl Error for ConversionError {}

pub fn gwei_to_u256(gas: f64) -> Result<U256, ConversionError> {
    pub const GWEI: f64 = 1.0E9;
    if gas.is_nan() {
        return Err(ConversionError {
            msg: "Gas price cannot be NaN".to_string(),
        });
    }
    if gas < 0.0 {
        return Err(ConversionError {
            msg: "Gas price cannot be negative".to_string(),
        });
    }
    if gas > 1.0E9 {
        return Err(ConversionError {
            msg: "Gas price cannot be greater than 1E9".to_string(),
        });
    }
    Ok(U256::from((gas * GWEI).round() as u64))
}

/// Fixed point view of an integer amount, e.g. wei with 18 decimals gives ether.
pub fn u256_to_rust_dec(amount: U256, decimals: Option<u32>) -> Result<Decimal, ConversionError> {
    // Decimal mantissa is 96 bits
    let max_mantissa = U256::from((1u128 << 96) - 1);
    if amount > max_mantissa {
        return Err(ConversionError::from(format!(
            "Amount {} too big to convert to decimal",
            amount
        )));
    }
    let decimals = decimals.unwrap_or(0);
    if decimals > 28 {
        return Err(ConversionError::from(format!(
            "Too many decimals: {}",
            decimals
        )));
    }
    Ok(Decimal::from_i128_with_scale(amount.as_u128() as i128, decimals).normalize())
}

/// Inverse of [`u256_to_rust_dec`]: 0.0001 with 18 decimals gives 100000000000000.
pub fn rust_dec_to_u256(amount: Decimal, decimals: Option<u32>) -> Result<U256, ConversionError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConversionError::from(format!(
            "Amount cannot be negative: {}",
            amount
        )));
    }
    let decimals = decimals.unwrap_or(0);
    let multiplier = 10u64.checked_pow(decimals).ok_or_else(|| {
        ConversionError::from(format!("Too many decimals: {}", decimals))
    })?;
    let scaled = amount
        .checked_mul(Decimal::from(multiplier))
        .ok_or_else(|| ConversionError::from(format!("Amount {} too big", amount)))?;
    if !scaled.fract().is_zero() {
        return Err(ConversionError::from(format!(
            "Amount {} has more than {} decimal places",
            amount, decimals
        )));
    }
    let int_value = scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| ConversionError::from(format!("Amount {} out of range", amount)))?;
    Ok(U256::from(int_value))
}

pub fn wei_to_ether(wei: U256) -> Result<Decimal, ConversionError> {
    u256_to_rust_dec(wei, Some(ETHER_DECIMALS))
}

pub fn wei_to_gwei(wei: U256) -> Result<Decimal, ConversionError> {
    u256_to_rust_dec(wei, Some(GWEI_DECIMALS))
}

pub fn ether_to_wei(ether: Decimal) -> Result<U256, ConversionError> {
    rust_dec_to_u256(ether, Some(ETHER_DECIMALS))
}

/// EIP-55 mixed case checksum encoding
pub fn checksum_address(address: &Address) -> String {
    let lower = hex::encode(address.as_bytes());
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (idx, c) in lower.chars().enumerate() {
        let nibble = if idx % 2 == 0 {
            hash[idx / 2] >> 4
        } else {
            hash[idx / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
