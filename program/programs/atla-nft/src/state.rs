use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Sequential identifier of an issued item. The first item is `0`.
pub type ItemId = u64;

/// Opaque externally supplied account identifier (address-equivalent).
///
/// Accounts have no lifecycle of their own; they come into existence the
/// first time they are referenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Named permission grouping.
///
/// The predefined roles are constants; any other name is accepted as an
/// opaque role administered by [`Role::ADMIN`] unless reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Administers itself and, by default, every other role.
    pub const ADMIN: Role = Role(Cow::Borrowed("ADMIN"));
    /// May issue new items.
    pub const MINTER: Role = Role(Cow::Borrowed("MINTER"));
    /// May deliver randomness fulfillments.
    pub const ORACLE: Role = Role(Cow::Borrowed("ORACLE"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An issued item and its current owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub owner: Account,
}

/// Correlation identifier linking a randomness request to its fulfillment.
///
/// Allocated from a monotonically increasing counter, so an id is never
/// reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outstanding randomness request awaiting oracle fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub requester: Account,
    /// Commit number at which the request was recorded.
    pub created_at: u64,
}

/// The most recently assigned reward item.
///
/// `set` is false until the first fulfillment that derives a reward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewardState {
    pub value: ItemId,
    pub set: bool,
}

/// A 256-bit random value, the width of a Solidity `uint256` word.
///
/// Parses from a decimal string or a `0x`-prefixed hex string and
/// serializes as hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RandomValue(U256);

impl RandomValue {
    /// Interpret `bytes` as a big-endian word.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_be_bytes(bytes))
    }

    pub const fn get(self) -> U256 {
        self.0
    }

    /// `self mod modulus` over the full 256-bit value, or `None` when
    /// `modulus` is zero.
    pub fn reduce(&self, modulus: u64) -> Option<u64> {
        (modulus != 0).then(|| (self.0 % U256::from(modulus)).to::<u64>())
    }
}

impl From<U256> for RandomValue {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for RandomValue {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for RandomValue {
    type Err = <U256 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str(s.trim()).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UINT256_MAX: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    #[test]
    fn reduce_matches_integer_modulo() {
        assert_eq!(RandomValue::from(777u64).reduce(3), Some(0));
        assert_eq!(RandomValue::from(778u64).reduce(3), Some(1));
        assert_eq!(RandomValue::from(u64::MAX).reduce(1_000_003), Some(u64::MAX % 1_000_003));
    }

    #[test]
    fn reduce_by_zero_is_none() {
        assert_eq!(RandomValue::from(5u64).reduce(0), None);
    }

    #[test]
    fn reduce_uses_high_bytes() {
        // 2^128 mod 7 == 4 (2^3 = 1 mod 7, 128 = 3 * 42 + 2).
        let mut bytes = [0u8; 32];
        bytes[15] = 1;
        assert_eq!(RandomValue::from_bytes(bytes).reduce(7), Some(4));
    }

    #[test]
    fn parses_decimal_and_hex() {
        let dec: RandomValue = "777".parse().unwrap();
        let hex: RandomValue = "0x309".parse().unwrap();
        assert_eq!(dec, hex);
        assert_eq!(dec, RandomValue::from(777u64));
    }

    #[test]
    fn parses_full_width_decimal_word() {
        let max: RandomValue = UINT256_MAX.parse().unwrap();
        assert_eq!(max, RandomValue::from(U256::MAX));
        assert_eq!(max, RandomValue::from_bytes([0xff; 32]));
        // 2^256 - 1 is divisible by 3, 5 and 17.
        assert_eq!(max.reduce(3), Some(0));
        assert_eq!(max.reduce(1 << 32), Some(u64::from(u32::MAX)));

        let from_json: RandomValue = serde_json::from_str(&format!("\"{UINT256_MAX}\"")).unwrap();
        assert_eq!(from_json, max);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("0xzz".parse::<RandomValue>().is_err());
        assert!("-1".parse::<RandomValue>().is_err());
        assert!(format!("0x1{}", "0".repeat(64)).parse::<RandomValue>().is_err());
        assert!(format!("{UINT256_MAX}0").parse::<RandomValue>().is_err());
    }

    #[test]
    fn display_is_hex() {
        let shown = RandomValue::from(255u64).to_string();
        assert_eq!(shown, "0xff");
        assert_eq!(shown.parse::<RandomValue>().unwrap(), RandomValue::from(255u64));
    }

    #[test]
    fn deserializes_decimal_and_hex_strings() {
        let from_dec: RandomValue = serde_json::from_str("\"777\"").unwrap();
        let from_hex: RandomValue = serde_json::from_str("\"0x309\"").unwrap();
        assert_eq!(from_dec, from_hex);
        assert_eq!(serde_json::to_value(from_dec).unwrap(), serde_json::json!("0x309"));
    }

    #[test]
    fn predefined_roles_compare_with_parsed_names() {
        assert_eq!(Role::from("MINTER"), Role::MINTER);
        assert_ne!(Role::from("minter"), Role::MINTER);
    }
}
