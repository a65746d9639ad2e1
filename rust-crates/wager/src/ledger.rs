//! Types and traits for the two external collaborators: the ledger read path
//! and the wallet that signs and executes transactions.

use crate::{
    error::{
        Error,
        Result,
    },
    transaction::TransactionDescription,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    fmt,
    str::FromStr,
};

const ADDRESS_HEX_LEN: usize = 64;

/// A normalized `0x`-prefixed, 32-byte, lowercase hex address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

/// Objects share the address format.
pub type ObjectId = Address;

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234…cdef`, for narrow panels.
    pub fn short(&self) -> String {
        let hex = &self.0[2..];
        format!("0x{}…{}", &hex[..4], &hex[hex.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > ADDRESS_HEX_LEN {
            return Err(Error::InvalidAddress(raw.to_string()));
        }
        let padded = format!("{digits:0>ADDRESS_HEX_LEN$}").to_ascii_lowercase();
        hex::decode(&padded).map_err(|_| Error::InvalidAddress(raw.to_string()))?;
        Ok(Self(format!("0x{padded}")))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One addressable fungible-token object and its balance in base units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenObject {
    pub id: ObjectId,
    pub balance: u64,
}

impl TokenObject {
    pub fn new(id: ObjectId, balance: u64) -> Self {
        Self { id, balance }
    }
}

pub type ObjectFields = serde_json::Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct OwnedObject {
    pub id: ObjectId,
    pub type_name: String,
    pub fields: ObjectFields,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEvent {
    pub event_type: String,
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failure(String),
}

/// What the wallet hands back once the ledger has executed a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionResult {
    pub digest: String,
    pub status: ExecutionStatus,
    pub events: Vec<LedgerEvent>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

pub trait LedgerReader: Send + Sync {
    /// Total balance of `coin_type` owned by `owner`, in base units.
    fn get_balance(
        &self,
        owner: &Address,
        coin_type: &str,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Every token object of `coin_type` owned by `owner`.
    fn get_coins(
        &self,
        owner: &Address,
        coin_type: &str,
    ) -> impl Future<Output = Result<Vec<TokenObject>>> + Send;

    fn get_object_fields(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<ObjectFields>> + Send;

    /// Objects owned by `owner` whose type is exactly `struct_type`.
    fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> impl Future<Output = Result<Vec<OwnedObject>>> + Send;
}

pub trait SigningProvider: Send + Sync {
    /// Signs `transaction` as `sender`, submits it and waits for execution.
    ///
    /// Implementations report a refused signature as
    /// [`Error::SigningDeclined`] and any transport or execution problem as
    /// [`Error::SubmissionFailed`].
    fn sign_and_execute(
        &self,
        sender: &Address,
        transaction: &TransactionDescription,
    ) -> impl Future<Output = Result<ExecutionResult>> + Send;
}

/// Reads an unsigned integer that the ledger may render as a JSON number or
/// as a decimal string (64-bit values are usually strings).
pub fn read_u64(value: &Value, field: &str) -> Result<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| Error::schema(field, format!("{number} is not a u64"))),
        Value::String(text) => text
            .parse::<u64>()
            .map_err(|_| Error::schema(field, format!("{text:?} is not a u64"))),
        Value::Object(inner) => match inner.get("value") {
            Some(nested) => read_u64(nested, field),
            None => Err(Error::schema(field, "object without `value`")),
        },
        other => Err(Error::schema(field, format!("unexpected {other}"))),
    }
}

pub fn read_u64_field(fields: &ObjectFields, field: &str) -> Result<u64> {
    let value = fields
        .get(field)
        .ok_or_else(|| Error::schema(field, "missing"))?;
    read_u64(value, field)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use serde_json::json;

    #[test]
    fn from_str__pads_short_addresses() {
        // when
        let address: Address = "0x8".parse().unwrap();

        // then
        assert_eq!(
            address.as_str(),
            "0x0000000000000000000000000000000000000000000000000000000000000008"
        );
    }

    #[test]
    fn from_str__normalizes_case_and_prefix() {
        let upper: Address = "0XABCDEF".parse().unwrap();
        let lower: Address = "abcdef".parse().unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn from_str__rejects_non_hex_and_oversized_input() {
        assert!(matches!(
            "0xnothex".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
        let too_long = format!("0x{}", "1".repeat(65));
        assert!(too_long.parse::<Address>().is_err());
        assert!("0x".parse::<Address>().is_err());
    }

    #[test]
    fn address__round_trips_through_serde_as_string() {
        let address: Address = "0x2a".parse().unwrap();
        let encoded = serde_json::to_string(&address).unwrap();
        let decoded: Address = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, address);
        assert!(serde_json::from_str::<Address>("\"0xzz\"").is_err());
    }

    #[test]
    fn read_u64__accepts_numbers_strings_and_wrapped_values() {
        assert_eq!(read_u64(&json!(7), "a"), Ok(7));
        assert_eq!(read_u64(&json!("18446744073709551615"), "a"), Ok(u64::MAX));
        assert_eq!(read_u64(&json!({ "value": "12" }), "a"), Ok(12));
        assert!(matches!(
            read_u64(&json!(-1), "a"),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            read_u64(&json!(null), "a"),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
