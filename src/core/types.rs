//! Core Types
//!
//! Records persisted in the ledger and transaction-log files.
//! Field names follow the on-disk camelCase layout.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Platform user id (snowflake kept as a string)
pub type UserId = String;

/// Platform guild id
pub type GuildId = String;

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whole ledger document: `{ "guilds": { ... } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerData {
    #[serde(default)]
    pub guilds: BTreeMap<GuildId, GuildData>,
}

/// Per-guild economy state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildData {
    #[serde(default)]
    pub users: BTreeMap<UserId, UserRecord>,
    #[serde(default)]
    pub ownerships: BTreeMap<UserId, OwnershipEdge>,
    #[serde(default)]
    pub ownership_history: Vec<OwnershipHistoryEntry>,
}

/// Whole amounts are written as JSON integers, so untouched balances keep
/// the `10000` form; fractional ones fall back to floats.
fn whole_as_integer<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    match value.fract().is_zero().then(|| value.to_i64()).flatten() {
        Some(whole) => serializer.serialize_i64(whole),
        None => Serialize::serialize(value, serializer),
    }
}

/// A user's account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    /// Cash on hand
    #[serde(serialize_with = "whole_as_integer")]
    pub balance: Decimal,
    #[serde(serialize_with = "whole_as_integer")]
    pub bank: Decimal,
    pub job: String,
    #[serde(default)]
    pub last_transaction: Option<TransactionRecord>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub owned: Vec<UserId>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl UserRecord {
    pub fn new(id: &str, username: Option<&str>, balance: Decimal, job: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.unwrap_or("Unbekannt").to_string(),
            balance,
            bank: Decimal::ZERO,
            job: job.to_string(),
            last_transaction: None,
            purchases: Vec::new(),
            owned: Vec::new(),
            role: None,
            bot: false,
        }
    }

    /// Cash plus bank
    pub fn net_worth(&self) -> Decimal {
        self.balance + self.bank
    }
}

/// "target is owned by owner_id"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipEdge {
    pub owner_id: UserId,
    pub role: String,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipHistoryEntry {
    pub owner_id: UserId,
    pub target_id: UserId,
    pub role: String,
    pub date: i64,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub target_id: UserId,
    pub role: String,
    #[serde(serialize_with = "whole_as_integer")]
    pub price: Decimal,
    pub date: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Balance,
    Deposit,
    Withdraw,
    Purchase,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Balance => "balance",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Purchase => "purchase",
        };
        write!(f, "{}", s)
    }
}

/// A single transaction with the balances it left behind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(serialize_with = "whole_as_integer")]
    pub amount: Decimal,
    #[serde(default, serialize_with = "whole_as_integer")]
    pub balance: Decimal,
    #[serde(default, serialize_with = "whole_as_integer")]
    pub bank: Decimal,
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<UserId>,
}

impl TransactionRecord {
    /// Record stamped with the user's balances after the operation
    pub fn after(kind: TransactionKind, amount: Decimal, user: &UserRecord) -> Self {
        Self {
            kind,
            amount,
            balance: user.balance,
            bank: user.bank,
            date: now_millis(),
            role: None,
            target_id: None,
        }
    }
}
