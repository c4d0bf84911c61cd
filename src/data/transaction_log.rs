//! Transaction Log
//!
//! Last transaction per (guild, user), kept in its own file:
//! `{ "guilds": { guildId: { userId: record } } }`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::core::types::{GuildId, TransactionRecord, UserId};
use crate::data::json_file;

pub type SharedTransactionLog = Arc<Mutex<TransactionLog>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionLogData {
    #[serde(default)]
    pub guilds: BTreeMap<GuildId, BTreeMap<UserId, TransactionRecord>>,
}

pub struct TransactionLog {
    data: TransactionLogData,
    path: PathBuf,
}

impl TransactionLog {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data: TransactionLogData = json_file::load_or_default(&path);
        info!("[TXLOG] Loaded transaction log for {} guild(s)", data.guilds.len());
        Self { data, path }
    }

    pub fn into_shared(self) -> SharedTransactionLog {
        Arc::new(Mutex::new(self))
    }

    /// Overwrite the user's slot and write through
    pub fn record(&mut self, guild_id: &str, user_id: &str, record: TransactionRecord) {
        self.data
            .guilds
            .entry(guild_id.to_string())
            .or_default()
            .insert(user_id.to_string(), record);

        if let Err(e) = self.flush() {
            error!("[TXLOG] Failed to save {}: {:#}", self.path.display(), e);
        }
    }

    pub fn last(&self, guild_id: &str, user_id: &str) -> Option<&TransactionRecord> {
        self.data.guilds.get(guild_id).and_then(|g| g.get(user_id))
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        json_file::save(&self.path, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TransactionKind;
    use rust_decimal_macros::dec;

    fn record(kind: TransactionKind, amount: rust_decimal::Decimal) -> TransactionRecord {
        TransactionRecord {
            kind,
            amount,
            balance: dec!(0),
            bank: dec!(0),
            date: 1,
            role: None,
            target_id: None,
        }
    }

    #[test]
    fn test_record_overwrites_slot() {
        let path = std::env::temp_dir().join(format!("kaufbot-txlog-{}.json", uuid::Uuid::new_v4()));
        let mut log = TransactionLog::open(&path);

        assert!(log.last("g", "u").is_none());
        log.record("g", "u", record(TransactionKind::Deposit, dec!(10)));
        log.record("g", "u", record(TransactionKind::Withdraw, dec!(4)));

        let last = log.last("g", "u").unwrap();
        assert_eq!(last.kind, TransactionKind::Withdraw);
        assert_eq!(last.amount, dec!(4));
        assert!(log.last("other", "u").is_none());

        let reopened = TransactionLog::open(&path);
        assert_eq!(reopened.last("g", "u").unwrap().kind, TransactionKind::Withdraw);
        let _ = std::fs::remove_file(path);
    }
}
