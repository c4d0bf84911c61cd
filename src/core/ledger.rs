//! Ledger Store
//!
//! Per-guild balances and ownership. Every mutating call writes the whole
//! document back to disk; write failures are logged and the in-memory
//! state stays authoritative.

use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::EconomyConfig;
use crate::core::ownership::OwnershipGraph;
use crate::core::types::*;
use crate::data::json_file;

pub type SharedLedger = Arc<Mutex<LedgerStore>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("not enough cash")]
    InsufficientCash,
    #[error("not enough money in the bank")]
    InsufficientBank,
    #[error("a user cannot own themselves")]
    SelfOwnership,
    #[error("bots cannot take part in ownership")]
    BotParticipant,
    #[error("ownership would create a cycle")]
    Cycle,
    #[error("unknown guild")]
    UnknownGuild,
}

pub struct LedgerStore {
    data: LedgerData,
    path: PathBuf,
    starting_balance: Decimal,
    default_job: String,
}

impl LedgerStore {
    /// Load the ledger file (or start empty) and write it back immediately
    pub fn open(path: impl AsRef<Path>, economy: &EconomyConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        let data: LedgerData = json_file::load_or_default(&path);
        let users: usize = data.guilds.values().map(|g| g.users.len()).sum();
        info!("[LEDGER] Loaded {} guild(s), {} user(s) from {}", data.guilds.len(), users, path.display());

        let store = Self {
            data,
            path,
            starting_balance: economy.starting_balance,
            default_job: economy.default_job.clone(),
        };
        store.persist();
        store
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// Write the full document, propagating the error
    pub fn flush(&self) -> anyhow::Result<()> {
        json_file::save(&self.path, &self.data)
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            error!("[LEDGER] Failed to save {}: {:#}", self.path.display(), e);
        }
    }

    pub fn guild(&self, guild_id: &str) -> Option<&GuildData> {
        self.data.guilds.get(guild_id)
    }

    pub fn user(&self, guild_id: &str, user_id: &str) -> Option<&UserRecord> {
        self.guild(guild_id).and_then(|g| g.users.get(user_id))
    }

    /// Fetch a user, creating the account on first reference.
    ///
    /// A known username replaces the stored one so display names stay fresh.
    pub fn get_or_create(&mut self, guild_id: &str, user_id: &str, username: Option<&str>) -> &UserRecord {
        let mut changed = false;
        let guild = self.data.guilds.entry(guild_id.to_string()).or_default();

        if !guild.users.contains_key(user_id) {
            let user = UserRecord::new(user_id, username, self.starting_balance, &self.default_job);
            guild.users.insert(user_id.to_string(), user);
            info!("[LEDGER] New account {} in guild {}", user_id, guild_id);
            changed = true;
        } else if let (Some(name), Some(user)) = (username, guild.users.get_mut(user_id)) {
            if user.username != name {
                user.username = name.to_string();
                changed = true;
            }
        }

        if changed {
            self.persist();
        }
        &self.data.guilds[guild_id].users[user_id]
    }

    fn user_mut(&mut self, guild_id: &str, user_id: &str) -> Result<&mut UserRecord, LedgerError> {
        self.get_or_create(guild_id, user_id, None);
        self.data
            .guilds
            .get_mut(guild_id)
            .and_then(|g| g.users.get_mut(user_id))
            .ok_or(LedgerError::UnknownGuild)
    }

    /// Move `amount` from cash to bank
    pub fn deposit(&mut self, guild_id: &str, user_id: &str, amount: Decimal) -> Result<TransactionRecord, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        let user = self.user_mut(guild_id, user_id)?;
        if user.balance < amount {
            return Err(LedgerError::InsufficientCash);
        }

        user.balance -= amount;
        user.bank += amount;
        let tx = TransactionRecord::after(TransactionKind::Deposit, amount, user);
        user.last_transaction = Some(tx.clone());

        self.persist();
        Ok(tx)
    }

    /// Move `amount` from bank to cash
    pub fn withdraw(&mut self, guild_id: &str, user_id: &str, amount: Decimal) -> Result<TransactionRecord, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        let user = self.user_mut(guild_id, user_id)?;
        if user.bank < amount {
            return Err(LedgerError::InsufficientBank);
        }

        user.bank -= amount;
        user.balance += amount;
        let tx = TransactionRecord::after(TransactionKind::Withdraw, amount, user);
        user.last_transaction = Some(tx.clone());

        self.persist();
        Ok(tx)
    }

    /// Current owner of `target`, if any
    pub fn owner_of(&self, guild_id: &str, target_id: &str) -> Option<&UserId> {
        self.guild(guild_id)
            .and_then(|g| g.ownerships.get(target_id))
            .map(|edge| &edge.owner_id)
    }

    /// Check an ownership edge against the forest invariant without mutating
    pub fn check_ownership(&self, guild_id: &str, owner_id: &str, target_id: &str) -> Result<(), LedgerError> {
        if owner_id == target_id {
            return Err(LedgerError::SelfOwnership);
        }
        let Some(guild) = self.guild(guild_id) else {
            return Ok(());
        };
        let is_bot = |id: &str| guild.users.get(id).map(|u| u.bot).unwrap_or(false);
        if is_bot(owner_id) || is_bot(target_id) {
            return Err(LedgerError::BotParticipant);
        }
        if OwnershipGraph::from_guild(guild).would_create_cycle(owner_id, target_id) {
            return Err(LedgerError::Cycle);
        }
        Ok(())
    }

    /// Make `owner` the owner of `target` for `price`
    pub fn transfer_ownership(
        &mut self,
        guild_id: &str,
        owner_id: &str,
        target_id: &str,
        price: Decimal,
        role: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        self.transfer_bundle(guild_id, owner_id, &[target_id.to_string()], price, role)
    }

    /// Transfer every id in `targets` to `owner` for one `price`.
    ///
    /// A paired bundle is bought as a unit: the owner is debited once, and
    /// all edges are validated before anything changes, so either every
    /// target moves or none does.
    pub fn transfer_bundle(
        &mut self,
        guild_id: &str,
        owner_id: &str,
        targets: &[UserId],
        price: Decimal,
        role: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        if price < Decimal::ZERO || targets.is_empty() {
            return Err(LedgerError::InvalidAmount);
        }

        self.get_or_create(guild_id, owner_id, None);
        for target in targets {
            self.get_or_create(guild_id, target, None);
            self.check_ownership(guild_id, owner_id, target)?;
        }

        let guild = self.data.guilds.get_mut(guild_id).ok_or(LedgerError::UnknownGuild)?;
        let owner = guild.users.get(owner_id).ok_or(LedgerError::UnknownGuild)?;
        if owner.balance < price {
            return Err(LedgerError::InsufficientCash);
        }

        let now = now_millis();
        for target in targets {
            for user in guild.users.values_mut() {
                user.owned.retain(|o| o != target);
            }
            if let Some(t) = guild.users.get_mut(target) {
                t.role = Some(role.to_string());
            }
            guild.ownerships.insert(
                target.clone(),
                OwnershipEdge {
                    owner_id: owner_id.to_string(),
                    role: role.to_string(),
                    date: now,
                },
            );
            guild.ownership_history.push(OwnershipHistoryEntry {
                owner_id: owner_id.to_string(),
                target_id: target.clone(),
                role: role.to_string(),
                date: now,
                action: "setOwner".to_string(),
            });
            if let Some(owner) = guild.users.get_mut(owner_id) {
                owner.owned.push(target.clone());
                owner.purchases.push(Purchase {
                    target_id: target.clone(),
                    role: role.to_string(),
                    price,
                    date: now,
                });
            }
        }

        let owner = guild.users.get_mut(owner_id).ok_or(LedgerError::UnknownGuild)?;
        owner.balance -= price;
        let mut tx = TransactionRecord::after(TransactionKind::Purchase, price, owner);
        tx.role = Some(role.to_string());
        tx.target_id = Some(targets[0].clone());
        owner.last_transaction = Some(tx.clone());

        info!("[LEDGER] {} now owns {} as '{}' for {}", owner_id, targets.join(" & "), role, price);
        self.persist();
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const G: &str = "guild";

    fn temp_store() -> (LedgerStore, PathBuf) {
        let path = std::env::temp_dir().join(format!("kaufbot-ledger-{}.json", uuid::Uuid::new_v4()));
        (LedgerStore::open(&path, &EconomyConfig::default()), path)
    }

    fn cash(store: &LedgerStore, id: &str) -> Decimal {
        store.user(G, id).map(|u| u.balance).unwrap()
    }

    #[test]
    fn test_new_user_defaults() {
        let (mut store, path) = temp_store();
        let user = store.get_or_create(G, "1", Some("anna")).clone();

        assert_eq!(user.balance, dec!(10000));
        assert_eq!(user.bank, Decimal::ZERO);
        assert_eq!(user.job, "Arbeitslos");
        assert_eq!(user.username, "anna");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_deposit_withdraw_conserve_total() {
        let (mut store, path) = temp_store();
        store.get_or_create(G, "1", None);

        for amount in [dec!(1), dec!(250.5), dec!(9000)] {
            let before = store.user(G, "1").unwrap().net_worth();
            store.deposit(G, "1", amount).unwrap();
            assert_eq!(store.user(G, "1").unwrap().net_worth(), before);
            store.withdraw(G, "1", amount).unwrap();
            assert_eq!(store.user(G, "1").unwrap().net_worth(), before);
        }
        assert_eq!(cash(&store, "1"), dec!(10000));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_deposit_more_than_cash_fails_unchanged() {
        let (mut store, path) = temp_store();
        let before = store.get_or_create(G, "1", None).clone();

        assert_eq!(store.deposit(G, "1", dec!(10001)), Err(LedgerError::InsufficientCash));
        assert_eq!(store.user(G, "1").unwrap(), &before);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_withdraw_more_than_bank_fails_unchanged() {
        let (mut store, path) = temp_store();
        store.get_or_create(G, "1", None);
        store.deposit(G, "1", dec!(100)).unwrap();
        let before = store.user(G, "1").unwrap().clone();

        assert_eq!(store.withdraw(G, "1", dec!(100.01)), Err(LedgerError::InsufficientBank));
        assert_eq!(store.user(G, "1").unwrap(), &before);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let (mut store, path) = temp_store();
        assert_eq!(store.deposit(G, "1", dec!(0)), Err(LedgerError::InvalidAmount));
        assert_eq!(store.withdraw(G, "1", dec!(-5)), Err(LedgerError::InvalidAmount));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_transfer_debits_and_links() {
        let (mut store, path) = temp_store();
        let tx = store.transfer_ownership(G, "a", "b", dec!(110), "Haustier").unwrap();

        assert_eq!(tx.kind, TransactionKind::Purchase);
        assert_eq!(cash(&store, "a"), dec!(9890));
        assert_eq!(store.owner_of(G, "b"), Some(&"a".to_string()));
        assert_eq!(store.user(G, "a").unwrap().owned, vec!["b".to_string()]);
        assert_eq!(store.user(G, "b").unwrap().role.as_deref(), Some("Haustier"));
        assert_eq!(store.guild(G).unwrap().ownership_history.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_transfer_moves_target_from_previous_owner() {
        let (mut store, path) = temp_store();
        store.transfer_ownership(G, "a", "c", dec!(10), "x").unwrap();
        store.transfer_ownership(G, "b", "c", dec!(20), "y").unwrap();

        assert!(store.user(G, "a").unwrap().owned.is_empty());
        assert_eq!(store.user(G, "b").unwrap().owned, vec!["c".to_string()]);
        assert_eq!(store.owner_of(G, "c"), Some(&"b".to_string()));
        let owners = store
            .guild(G)
            .unwrap()
            .users
            .values()
            .filter(|u| u.owned.contains(&"c".to_string()))
            .count();
        assert_eq!(owners, 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_cycle_rejected_state_unchanged() {
        let (mut store, path) = temp_store();
        store.transfer_ownership(G, "a", "b", dec!(10), "x").unwrap();
        store.transfer_ownership(G, "b", "c", dec!(10), "x").unwrap();
        let before = store.guild(G).unwrap().clone();

        assert_eq!(store.transfer_ownership(G, "b", "a", dec!(10), "x"), Err(LedgerError::Cycle));
        assert_eq!(store.transfer_ownership(G, "c", "a", dec!(10), "x"), Err(LedgerError::Cycle));

        let after = store.guild(G).unwrap();
        assert_eq!(after.users, before.users);
        assert_eq!(after.ownerships, before.ownerships);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_self_ownership_rejected() {
        let (mut store, path) = temp_store();
        assert_eq!(store.transfer_ownership(G, "a", "a", dec!(1), "x"), Err(LedgerError::SelfOwnership));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_insufficient_cash_rejected() {
        let (mut store, path) = temp_store();
        assert_eq!(store.transfer_ownership(G, "a", "b", dec!(10001), "x"), Err(LedgerError::InsufficientCash));
        assert!(store.owner_of(G, "b").is_none());
        assert_eq!(cash(&store, "a"), dec!(10000));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_bundle_is_all_or_nothing() {
        let (mut store, path) = temp_store();
        // p2 owns a, so a may not buy p2
        store.transfer_ownership(G, "p2", "a", dec!(1), "x").unwrap();
        let before = cash(&store, "a");

        let result = store.transfer_bundle(G, "a", &["p1".to_string(), "p2".to_string()], dec!(100), "Duo");
        assert_eq!(result, Err(LedgerError::Cycle));
        assert!(store.owner_of(G, "p1").is_none());
        assert_eq!(cash(&store, "a"), before);

        store.transfer_bundle(G, "b", &["p1".to_string(), "p2".to_string()], dec!(100), "Duo").unwrap();
        assert_eq!(cash(&store, "b"), dec!(9900));
        assert_eq!(store.owner_of(G, "p1"), Some(&"b".to_string()));
        assert_eq!(store.owner_of(G, "p2"), Some(&"b".to_string()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_bundle_is_charged_once() {
        let (mut store, path) = temp_store();
        let bundle = ["p1".to_string(), "p2".to_string()];
        assert_eq!(store.transfer_bundle(G, "a", &bundle, dec!(10001), "Duo"), Err(LedgerError::InsufficientCash));
        assert!(store.owner_of(G, "p1").is_none());

        let tx = store.transfer_bundle(G, "a", &bundle, dec!(6000), "Duo").unwrap();
        assert_eq!(tx.amount, dec!(6000));
        assert_eq!(cash(&store, "a"), dec!(4000));
        assert_eq!(store.owner_of(G, "p2"), Some(&"a".to_string()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_mutations_write_through() {
        let (mut store, path) = temp_store();
        store.deposit(G, "1", dec!(500)).unwrap();

        let reopened = LedgerStore::open(&path, &EconomyConfig::default());
        let user = reopened.user(G, "1").unwrap();
        assert_eq!(user.bank, dec!(500));
        assert_eq!(user.balance, dec!(9500));
        let _ = std::fs::remove_file(path);
    }
}
