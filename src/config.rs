//! Configuration loader
//!
//! Only `[system]` and `[discord]` are required; every economy and
//! auction constant has a default.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub auction: AuctionConfig,
    /// user id -> display alias
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Users bought together as one bundle
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Planned exit for the supervisor to restart; 0 disables
    #[serde(default = "default_restart_after_hours")]
    pub restart_after_hours: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_restart_after_hours() -> u64 {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub application_id: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_true")]
    pub register_commands: bool,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    #[serde(default = "default_transaction_log_path")]
    pub transaction_log_path: String,
    #[serde(default = "default_ledger_autosave")]
    pub ledger_autosave_secs: u64,
    #[serde(default = "default_transaction_log_autosave")]
    pub transaction_log_autosave_secs: u64,
}

fn default_ledger_path() -> String {
    "database.json".to_string()
}

fn default_transaction_log_path() -> String {
    "transactionLog.json".to_string()
}

fn default_ledger_autosave() -> u64 {
    300
}

fn default_transaction_log_autosave() -> u64 {
    360
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            transaction_log_path: default_transaction_log_path(),
            ledger_autosave_secs: default_ledger_autosave(),
            transaction_log_autosave_secs: default_transaction_log_autosave(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EconomyConfig {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    #[serde(default = "default_job")]
    pub default_job: String,
}

fn default_starting_balance() -> Decimal {
    dec!(10000)
}

fn default_job() -> String {
    "Arbeitslos".to_string()
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            default_job: default_job(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AuctionConfig {
    #[serde(default = "default_bid_increment")]
    pub bid_increment: Decimal,
    /// Stages 1-3
    #[serde(default = "default_early_stage_secs")]
    pub early_stage_secs: u32,
    /// Stage 4
    #[serde(default = "default_final_stage_secs")]
    pub final_stage_secs: u32,
}

fn default_bid_increment() -> Decimal {
    dec!(10)
}

fn default_early_stage_secs() -> u32 {
    30
}

fn default_final_stage_secs() -> u32 {
    15
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            bid_increment: default_bid_increment(),
            early_stage_secs: default_early_stage_secs(),
            final_stage_secs: default_final_stage_secs(),
        }
    }
}

impl AuctionConfig {
    pub fn stage_duration(&self, stage: u8) -> u32 {
        if stage < 4 {
            self.early_stage_secs
        } else {
            self.final_stage_secs
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PairConfig {
    pub a: String,
    pub b: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}
