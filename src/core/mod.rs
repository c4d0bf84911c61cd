//! Core Module
//!
//! Economy domain: account records, the ledger store, the ownership
//! forest and the purchase-auction state machine.

pub mod types;
pub mod ownership;
pub mod ledger;
pub mod auction;

pub use auction::{Auction, AuctionError, Phase, Tick};
pub use ledger::{LedgerError, LedgerStore, SharedLedger};
pub use ownership::OwnershipGraph;
pub use types::*;
