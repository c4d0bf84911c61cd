//! Auction State Machine
//!
//! One purchase auction: a countdown through four stages that restarts at
//! stage 1 on every accepted bid. Time only moves through `tick()`, one call
//! per elapsed second, so the machine itself owns no timer.
//!
//! ```text
//! Stage1 -> Stage2 -> Stage3 -> Stage4 -> Settling -> Settled | Cancelled
//!   ^________ bid ________|________|________|
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuctionConfig;
use crate::core::ledger::{LedgerError, LedgerStore};
use crate::core::types::{GuildId, TransactionRecord, UserId};

pub const FINAL_STAGE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running { stage: u8, remaining: u32 },
    Settling,
    Settled,
    Cancelled,
}

/// What a one-second tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Counting { stage: u8, remaining: u32 },
    StageAdvanced { stage: u8, remaining: u32 },
    /// Stage 4 ran out; settlement must follow
    Settle,
    /// Auction no longer running
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("bid requires at least {required}")]
    InsufficientFunds { required: Decimal },
    /// Bidder would break the forest invariant if they won
    #[error("bidder not eligible: {0}")]
    Ineligible(LedgerError),
    #[error("only the initiator may cancel")]
    NotInitiator,
    #[error("auction is closed")]
    Closed,
    #[error("settlement failed: {0}")]
    Settlement(#[from] LedgerError),
}

#[derive(Debug, Clone)]
pub struct Auction {
    id: Uuid,
    guild_id: GuildId,
    initiator: UserId,
    target: UserId,
    paired: Option<UserId>,
    role: String,
    start_price: Decimal,
    price: Decimal,
    leader: UserId,
    phase: Phase,
    settings: AuctionConfig,
}

impl Auction {
    /// Start at stage 1 with the initiator leading at `start_price`
    pub fn new(
        guild_id: &str,
        initiator: &str,
        target: &str,
        paired: Option<UserId>,
        role: &str,
        start_price: Decimal,
        settings: AuctionConfig,
    ) -> Self {
        let remaining = settings.stage_duration(1);
        Self {
            id: Uuid::new_v4(),
            guild_id: guild_id.to_string(),
            initiator: initiator.to_string(),
            target: target.to_string(),
            paired,
            role: role.to_string(),
            start_price,
            price: start_price,
            leader: initiator.to_string(),
            phase: Phase::Running { stage: 1, remaining },
            settings,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    pub fn initiator(&self) -> &str {
        &self.initiator
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn paired(&self) -> Option<&str> {
        self.paired.as_deref()
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn start_price(&self) -> Decimal {
        self.start_price
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn leader(&self) -> &str {
        &self.leader
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stage_duration(&self, stage: u8) -> u32 {
        self.settings.stage_duration(stage)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Price the next bid has to reach
    pub fn required_bid(&self) -> Decimal {
        self.price + self.settings.bid_increment
    }

    /// Every id changing hands on settlement
    pub fn targets(&self) -> Vec<UserId> {
        let mut ids = vec![self.target.clone()];
        if let Some(p) = &self.paired {
            ids.push(p.clone());
        }
        ids
    }

    /// Raise the price by one increment and hand the lead to `bidder`.
    ///
    /// The current leader may outbid themselves. Accepted bids restart the
    /// countdown at stage 1. Returns the new price.
    pub fn bid(&mut self, bidder: &str, available_cash: Decimal) -> Result<Decimal, AuctionError> {
        if !self.is_running() {
            return Err(AuctionError::Closed);
        }
        let required = self.required_bid();
        if available_cash < required {
            return Err(AuctionError::InsufficientFunds { required });
        }

        self.price = required;
        self.leader = bidder.to_string();
        self.phase = Phase::Running {
            stage: 1,
            remaining: self.stage_duration(1),
        };
        Ok(required)
    }

    /// Only the initiator may cancel, and only while the countdown runs
    pub fn cancel(&mut self, requester: &str) -> Result<(), AuctionError> {
        if !self.is_running() {
            return Err(AuctionError::Closed);
        }
        if requester != self.initiator {
            return Err(AuctionError::NotInitiator);
        }
        self.phase = Phase::Cancelled;
        Ok(())
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> Tick {
        let Phase::Running { stage, remaining } = self.phase else {
            return Tick::Idle;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.phase = Phase::Running { stage, remaining };
            return Tick::Counting { stage, remaining };
        }

        if stage < FINAL_STAGE {
            let stage = stage + 1;
            let remaining = self.stage_duration(stage);
            self.phase = Phase::Running { stage, remaining };
            Tick::StageAdvanced { stage, remaining }
        } else {
            self.phase = Phase::Settling;
            Tick::Settle
        }
    }

    /// Transfer the target (and its paired id) to the leader.
    ///
    /// Balances may have moved since the last bid, so the ledger re-checks
    /// cash and the forest invariant. On failure nothing is mutated and the
    /// auction ends cancelled.
    pub fn settle(&mut self, ledger: &mut LedgerStore) -> Result<TransactionRecord, AuctionError> {
        if self.phase != Phase::Settling {
            return Err(AuctionError::Closed);
        }

        match ledger.transfer_bundle(&self.guild_id, &self.leader, &self.targets(), self.price, &self.role) {
            Ok(tx) => {
                self.phase = Phase::Settled;
                Ok(tx)
            }
            Err(e) => {
                self.phase = Phase::Cancelled;
                Err(AuctionError::Settlement(e))
            }
        }
    }
}
