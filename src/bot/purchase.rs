//! Purchase Auctions
//!
//! `/kaufen` starts one runner task per auction. The task owns the
//! `Auction` state machine and its single one-second interval; button
//! presses reach it as events over an mpsc channel and get their answer
//! back on a oneshot. An accepted bid resets the interval, so there is
//! never more than one pending tick per auction.

use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use super::aliases::Aliases;
use super::render::{self, format_amount, StageView, GOLD, GREEN, RED};
use super::{ephemeral, username, Bot};
use crate::comms::interaction::{Interaction, InteractionResponse, User};
use crate::comms::message::{Embed, Reply};
use crate::comms::monitor::SharedMonitor;
use crate::comms::transport::SharedTransport;
use crate::core::auction::{Auction, AuctionError, Phase, Tick};
use crate::core::ledger::{LedgerError, SharedLedger};
use crate::core::types::UserId;
use crate::data::transaction_log::SharedTransactionLog;

const TICK: Duration = Duration::from_secs(1);
const ENDED: &str = "❌ Diese Auktion ist bereits beendet.";
const NOT_ENOUGH_MONEY: &str = "❌ Du hast nicht genug Geld!";
const SELF_PURCHASE: &str = "❌ Du kannst dich nicht selbst kaufen!";
const CYCLE: &str = "❌ Dieser Kauf würde einen Besitz-Kreislauf erzeugen.";

pub enum AuctionEvent {
    Bid {
        bidder: User,
        respond: oneshot::Sender<Result<Decimal, AuctionError>>,
    },
    Cancel {
        requester: UserId,
        respond: oneshot::Sender<Result<(), AuctionError>>,
    },
}

/// Sending side of a running auction
#[derive(Clone)]
pub struct AuctionHandle {
    id: Uuid,
    targets: Vec<UserId>,
    events: mpsc::Sender<AuctionEvent>,
}

impl AuctionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True if `user_id` is up for sale in this auction
    pub fn is_target(&self, user_id: &str) -> bool {
        self.targets.iter().any(|t| t == user_id)
    }

    pub async fn bid(&self, bidder: User) -> Result<Decimal, AuctionError> {
        let (respond, answer) = oneshot::channel();
        self.events
            .send(AuctionEvent::Bid { bidder, respond })
            .await
            .map_err(|_| AuctionError::Closed)?;
        answer.await.unwrap_or(Err(AuctionError::Closed))
    }

    pub async fn cancel(&self, requester: &str) -> Result<(), AuctionError> {
        let (respond, answer) = oneshot::channel();
        self.events
            .send(AuctionEvent::Cancel {
                requester: requester.to_string(),
                respond,
            })
            .await
            .map_err(|_| AuctionError::Closed)?;
        answer.await.unwrap_or(Err(AuctionError::Closed))
    }
}

/// Running auctions by id; a runner removes itself when it finishes
pub type AuctionRegistry = Arc<Mutex<HashMap<Uuid, AuctionHandle>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum AuctionOutcome {
    Settled { winner: UserId, price: Decimal },
    Cancelled,
    Failed(AuctionError),
}

/// Everything a runner needs besides the auction itself
pub struct AuctionContext {
    pub ledger: SharedLedger,
    pub transactions: SharedTransactionLog,
    pub transport: SharedTransport,
    pub monitor: SharedMonitor,
    pub aliases: Arc<Aliases>,
    pub registry: AuctionRegistry,
    /// Token of the interaction whose response shows the countdown
    pub token: String,
}

/// Register the auction and start its runner
pub async fn spawn_auction(auction: Auction, ctx: AuctionContext) -> (AuctionHandle, JoinHandle<AuctionOutcome>) {
    let (tx, rx) = mpsc::channel(32);
    let handle = AuctionHandle {
        id: auction.id(),
        targets: auction.targets(),
        events: tx,
    };
    ctx.registry.lock().await.insert(auction.id(), handle.clone());
    ctx.monitor.lock().await.record_auction_started();

    let task = tokio::spawn(run_auction(auction, ctx, rx));
    (handle, task)
}

async fn run_auction(mut auction: Auction, ctx: AuctionContext, mut events: mpsc::Receiver<AuctionEvent>) -> AuctionOutcome {
    let id = auction.id();
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                match auction.tick() {
                    Tick::Counting { .. } => render_stage(&auction, &ctx).await,
                    Tick::StageAdvanced { stage, .. } => {
                        info!("[AUCTION] {} entered stage {}", id, stage);
                        render_stage(&auction, &ctx).await;
                    }
                    Tick::Settle => break settle(&mut auction, &ctx).await,
                    Tick::Idle => break AuctionOutcome::Cancelled,
                }
            }
            Some(event) = events.recv() => {
                match event {
                    AuctionEvent::Bid { bidder, respond } => {
                        let eligible = {
                            let mut ledger = ctx.ledger.lock().await;
                            let cash = ledger.get_or_create(auction.guild_id(), &bidder.id, username(&bidder)).balance;
                            auction
                                .targets()
                                .iter()
                                .try_for_each(|t| ledger.check_ownership(auction.guild_id(), &bidder.id, t))
                                .map(|()| cash)
                                .map_err(AuctionError::Ineligible)
                        };
                        let result = eligible.and_then(|cash| auction.bid(&bidder.id, cash));
                        let accepted = result.is_ok();
                        if let Ok(price) = &result {
                            info!("[AUCTION] {} bid {} by {}", id, price, bidder.id);
                        }
                        let _ = respond.send(result);

                        if accepted {
                            ticker.reset();
                            render_stage(&auction, &ctx).await;
                        }
                    }
                    AuctionEvent::Cancel { requester, respond } => {
                        let result = auction.cancel(&requester);
                        let cancelled = result.is_ok();
                        let _ = respond.send(result);

                        if cancelled {
                            break cancel(&auction, &ctx).await;
                        }
                    }
                }
            }
        }
    };

    ctx.registry.lock().await.remove(&id);
    outcome
}

fn stage_reply(auction: &Auction, aliases: &Aliases) -> Option<Reply> {
    let Phase::Running { stage, remaining } = auction.phase() else {
        return None;
    };
    let leader = aliases.mention(auction.leader());
    let embed = render::stage_embed(&StageView {
        stage,
        remaining,
        duration: auction.stage_duration(stage),
        price: auction.price(),
        leader_mention: &leader,
        role: auction.role(),
    });
    Some(Reply::embed(embed).with_buttons(render::auction_buttons(&auction.id().to_string())))
}

/// Final state of the countdown message, without buttons
fn closed_reply(title: &str, text: &str, color: u32) -> Reply {
    Reply::embed(Embed::new(title).description(text).color(color))
}

async fn render_stage(auction: &Auction, ctx: &AuctionContext) {
    if let Some(reply) = stage_reply(auction, &ctx.aliases) {
        edit(ctx, &reply).await;
    }
}

async fn edit(ctx: &AuctionContext, reply: &Reply) {
    if let Err(e) = ctx.transport.edit_original(&ctx.token, reply).await {
        warn!("[AUCTION] Render failed: {:#}", e);
        ctx.monitor.lock().await.record_render_failure();
    }
}

async fn notify(ctx: &AuctionContext, reply: &Reply) {
    if let Err(e) = ctx.transport.follow_up(&ctx.token, reply).await {
        warn!("[AUCTION] Notice failed: {:#}", e);
        ctx.monitor.lock().await.record_render_failure();
    }
}

async fn settle(auction: &mut Auction, ctx: &AuctionContext) -> AuctionOutcome {
    let result = {
        let mut ledger = ctx.ledger.lock().await;
        auction.settle(&mut ledger)
    };
    let winner = ctx.aliases.mention(auction.leader());

    match result {
        Ok(tx) => {
            ctx.transactions.lock().await.record(auction.guild_id(), auction.leader(), tx);
            ctx.monitor.lock().await.record_auction_settled();
            info!(
                "[AUCTION] {} settled: {} bought {:?} as '{}' for {}",
                auction.id(),
                auction.leader(),
                auction.targets(),
                auction.role(),
                auction.price()
            );

            let targets: Vec<String> = auction.targets().iter().map(|t| format!("<@{}>", t)).collect();
            let text = format!(
                "🎉 **{}** hat **{}** als **{}** gekauft!\n💰 **Preis:** {} 💰",
                winner,
                targets.join(" & "),
                auction.role(),
                format_amount(auction.price())
            );
            notify(ctx, &Reply::embed(Embed::new("🏁 Auktion beendet!").description(&text).color(GREEN))).await;
            edit(ctx, &closed_reply("🏁 Auktion beendet!", &text, GREEN)).await;

            AuctionOutcome::Settled {
                winner: auction.leader().to_string(),
                price: auction.price(),
            }
        }
        Err(e) => {
            ctx.monitor.lock().await.record_auction_failed();
            warn!("[AUCTION] {} failed to settle: {}", auction.id(), e);

            let text = match &e {
                AuctionError::Settlement(LedgerError::Cycle) => {
                    "❌ Auktion ungültig. Dieser Kauf würde einen Besitz-Kreislauf erzeugen.".to_string()
                }
                AuctionError::Settlement(LedgerError::SelfOwnership) => {
                    format!("❌ Auktion ungültig. {} kann sich nicht selbst kaufen.", winner)
                }
                _ => format!("❌ Auktion ungültig. {} hat nicht genug Geld.", winner),
            };
            notify(ctx, &Reply::text(&text)).await;
            edit(ctx, &closed_reply("❌ Auktion ungültig", &text, RED)).await;

            AuctionOutcome::Failed(e)
        }
    }
}

async fn cancel(auction: &Auction, ctx: &AuctionContext) -> AuctionOutcome {
    ctx.monitor.lock().await.record_auction_cancelled();
    info!("[AUCTION] {} cancelled by {}", auction.id(), auction.initiator());

    let text = "❌ Auktion vom Verkäufer abgebrochen.";
    notify(ctx, &Reply::text(text)).await;
    edit(ctx, &closed_reply("❌ Auktion abgebrochen", text, RED)).await;
    AuctionOutcome::Cancelled
}

impl Bot {
    /// `/kaufen ziel preis als`
    pub(super) async fn start_purchase(
        &self,
        interaction: &Interaction,
        guild_id: &str,
        buyer: &User,
    ) -> Result<InteractionResponse> {
        let Some(target) = interaction.option_user("ziel") else {
            return Ok(ephemeral("❌ Zielbenutzer nicht gefunden."));
        };
        if target.bot {
            return Ok(ephemeral("❌ Bots können nicht gekauft werden."));
        }
        let paired = self.aliases.pair_of(&target.id).cloned();
        if target.id == buyer.id || paired.as_deref() == Some(buyer.id.as_str()) {
            return Ok(ephemeral(SELF_PURCHASE));
        }
        let price = Decimal::from(interaction.option_i64("preis").unwrap_or(0));
        if price <= Decimal::ZERO {
            return Ok(ephemeral("❌ Der Startpreis muss größer als 0 sein."));
        }
        let role = interaction.option_str("als").map(str::trim).unwrap_or_default();
        if role.is_empty() {
            return Ok(ephemeral("❌ Bitte gib eine Rolle an."));
        }

        let pair_name = {
            let mut ledger = self.ledger.lock().await;
            let cash = ledger.get_or_create(guild_id, &buyer.id, username(buyer)).balance;
            ledger.get_or_create(guild_id, &target.id, username(&target));
            if price > cash {
                return Ok(ephemeral(NOT_ENOUGH_MONEY));
            }

            let targets = std::iter::once(&target.id).chain(paired.iter());
            for id in targets {
                match ledger.check_ownership(guild_id, &buyer.id, id) {
                    Ok(()) => {}
                    Err(LedgerError::Cycle) => return Ok(ephemeral(CYCLE)),
                    Err(LedgerError::SelfOwnership) => return Ok(ephemeral(SELF_PURCHASE)),
                    Err(LedgerError::BotParticipant) => return Ok(ephemeral("❌ Bots können nicht gekauft werden.")),
                    Err(e) => return Err(e.into()),
                }
            }
            paired
                .as_deref()
                .and_then(|p| ledger.user(guild_id, p))
                .map(|u| u.username.clone())
        };

        let auction = Auction::new(guild_id, &buyer.id, &target.id, paired, role, price, self.settings.clone());
        let buyer_mention = self.aliases.mention(&buyer.id);
        let embed = Embed::new(format!(
            "🏦 Kauf gestartet: {}",
            self.aliases.bundle_display(&target.id, &target.username, pair_name.as_deref())
        ))
        .color(GOLD)
        .description(format!(
            "👤 **Kauft:** {}\n🎭 **Als:** `{}`\n💰 **Startpreis:** `{} 💵`\n\n💸 **Aktuelles Gebot:** `{} 💵`\n👑 **Führend:** {}",
            buyer_mention,
            role,
            format_amount(price),
            format_amount(price),
            buyer_mention
        ))
        .footer("Biete über den Button!");
        let reply = Reply::embed(embed).with_buttons(render::auction_buttons(&auction.id().to_string()));

        info!(
            "[AUCTION] {} started by {} for {} as '{}' at {}",
            auction.id(),
            buyer.id,
            target.id,
            role,
            price
        );
        spawn_auction(auction, self.auction_context(&interaction.token)).await;
        Ok(InteractionResponse::message(reply))
    }

    /// `kauf_bid:<id>` / `kauf_cancel:<id>`
    pub(super) async fn auction_button(
        &self,
        action: &str,
        auction_id: &str,
        guild_id: &str,
        user: &User,
    ) -> Result<InteractionResponse> {
        let handle = match Uuid::parse_str(auction_id) {
            Ok(id) => self.auctions.lock().await.get(&id).cloned(),
            Err(_) => None,
        };
        let Some(handle) = handle else {
            return Ok(ephemeral(ENDED));
        };

        let result = if action == "kauf_cancel" {
            handle.cancel(&user.id).await
        } else if handle.is_target(&user.id) {
            return Ok(ephemeral(SELF_PURCHASE));
        } else {
            handle.bid(user.clone()).await.map(|_| ())
        };

        Ok(match result {
            Ok(()) => InteractionResponse::deferred_update(),
            Err(AuctionError::InsufficientFunds { required }) => {
                info!("[AUCTION] {} bid by {} in {} refused, needs {}", handle.id(), user.id, guild_id, required);
                ephemeral(NOT_ENOUGH_MONEY)
            }
            Err(AuctionError::Ineligible(LedgerError::SelfOwnership)) => ephemeral(SELF_PURCHASE),
            Err(AuctionError::Ineligible(e)) => {
                info!("[AUCTION] {} bid by {} in {} refused: {}", handle.id(), user.id, guild_id, e);
                ephemeral(CYCLE)
            }
            Err(AuctionError::NotInitiator) => ephemeral("❌ Nur der Verkäufer kann die Auktion abbrechen."),
            Err(_) => ephemeral(ENDED),
        })
    }
}
