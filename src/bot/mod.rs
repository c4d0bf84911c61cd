//! Bot Module
//!
//! Routes interactions to the command, button and modal handlers:
//! - `/bank` and the deposit/withdraw flow
//! - `/kaufen` purchase auctions
//! - `/hierarchie`, `/hierarchielist`
//! - `/ping`

pub mod aliases;
pub mod bank;
pub mod commands;
pub mod hierarchy;
pub mod purchase;
pub mod render;

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use tracing::{debug, error};

use crate::comms::interaction::{Interaction, InteractionKind, InteractionResponse, User};
use crate::comms::message::Reply;
use crate::comms::monitor::SharedMonitor;
use crate::comms::transport::SharedTransport;
use crate::config::AuctionConfig;
use crate::core::ledger::SharedLedger;
use crate::data::transaction_log::SharedTransactionLog;

use aliases::Aliases;
use bank::BankAction;
use purchase::{AuctionContext, AuctionRegistry};

const GUILD_ONLY: &str = "❌ Dieser Befehl funktioniert nur auf einem Server.";
const UNEXPECTED: &str = "❌ Ein unerwarteter Fehler ist aufgetreten.";

pub struct Bot {
    ledger: SharedLedger,
    transactions: SharedTransactionLog,
    auctions: AuctionRegistry,
    transport: SharedTransport,
    monitor: SharedMonitor,
    aliases: Arc<Aliases>,
    settings: AuctionConfig,
}

impl Bot {
    pub fn new(
        ledger: SharedLedger,
        transactions: SharedTransactionLog,
        transport: SharedTransport,
        monitor: SharedMonitor,
        aliases: Aliases,
        settings: AuctionConfig,
    ) -> Self {
        Self {
            ledger,
            transactions,
            auctions: AuctionRegistry::default(),
            transport,
            monitor,
            aliases: Arc::new(aliases),
            settings,
        }
    }

    pub fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }

    /// Answer one interaction. Handler errors never escape: they are
    /// logged and turned into an ephemeral notice.
    pub async fn handle(&self, interaction: Interaction) -> InteractionResponse {
        match self.dispatch(&interaction).await {
            Ok(response) => response,
            Err(e) => {
                error!("[BOT] Interaction {} failed: {:#}", interaction.id, e);
                self.monitor.lock().await.record_error();
                ephemeral(UNEXPECTED)
            }
        }
    }

    async fn dispatch(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        match interaction.kind() {
            InteractionKind::Ping => Ok(InteractionResponse::pong()),
            InteractionKind::Command => {
                self.monitor.lock().await.record_command();
                self.on_command(interaction).await
            }
            InteractionKind::Component => {
                self.monitor.lock().await.record_component();
                self.on_component(interaction).await
            }
            InteractionKind::ModalSubmit => {
                self.monitor.lock().await.record_modal();
                self.on_modal(interaction).await
            }
            InteractionKind::Autocomplete | InteractionKind::Unknown(_) => {
                bail!("unsupported interaction type {}", interaction.kind_code)
            }
        }
    }

    async fn on_command(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let name = interaction.command_name().ok_or_else(|| anyhow!("command without a name"))?;
        debug!("[BOT] /{}", name);

        if name == "ping" {
            let uptime = self.monitor.lock().await.uptime();
            return Ok(commands::ping(interaction, uptime));
        }

        let Some(guild_id) = interaction.guild_id.as_deref() else {
            return Ok(ephemeral(GUILD_ONLY));
        };
        let user = invoker(interaction)?;

        match name {
            "bank" => self.show_bank(guild_id, user).await,
            "kaufen" => self.start_purchase(interaction, guild_id, user).await,
            "hierarchie" => self.show_hierarchy(interaction, guild_id).await,
            "hierarchielist" => self.show_hierarchy_list(interaction, guild_id).await,
            other => bail!("unknown command /{}", other),
        }
    }

    async fn on_component(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let custom_id = interaction.custom_id().ok_or_else(|| anyhow!("component without custom_id"))?;
        let user = invoker(interaction)?;
        if user.bot {
            return Ok(InteractionResponse::deferred_update());
        }
        let Some(guild_id) = interaction.guild_id.as_deref() else {
            return Ok(ephemeral(GUILD_ONLY));
        };

        let (action, arg) = custom_id.split_once(':').unwrap_or((custom_id, ""));
        match action {
            "bank_deposit" => Ok(bank::open_modal(BankAction::Deposit, user, arg)),
            "bank_withdraw" => Ok(bank::open_modal(BankAction::Withdraw, user, arg)),
            "kauf_bid" | "kauf_cancel" => self.auction_button(action, arg, guild_id, user).await,
            "hlist_page" => self.hierarchy_page(guild_id, arg).await,
            _ => bail!("unknown component '{}'", custom_id),
        }
    }

    async fn on_modal(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let custom_id = interaction.custom_id().ok_or_else(|| anyhow!("modal without custom_id"))?;
        let Some(guild_id) = interaction.guild_id.as_deref() else {
            return Ok(ephemeral(GUILD_ONLY));
        };
        let user = invoker(interaction)?;

        let action = BankAction::from_modal_id(custom_id).ok_or_else(|| anyhow!("unknown modal '{}'", custom_id))?;
        self.submit_bank(guild_id, user, action, interaction.modal_value("amount")).await
    }

    fn auction_context(&self, token: &str) -> AuctionContext {
        AuctionContext {
            ledger: self.ledger.clone(),
            transactions: self.transactions.clone(),
            transport: self.transport.clone(),
            monitor: self.monitor.clone(),
            aliases: self.aliases.clone(),
            registry: self.auctions.clone(),
            token: token.to_string(),
        }
    }
}

fn invoker(interaction: &Interaction) -> Result<&User> {
    interaction.invoker().ok_or_else(|| anyhow!("interaction {} has no user", interaction.id))
}

/// Username if the platform sent one
fn username(user: &User) -> Option<&str> {
    Some(user.username.as_str()).filter(|name| !name.is_empty())
}

fn ephemeral(text: impl Into<String>) -> InteractionResponse {
    InteractionResponse::message(Reply::text(text).ephemeral())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_ping_interaction_gets_pong() {
        let f = fixture();
        let ping: Interaction = serde_json::from_value(json!({ "id": "1", "type": 1 })).unwrap();
        assert_eq!(f.bot.handle(ping).await, InteractionResponse::pong());
    }

    #[tokio::test]
    async fn test_guild_commands_refuse_direct_messages() {
        let f = fixture();
        let dm: Interaction = serde_json::from_value(json!({
            "id": "1",
            "type": 2,
            "token": "t",
            "user": { "id": "5", "username": "dm" },
            "data": { "name": "bank" }
        }))
        .unwrap();

        let response = f.bot.handle(dm).await;
        assert_eq!(content(&response), GUILD_ONLY);
        assert!(response.reply().unwrap().is_ephemeral());
    }

    #[tokio::test]
    async fn test_unknown_component_is_reported_not_raised() {
        let f = fixture();
        let response = f.bot.handle(button("mystery:1", "5")).await;

        assert_eq!(content(&response), UNEXPECTED);
        let metrics = f.bot.monitor().lock().await.get_metrics();
        assert_eq!(metrics.errors, 1);
        assert_eq!(metrics.components, 1);
    }

    #[tokio::test]
    async fn test_ping_command_works_outside_guilds() {
        let f = fixture();
        let ping: Interaction = serde_json::from_value(json!({
            "id": "1234567890123456789",
            "type": 2,
            "token": "t",
            "user": { "id": "5", "username": "dm" },
            "data": { "name": "ping" }
        }))
        .unwrap();

        let response = f.bot.handle(ping).await;
        let reply = response.reply().unwrap();
        assert_eq!(reply.embeds[0].title.as_deref(), Some("🏓 Pong!"));
    }
}
