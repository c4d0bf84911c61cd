//! `/bank` and the deposit/withdraw modal flow

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::render::{self, RED};
use super::{ephemeral, username, Bot};
use crate::comms::interaction::{InteractionResponse, User};
use crate::comms::message::{Embed, Modal, Reply, TextInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankAction {
    Deposit,
    Withdraw,
}

impl BankAction {
    pub fn modal_id(self) -> &'static str {
        match self {
            BankAction::Deposit => "bank_modal_deposit",
            BankAction::Withdraw => "bank_modal_withdraw",
        }
    }

    pub fn from_modal_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            "bank_modal_deposit" => Some(BankAction::Deposit),
            "bank_modal_withdraw" => Some(BankAction::Withdraw),
            _ => None,
        }
    }

    fn title(self) -> &'static str {
        match self {
            BankAction::Deposit => "💰 Geld einzahlen",
            BankAction::Withdraw => "🏧 Geld abheben",
        }
    }

    fn footer(self, succeeded: bool) -> &'static str {
        match (self, succeeded) {
            (BankAction::Deposit, true) => "✅ Einzahlung erfolgreich abgeschlossen",
            (BankAction::Deposit, false) => "❌ Nicht genug Bargeld vorhanden",
            (BankAction::Withdraw, true) => "✅ Abhebung erfolgreich abgeschlossen",
            (BankAction::Withdraw, false) => "❌ Nicht genug Guthaben auf der Bank",
        }
    }
}

/// Positive amount from free text; `,` is accepted as decimal separator
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let amount: Decimal = raw.trim().replace(',', ".").parse().ok()?;
    (amount > Decimal::ZERO).then_some(amount)
}

/// Button press on a bank embed; only the account owner gets the form
pub fn open_modal(action: BankAction, user: &User, owner_id: &str) -> InteractionResponse {
    if user.id != owner_id {
        let embed = Embed::new("⚠️ Zugriff verweigert")
            .description("Dies ist nicht deine Interaktion.")
            .color(RED);
        return InteractionResponse::message(Reply::embed(embed).ephemeral());
    }

    InteractionResponse::modal(
        Modal::new(action.modal_id(), action.title())
            .input(TextInput::short("amount", "Betrag").placeholder("z. B. 500")),
    )
}

impl Bot {
    pub(super) async fn show_bank(&self, guild_id: &str, user: &User) -> Result<InteractionResponse> {
        let mut ledger = self.ledger.lock().await;
        let record = ledger.get_or_create(guild_id, &user.id, username(user));
        let txlog = self.transactions.lock().await;
        let last = txlog.last(guild_id, &user.id).or(record.last_transaction.as_ref());

        Ok(InteractionResponse::message(render::bank_reply(record, last, None)))
    }

    pub(super) async fn submit_bank(
        &self,
        guild_id: &str,
        user: &User,
        action: BankAction,
        raw_amount: Option<&str>,
    ) -> Result<InteractionResponse> {
        let Some(amount) = raw_amount.and_then(parse_amount) else {
            return Ok(ephemeral("❌ Bitte gib einen gültigen Betrag ein."));
        };

        let mut ledger = self.ledger.lock().await;
        ledger.get_or_create(guild_id, &user.id, username(user));
        let result = match action {
            BankAction::Deposit => ledger.deposit(guild_id, &user.id, amount),
            BankAction::Withdraw => ledger.withdraw(guild_id, &user.id, amount),
        };

        let succeeded = result.is_ok();
        let mut txlog = self.transactions.lock().await;
        match result {
            Ok(tx) => {
                info!("[BOT] {:?} of {} by {} in {}", action, amount, user.id, guild_id);
                txlog.record(guild_id, &user.id, tx);
            }
            Err(e) => info!("[BOT] {:?} of {} by {} refused: {}", action, amount, user.id, e),
        }

        let record = ledger
            .user(guild_id, &user.id)
            .ok_or_else(|| anyhow!("account {} missing after update", user.id))?;
        let reply = render::bank_reply(record, txlog.last(guild_id, &user.id), Some(action.footer(succeeded)));
        Ok(InteractionResponse::update(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::*;
    use crate::core::types::TransactionKind;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn footer(response: &InteractionResponse) -> String {
        response.reply().unwrap().embeds[0].footer.clone().unwrap().text
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 250 "), Some(dec!(250)));
        assert_eq!(parse_amount("12,5"), Some(dec!(12.5)));
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[tokio::test]
    async fn test_bank_command_shows_fresh_account() {
        let f = fixture();
        let response = f.bot.handle(command("bank", "7", json!([]), json!({}))).await;

        assert_eq!(response.kind, 4);
        let text = description(&response);
        assert!(text.contains("**Bar:** 10.000 €"));
        assert!(text.contains("Keine Transaktion vorhanden"));
        assert!(text.contains("Arbeitslos"));
    }

    #[tokio::test]
    async fn test_foreign_button_is_denied() {
        let f = fixture();
        let response = f.bot.handle(button("bank_deposit:7", "8")).await;

        let reply = response.reply().unwrap();
        assert!(reply.is_ephemeral());
        assert_eq!(reply.embeds[0].description.as_deref(), Some("Dies ist nicht deine Interaktion."));
    }

    #[tokio::test]
    async fn test_owner_button_opens_modal() {
        let f = fixture();
        let response = f.bot.handle(button("bank_withdraw:7", "7")).await;

        assert_eq!(response.kind, 9);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["custom_id"], "bank_modal_withdraw");
        assert_eq!(value["data"]["title"], "🏧 Geld abheben");
    }

    #[tokio::test]
    async fn test_deposit_moves_cash_and_logs() {
        let f = fixture();
        let response = f.bot.handle(modal("bank_modal_deposit", "7", "250,5")).await;

        assert_eq!(response.kind, 7);
        assert_eq!(footer(&response), "✅ Einzahlung erfolgreich abgeschlossen");
        assert!(description(&response).contains("💰 Einzahlung: **+250,5 €**"));

        let ledger = f.bot.ledger.lock().await;
        let user = ledger.user(GUILD, "7").unwrap();
        assert_eq!(user.balance, dec!(9749.5));
        assert_eq!(user.bank, dec!(250.5));
        let txlog = f.bot.transactions.lock().await;
        assert_eq!(txlog.last(GUILD, "7").unwrap().kind, TransactionKind::Deposit);
    }

    #[tokio::test]
    async fn test_overdrawn_withdraw_changes_nothing() {
        let f = fixture();
        let response = f.bot.handle(modal("bank_modal_withdraw", "7", "1")).await;

        assert_eq!(footer(&response), "❌ Nicht genug Guthaben auf der Bank");
        assert!(f.bot.transactions.lock().await.last(GUILD, "7").is_none());
        let ledger = f.bot.ledger.lock().await;
        assert_eq!(ledger.user(GUILD, "7").unwrap().balance, dec!(10000));
    }

    #[tokio::test]
    async fn test_invalid_amount_is_ephemeral() {
        let f = fixture();
        let response = f.bot.handle(modal("bank_modal_deposit", "7", "viel")).await;

        assert_eq!(content(&response), "❌ Bitte gib einen gültigen Betrag ein.");
        assert!(response.reply().unwrap().is_ephemeral());
    }
}
