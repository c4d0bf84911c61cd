//! Embeds and buttons shared by the command handlers

use rust_decimal::{Decimal, RoundingStrategy};

use crate::comms::message::{Button, ButtonStyle, Embed, Reply};
use crate::core::types::{TransactionKind, TransactionRecord, UserRecord};

pub const BANK_COLOR: u32 = 0x00ffcc;
pub const GOLD: u32 = 0xffd700;
pub const GREEN: u32 = 0x57f287;
pub const RED: u32 = 0xed4245;

/// German number formatting: `12345.5` -> `12.345,5`
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

pub fn format_transaction(tx: Option<&TransactionRecord>) -> String {
    let Some(tx) = tx else {
        return "Keine Transaktion vorhanden".to_string();
    };
    let amount = format!("{} €", format_amount(tx.amount));
    match tx.kind {
        TransactionKind::Deposit => format!("💰 Einzahlung: **+{}**", amount),
        TransactionKind::Withdraw => format!("🏧 Abhebung: **-{}**", amount),
        TransactionKind::Purchase => format!("🛒 Kauf: **-{}**", amount),
        TransactionKind::Balance => format!("ℹ️ {}", amount),
    }
}

pub fn bank_reply(user: &UserRecord, last: Option<&TransactionRecord>, footer: Option<&str>) -> Reply {
    let mut embed = Embed::new("🏦 Bankkonto").color(BANK_COLOR).description(format!(
        "💵 **Bar:** {} €\n🏦 **Bank:** {} €\n\n📌 **Letzte Transaktion:**\n{}\n\n🧰 **Job:** {}",
        format_amount(user.balance),
        format_amount(user.bank),
        format_transaction(last),
        if user.job.is_empty() { "Arbeitslos" } else { user.job.as_str() },
    ));
    if let Some(text) = footer {
        embed = embed.footer(text);
    }

    Reply::embed(embed).with_buttons(vec![
        Button::new(format!("bank_deposit:{}", user.id), "💰 Einzahlen", ButtonStyle::Success),
        Button::new(format!("bank_withdraw:{}", user.id), "🏧 Abheben", ButtonStyle::Primary),
    ])
}

pub fn stage_name(stage: u8) -> &'static str {
    match stage {
        1 => "📣 Zum ersten!",
        2 => "📣 Zum zweiten!",
        3 => "📣 Zum dritten!",
        4 => "📢 ⚠️ LETZTE CHANCE ⚠️",
        _ => "🌀 Unbekannte Phase",
    }
}

pub fn stage_color(stage: u8) -> u32 {
    match stage {
        1 => 0xffff00,
        2 => 0xffa500,
        3 => 0xff0000,
        4 => 0x8b0000,
        _ => 0x999999,
    }
}

/// Ten-cell bar, full at the start of a stage
pub fn progress_bar(remaining: u32, duration: u32) -> String {
    let filled = if duration == 0 {
        0
    } else {
        ((remaining.min(duration) as u64 * 10) / duration as u64) as usize
    };
    format!("{}{}", "■".repeat(filled), "□".repeat(10 - filled))
}

/// Inputs for one countdown render
pub struct StageView<'a> {
    pub stage: u8,
    pub remaining: u32,
    pub duration: u32,
    pub price: Decimal,
    pub leader_mention: &'a str,
    pub role: &'a str,
}

pub fn stage_embed(view: &StageView<'_>) -> Embed {
    Embed::new(stage_name(view.stage))
        .color(stage_color(view.stage))
        .description(format!(
            "🪧 **Phase:** {}\n\n💰 **Aktuelles Gebot:** `{} 💵`\n👑 **Führend:** {}\n🎭 **Als Rolle:** `{}`\n\n⏳ **Zeit verbleibend:** {}s\n```{}```",
            view.stage,
            format_amount(view.price),
            view.leader_mention,
            view.role,
            view.remaining,
            progress_bar(view.remaining, view.duration),
        ))
        .footer("Biete weiter über den Button!")
}

pub fn auction_buttons(auction_id: &str) -> Vec<Button> {
    vec![
        Button::new(format!("kauf_bid:{}", auction_id), "💸 Bieten", ButtonStyle::Primary),
        Button::new(format!("kauf_cancel:{}", auction_id), "❌ Abbrechen", ButtonStyle::Danger),
    ]
}

/// Cut to `max` characters, marking the cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
