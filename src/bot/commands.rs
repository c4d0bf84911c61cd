//! Slash-command definitions and `/ping`

use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use super::render::GREEN;
use crate::comms::interaction::{Interaction, InteractionResponse};
use crate::comms::message::{Embed, Reply};
use crate::core::types::now_millis;

// option types
const STRING: u8 = 3;
const INTEGER: u8 = 4;
const USER: u8 = 6;

/// Global command set, registered on startup
pub fn definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "bank",
            "description": "Zeigt dein Bankkonto an",
            "dm_permission": false
        }),
        json!({
            "name": "kaufen",
            "description": "Starte einen Kauf für einen Nutzer",
            "dm_permission": false,
            "options": [
                { "type": USER, "name": "ziel", "description": "Wen willst du kaufen?", "required": true },
                { "type": INTEGER, "name": "preis", "description": "Startpreis", "required": true, "min_value": 1 },
                { "type": STRING, "name": "als", "description": "Als welche Rolle?", "required": true }
            ]
        }),
        json!({
            "name": "hierarchie",
            "description": "Zeigt die Besitz-Hierarchie",
            "dm_permission": false,
            "options": [
                { "type": USER, "name": "user", "description": "Nur den Baum dieses Nutzers zeigen", "required": false }
            ]
        }),
        json!({
            "name": "hierarchielist",
            "description": "Listet Käufe auf",
            "dm_permission": false,
            "options": [
                {
                    "type": STRING,
                    "name": "typ",
                    "description": "Was soll angezeigt werden?",
                    "required": true,
                    "choices": [
                        { "name": "Alle Käufer", "value": "all" },
                        { "name": "Gekaufte eines Nutzers", "value": "gekauft" }
                    ]
                },
                { "type": USER, "name": "nutzer", "description": "Nutzer für typ gekauft", "required": false }
            ]
        }),
        json!({
            "name": "ping",
            "description": "Zeigt die Latenz des Bots"
        }),
    ]
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn ping(interaction: &Interaction, uptime: Duration) -> InteractionResponse {
    let latency = interaction
        .created_at_millis()
        .map(|created| format!("{} ms", (now_millis() - created).max(0)))
        .unwrap_or_else(|| "unbekannt".to_string());

    let embed = Embed::new("🏓 Pong!")
        .color(GREEN)
        .field("Bot-Latenz", latency, true)
        .field("Uptime", format_uptime(uptime), true)
        .timestamp(Utc::now().to_rfc3339());
    InteractionResponse::message(Reply::embed(embed).ephemeral())
}
