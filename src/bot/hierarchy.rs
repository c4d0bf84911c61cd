//! Ownership views: `/hierarchie` and `/hierarchielist`

use anyhow::Result;
use rand::Rng;

use super::aliases::Aliases;
use super::render::{truncate, GOLD};
use super::{ephemeral, Bot};
use crate::comms::interaction::{Interaction, InteractionResponse};
use crate::comms::message::{Button, ButtonStyle, Embed, Reply};
use crate::core::ownership::{self, OwnershipGraph};
use crate::core::types::GuildData;

const MAX_DESCRIPTION: usize = 4000;
const PAGE_LIMIT: usize = 3900;
const TOP_OWNERS: usize = 20;

/// ASCII forest of the guild, or the subtree below `focus`.
///
/// Every unowned non-bot user starts a tree, even one that owns nobody.
/// A focus that is unknown or a bot yields an empty text.
pub fn hierarchy_text(guild: &GuildData, focus: Option<&str>, aliases: &Aliases) -> String {
    let graph = OwnershipGraph::from_guild(guild);
    let roots = match focus {
        Some(id) => match guild.users.get(id) {
            Some(user) if !user.bot => vec![id.to_string()],
            _ => Vec::new(),
        },
        None => ownership::roots(guild),
    };

    graph.render_forest(&roots, |id| match guild.ownerships.get(id) {
        Some(edge) => format!("{} ({})", aliases.mention(id), edge.role),
        None => aliases.mention(id),
    })
}

/// One block per owner, most owned users first
pub fn owner_blocks(guild: &GuildData, aliases: &Aliases) -> Vec<String> {
    let mut owners: Vec<_> = guild.users.values().filter(|u| !u.owned.is_empty()).collect();
    owners.sort_by(|a, b| b.owned.len().cmp(&a.owned.len()).then_with(|| a.id.cmp(&b.id)));

    owners
        .into_iter()
        .take(TOP_OWNERS)
        .map(|owner| {
            let lines: Vec<String> = owner
                .owned
                .iter()
                .map(|target| {
                    let role = guild.ownerships.get(target).map(|e| e.role.as_str()).unwrap_or("?");
                    format!("├─ <@{}> → {}", target, role)
                })
                .collect();
            format!(
                "**{}** hat **{} Personen** gekauft:\n{}",
                aliases.mention(&owner.id),
                owner.owned.len(),
                lines.join("\n")
            )
        })
        .collect()
}

/// Greedy pagination on block boundaries; an oversized block gets a page of its own, cut
pub fn paginate(blocks: &[String], limit: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();

    for block in blocks {
        let needed = if current.is_empty() {
            block.chars().count()
        } else {
            current.chars().count() + 2 + block.chars().count()
        };
        if needed > limit && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(block);
        if current.chars().count() > limit {
            pages.push(truncate(&current, limit));
            current.clear();
        }
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

fn list_page(pages: &[String], page: usize) -> Reply {
    let page = page.min(pages.len().saturating_sub(1));
    let embed = Embed::new("💰 Kaufbaum")
        .color(GOLD)
        .description(pages.get(page).cloned().unwrap_or_default())
        .footer(format!("Seite {} / {}", page + 1, pages.len()));

    let mut reply = Reply::embed(embed);
    if pages.len() > 1 {
        reply = reply.with_buttons(vec![
            Button::new(format!("hlist_page:{}", page.saturating_sub(1)), "⬅️ Zurück", ButtonStyle::Secondary)
                .disabled(page == 0),
            Button::new(format!("hlist_page:{}", page + 1), "➡️ Weiter", ButtonStyle::Secondary)
                .disabled(page + 1 >= pages.len()),
        ]);
    }
    reply
}

impl Bot {
    /// `/hierarchie [user]`
    pub(super) async fn show_hierarchy(&self, interaction: &Interaction, guild_id: &str) -> Result<InteractionResponse> {
        let focus = interaction.option_user("user");
        let text = {
            let ledger = self.ledger.lock().await;
            ledger
                .guild(guild_id)
                .map(|g| hierarchy_text(g, focus.as_ref().map(|u| u.id.as_str()), &self.aliases))
                .unwrap_or_default()
        };

        let description = if text.is_empty() {
            "Keine Hierarchie vorhanden.".to_string()
        } else {
            truncate(&text, MAX_DESCRIPTION)
        };
        let color = rand::thread_rng().gen_range(0..=0xffffff);
        let embed = Embed::new("🐾 Besitz-Hierarchie").description(description).color(color);
        Ok(InteractionResponse::message(Reply::embed(embed)))
    }

    /// `/hierarchielist typ [nutzer]`
    pub(super) async fn show_hierarchy_list(&self, interaction: &Interaction, guild_id: &str) -> Result<InteractionResponse> {
        match interaction.option_str("typ").unwrap_or("all") {
            "gekauft" => {
                let Some(user) = interaction.option_user("nutzer") else {
                    return Ok(ephemeral("❌ Bitte wähle einen Nutzer aus."));
                };
                let ledger = self.ledger.lock().await;
                let count = ledger.user(guild_id, &user.id).map(|u| u.owned.len()).unwrap_or(0);
                let name = self.aliases.display_name(&user.id, &user.username);
                Ok(InteractionResponse::message(Reply::text(format!(
                    "💰 **{}** hat **{}** Nutzer gekauft.",
                    name, count
                ))))
            }
            "all" => {
                let pages = self.hierarchy_pages(guild_id).await;
                if pages.is_empty() {
                    return Ok(InteractionResponse::message(Reply::text("📭 Keine Kaufdaten gefunden.")));
                }
                Ok(InteractionResponse::message(list_page(&pages, 0)))
            }
            other => Ok(ephemeral(format!("❌ Unbekannter Typ: {}", other))),
        }
    }

    /// `hlist_page:<n>` buttons rewrite the list message in place
    pub(super) async fn hierarchy_page(&self, guild_id: &str, arg: &str) -> Result<InteractionResponse> {
        let page: usize = arg.parse().unwrap_or(0);
        let pages = self.hierarchy_pages(guild_id).await;
        if pages.is_empty() {
            return Ok(InteractionResponse::update(Reply::text("📭 Keine Kaufdaten gefunden.")));
        }
        Ok(InteractionResponse::update(list_page(&pages, page)))
    }

    async fn hierarchy_pages(&self, guild_id: &str) -> Vec<String> {
        let ledger = self.ledger.lock().await;
        ledger
            .guild(guild_id)
            .map(|g| paginate(&owner_blocks(g, &self.aliases), PAGE_LIMIT))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::*;
    use crate::core::types::{OwnershipEdge, UserRecord};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn guild(edges: &[(&str, &str, &str)], extra: &[&str]) -> GuildData {
        let mut g = GuildData::default();
        let ids = edges.iter().flat_map(|(o, t, _)| [*o, *t]).chain(extra.iter().copied());
        for id in ids {
            g.users
                .entry(id.to_string())
                .or_insert_with(|| UserRecord::new(id, None, dec!(0), "Arbeitslos"));
        }
        for (owner, target, role) in edges {
            g.users.get_mut(*owner).unwrap().owned.push(target.to_string());
            g.ownerships.insert(
                target.to_string(),
                OwnershipEdge {
                    owner_id: owner.to_string(),
                    role: role.to_string(),
                    date: 0,
                },
            );
        }
        g
    }

    #[test]
    fn test_hierarchy_text_lists_every_root() {
        let mut g = guild(&[("1", "2", "Hund"), ("2", "3", "Katze"), ("1", "4", "Diener")], &["8", "9"]);
        g.users.get_mut("8").unwrap().bot = true;
        let text = hierarchy_text(&g, None, &Aliases::default());
        assert_eq!(
            text,
            "<@1>\n├── <@2> (Hund)\n│   └── <@3> (Katze)\n└── <@4> (Diener)\n<@9>"
        );
    }

    #[test]
    fn test_hierarchy_text_focus() {
        let mut g = guild(&[("1", "2", "Hund"), ("2", "3", "Katze")], &["8"]);
        g.users.get_mut("8").unwrap().bot = true;
        let aliases = Aliases::default();
        assert_eq!(hierarchy_text(&g, Some("2"), &aliases), "<@2> (Hund)\n└── <@3> (Katze)");
        assert_eq!(hierarchy_text(&g, Some("8"), &aliases), "");
        assert_eq!(hierarchy_text(&g, Some("77"), &aliases), "");
    }

    #[test]
    fn test_owner_blocks_sorted_by_count() {
        let g = guild(&[("1", "2", "Hund"), ("5", "6", "A"), ("5", "7", "B")], &[]);
        let blocks = owner_blocks(&g, &Aliases::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "**<@5>** hat **2 Personen** gekauft:\n├─ <@6> → A\n├─ <@7> → B");
        assert!(blocks[1].starts_with("**<@1>** hat **1 Personen**"));
    }

    #[test]
    fn test_paginate_respects_limit() {
        let blocks: Vec<String> = (0..5).map(|i| format!("{}", i).repeat(40)).collect();
        let pages = paginate(&blocks, 100);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.chars().count() <= 100));
        assert_eq!(pages[0], format!("{}\n\n{}", "0".repeat(40), "1".repeat(40)));

        let huge = paginate(&["x".repeat(150)], 100);
        assert_eq!(huge.len(), 1);
        assert_eq!(huge[0].chars().count(), 100);
    }

    #[test]
    fn test_list_page_buttons() {
        let pages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let first = list_page(&pages, 0);
        let buttons = &first.components[0].components;
        assert!(buttons[0].disabled);
        assert!(!buttons[1].disabled);
        assert_eq!(buttons[1].custom_id, "hlist_page:1");

        let last = list_page(&pages, 7);
        assert_eq!(last.embeds[0].footer.as_ref().unwrap().text, "Seite 3 / 3");
        assert!(last.components[0].components[1].disabled);

        assert!(list_page(&pages[..1], 0).components.is_empty());
    }

    #[tokio::test]
    async fn test_list_commands() {
        let f = fixture();
        let all = || command("hierarchielist", "1", json!([{ "name": "typ", "value": "all" }]), json!({}));
        assert_eq!(content(&f.bot.handle(all()).await), "📭 Keine Kaufdaten gefunden.");

        f.bot
            .ledger
            .lock()
            .await
            .transfer_ownership(GUILD, "1", "2", dec!(10), "Hund")
            .unwrap();

        let response = f.bot.handle(all()).await;
        assert!(description(&response).contains("**<@1>** hat **1 Personen** gekauft"));

        let bought = command(
            "hierarchielist",
            "1",
            json!([{ "name": "typ", "value": "gekauft" }, { "name": "nutzer", "value": "1" }]),
            json!({ "1": { "id": "1", "username": "anna" } }),
        );
        assert_eq!(content(&f.bot.handle(bought).await), "💰 **anna** hat **1** Nutzer gekauft.");

        let page = f.bot.handle(button("hlist_page:0", "3")).await;
        assert_eq!(page.kind, 7);

        let tree = f.bot.handle(command("hierarchie", "1", json!([]), json!({}))).await;
        assert_eq!(description(&tree), "<@1>\n└── <@2> (Hund)");
    }
}
