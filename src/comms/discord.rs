//! Discord REST client
//!
//! Webhook endpoints for editing and following up interaction responses,
//! plus global slash-command registration.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::comms::message::Reply;
use crate::comms::transport::Transport;
use crate::config::DiscordConfig;

pub struct DiscordRest {
    token: String,
    application_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl DiscordRest {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            token: config.token.clone(),
            application_id: config.application_id.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn webhook_url(&self, interaction_token: &str) -> String {
        format!("{}/webhooks/{}/{}", self.base_url, self.application_id, interaction_token)
    }

    /// Replace all global slash commands with `commands`
    pub async fn register_commands(&self, commands: &[Value]) -> Result<()> {
        let resp = self
            .client
            .put(format!("{}/applications/{}/commands", self.base_url, self.application_id))
            .header("Authorization", format!("Bot {}", self.token))
            .json(commands)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("command registration failed: {} {}", status, body);
        }
        info!("[DISCORD] Registered {} global slash commands", commands.len());
        Ok(())
    }
}

#[async_trait]
impl Transport for DiscordRest {
    async fn edit_original(&self, token: &str, reply: &Reply) -> Result<()> {
        let resp = self
            .client
            .patch(format!("{}/messages/@original", self.webhook_url(token)))
            .json(reply)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("edit original failed: {}", resp.status());
        }
        debug!("[DISCORD] Edited original response");
        Ok(())
    }

    async fn follow_up(&self, token: &str, reply: &Reply) -> Result<()> {
        let resp = self
            .client
            .post(self.webhook_url(token))
            .json(reply)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("follow-up failed: {}", resp.status());
        }
        debug!("[DISCORD] Sent follow-up");
        Ok(())
    }
}
