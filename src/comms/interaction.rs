//! Inbound interactions
//!
//! Payloads delivered to the interactions endpoint, and the immediate
//! response returned for each.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::comms::message::{Modal, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    Command,
    Component,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind_code: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub member: Option<Member>,
    /// Set instead of `member` outside guilds
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub resolved: Option<Resolved>,
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Modal submissions: rows of text inputs
    #[serde(default)]
    pub components: Vec<SubmittedRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub users: HashMap<String, User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedRow {
    #[serde(default)]
    pub components: Vec<SubmittedInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedInput {
    pub custom_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Interaction {
    pub fn kind(&self) -> InteractionKind {
        match self.kind_code {
            1 => InteractionKind::Ping,
            2 => InteractionKind::Command,
            3 => InteractionKind::Component,
            4 => InteractionKind::Autocomplete,
            5 => InteractionKind::ModalSubmit,
            other => InteractionKind::Unknown(other),
        }
    }

    /// The user who triggered the interaction
    pub fn invoker(&self) -> Option<&User> {
        self.member.as_ref().map(|m| &m.user).or(self.user.as_ref())
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.name.as_deref())
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.custom_id.as_deref())
    }

    fn option(&self, name: &str) -> Option<&Value> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    pub fn option_i64(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(Value::as_i64)
    }

    /// A user option, looked up in the resolved data for name and bot flag
    pub fn option_user(&self, name: &str) -> Option<User> {
        let id = self.option_str(name)?;
        let resolved = self
            .data
            .as_ref()
            .and_then(|d| d.resolved.as_ref())
            .and_then(|r| r.users.get(id))
            .cloned();
        Some(resolved.unwrap_or_else(|| User {
            id: id.to_string(),
            username: String::new(),
            bot: false,
        }))
    }

    /// Value of a submitted modal text input
    pub fn modal_value(&self, custom_id: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .components
            .iter()
            .flat_map(|row| row.components.iter())
            .find(|input| input.custom_id == custom_id)
            .and_then(|input| input.value.as_deref())
    }

    /// Creation time in Unix milliseconds, decoded from the snowflake id
    pub fn created_at_millis(&self) -> Option<i64> {
        const PLATFORM_EPOCH: i64 = 1_420_070_400_000;
        let id: u64 = self.id.parse().ok()?;
        Some((id >> 22) as i64 + PLATFORM_EPOCH)
    }
}

/// Immediate answer to an interaction
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseData {
    Message(Reply),
    Modal(Modal),
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: 1, data: None }
    }

    /// New message in the channel
    pub fn message(reply: Reply) -> Self {
        Self {
            kind: 4,
            data: Some(ResponseData::Message(reply)),
        }
    }

    /// Acknowledge a component without changing its message
    pub fn deferred_update() -> Self {
        Self { kind: 6, data: None }
    }

    /// Replace the message the component belongs to
    pub fn update(reply: Reply) -> Self {
        Self {
            kind: 7,
            data: Some(ResponseData::Message(reply)),
        }
    }

    pub fn modal(modal: Modal) -> Self {
        Self {
            kind: 9,
            data: Some(ResponseData::Modal(modal)),
        }
    }

    pub fn reply(&self) -> Option<&Reply> {
        match &self.data {
            Some(ResponseData::Message(reply)) => Some(reply),
            _ => None,
        }
    }
}
