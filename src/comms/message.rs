//! Outbound message model
//!
//! Text, embeds and buttons as the platform's REST API expects them.

use serde::Serialize;

/// Message flag: visible to the invoking user only
pub const EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow<Button>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(EPHEMERAL);
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.components.push(ActionRow::new(buttons));
        }
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags.map(|f| f & EPHEMERAL != 0).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn timestamp(mut self, rfc3339: String) -> Self {
        self.timestamp = Some(rfc3339);
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

/// Component type 1
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionRow<C> {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<C>,
}

impl<C> ActionRow<C> {
    pub fn new(components: Vec<C>) -> Self {
        Self { kind: 1, components }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl ButtonStyle {
    pub fn code(self) -> u8 {
        match self {
            ButtonStyle::Primary => 1,
            ButtonStyle::Secondary => 2,
            ButtonStyle::Success => 3,
            ButtonStyle::Danger => 4,
        }
    }
}

/// Component type 2
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: u8,
    pub label: String,
    pub custom_id: String,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            kind: 2,
            style: style.code(),
            label: label.into(),
            custom_id: custom_id.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Popup form with short text inputs
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Modal {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<ActionRow<TextInput>>,
}

impl Modal {
    pub fn new(custom_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            title: title.into(),
            components: Vec::new(),
        }
    }

    pub fn input(mut self, input: TextInput) -> Self {
        self.components.push(ActionRow::new(vec![input]));
        self
    }
}

/// Component type 4, short style
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextInput {
    #[serde(rename = "type")]
    kind: u8,
    pub custom_id: String,
    pub label: String,
    pub style: u8,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl TextInput {
    pub fn short(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: 4,
            custom_id: custom_id.into(),
            label: label.into(),
            style: 1,
            required: true,
            placeholder: None,
        }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ephemeral_reply_shape() {
        let reply = Reply::text("nope").ephemeral();
        assert!(reply.is_ephemeral());
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({ "content": "nope", "embeds": [], "components": [], "flags": 64 })
        );
    }

    #[test]
    fn test_button_row_shape() {
        let reply = Reply::embed(Embed::new("t").color(0xffd700))
            .with_buttons(vec![Button::new("next", "Weiter", ButtonStyle::Secondary).disabled(true)]);
        let value = serde_json::to_value(&reply).unwrap();

        assert_eq!(value["components"][0]["type"], 1);
        assert_eq!(
            value["components"][0]["components"][0],
            json!({ "type": 2, "style": 2, "label": "Weiter", "custom_id": "next", "disabled": true })
        );
        assert_eq!(value["embeds"][0], json!({ "title": "t", "color": 0xffd700 }));
    }

    #[test]
    fn test_empty_button_list_adds_no_row() {
        let reply = Reply::text("x").with_buttons(Vec::new());
        assert!(reply.components.is_empty());
    }

    #[test]
    fn test_modal_shape() {
        let modal = Modal::new("m", "Titel").input(TextInput::short("amount", "Betrag").placeholder("z. B. 500"));
        let value = serde_json::to_value(&modal).unwrap();
        assert_eq!(value["components"][0]["components"][0]["type"], 4);
        assert_eq!(value["components"][0]["components"][0]["placeholder"], "z. B. 500");
    }
}
