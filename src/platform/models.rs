//! Platform data types, shaped after the Discord JSON payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::command::OptionType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub const COLOR_INFO: u32 = 0x5865F2;
    pub const COLOR_ERROR: u32 = 0xED4245;

    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    #[must_use]
    pub fn timestamp_now(mut self) -> Self {
        self.timestamp = Some(chrono::Utc::now().to_rfc3339());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Outgoing channel message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageSend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl MessageSend {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }
}

/// An application command invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

impl Interaction {
    pub const APPLICATION_COMMAND: u8 = 2;

    /// The invoking user: the member's user in guilds, `user` in DMs.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    pub fn guild_id(&self) -> &str {
        self.guild_id.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

impl InteractionData {
    /// Invoked path through sub-command groups, e.g. `["jojo", "module", "list"]`.
    pub fn command_path(&self) -> Vec<&str> {
        let mut path = vec![self.name.as_str()];
        let mut options = &self.options;

        while let Some(nested) = options.iter().find(|o| o.kind.is_sub_command()) {
            path.push(&nested.name);
            options = &nested.options;
        }

        path
    }

    /// Value options of the invoked leaf.
    pub fn leaf_options(&self) -> &[InteractionOption] {
        let mut options = &self.options;
        while let Some(nested) = options.iter().find(|o| o.kind.is_sub_command()) {
            options = &nested.options;
        }
        options
    }

    /// String value of a leaf option.
    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.leaf_options()
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
}

/// Reply to an interaction with a channel message.
#[derive(Debug, Clone, Default)]
pub struct InteractionResponse {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    /// Only the invoking user sees the reply.
    pub ephemeral: bool,
}

impl InteractionResponse {
    const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
    const FLAG_EPHEMERAL: u64 = 1 << 6;

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Request body of the interaction callback endpoint.
    pub fn to_payload(&self) -> Value {
        let mut data = json!({ "embeds": self.embeds });
        if let Some(content) = &self.content {
            data["content"] = json!(content);
        }
        if self.ephemeral {
            data["flags"] = json!(Self::FLAG_EPHEMERAL);
        }

        json!({ "type": Self::CHANNEL_MESSAGE_WITH_SOURCE, "data": data })
    }
}

/// Presence activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Game,
    Listening,
}

impl ActivityType {
    pub fn code(self) -> u8 {
        match self {
            Self::Game => 0,
            Self::Listening => 2,
        }
    }
}

/// A presence entry the status rotator cycles through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotStatus {
    pub activity: ActivityType,
    pub content: String,
}

impl BotStatus {
    pub fn game(content: impl Into<String>) -> Self {
        Self {
            activity: ActivityType::Game,
            content: content.into(),
        }
    }

    pub fn listening(content: impl Into<String>) -> Self {
        Self {
            activity: ActivityType::Listening,
            content: content.into(),
        }
    }

    /// Gateway presence update (`op 3`) data.
    pub fn to_presence(&self) -> Value {
        let activity = json!({ "name": self.content, "type": self.activity.code() });

        json!({
            "since": null,
            "activities": [activity],
            "status": "online",
            "afk": false,
        })
    }
}
