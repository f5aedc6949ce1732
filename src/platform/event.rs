//! Gateway events the bot core reacts to.

use serde::Deserialize;

use super::models::{Interaction, Message, UnavailableGuild, User};

/// Event kinds, named after their gateway dispatch type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    MessageCreate,
    InteractionCreate,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::InteractionCreate => "INTERACTION_CREATE",
        }
    }

    pub fn from_dispatch(name: &str) -> Option<Self> {
        Some(match name {
            "READY" => Self::Ready,
            "GUILD_CREATE" => Self::GuildCreate,
            "GUILD_UPDATE" => Self::GuildUpdate,
            "GUILD_DELETE" => Self::GuildDelete,
            "MESSAGE_CREATE" => Self::MessageCreate,
            "INTERACTION_CREATE" => Self::InteractionCreate,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildCreate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub member_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildUpdate {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildDelete {
    pub id: String,
    /// Set when the guild went through an outage rather than removing the bot.
    #[serde(default)]
    pub unavailable: bool,
}

pub type MessageCreate = Message;
pub type InteractionCreate = Interaction;

/// A dispatched event with its payload.
#[derive(Debug, Clone)]
pub enum Event {
    Ready(Ready),
    GuildCreate(GuildCreate),
    GuildUpdate(GuildUpdate),
    GuildDelete(GuildDelete),
    MessageCreate(Message),
    InteractionCreate(Interaction),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::InteractionCreate(_) => EventKind::InteractionCreate,
        }
    }

    /// Guild context of the event.
    ///
    /// Uses the payload's `guild_id` when it has one, the `id` of guild
    /// events otherwise. Empty when the event has no guild context.
    pub fn guild_id(&self) -> &str {
        match self {
            Self::MessageCreate(message) => message.guild_id.as_deref().unwrap_or_default(),
            Self::InteractionCreate(interaction) => {
                interaction.guild_id.as_deref().unwrap_or_default()
            }
            Self::GuildCreate(guild) => &guild.id,
            Self::GuildUpdate(guild) => &guild.id,
            Self::GuildDelete(guild) => &guild.id,
            Self::Ready(_) => "",
        }
    }

    /// Payload of message events.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::MessageCreate(message) => Some(message),
            _ => None,
        }
    }

    /// Decode a gateway dispatch (`t`, `d`) into an event.
    ///
    /// Returns `Ok(None)` for dispatch types the core does not handle.
    pub fn from_dispatch(name: &str, data: serde_json::Value) -> serde_json::Result<Option<Self>> {
        let Some(kind) = EventKind::from_dispatch(name) else {
            return Ok(None);
        };

        Ok(Some(match kind {
            EventKind::Ready => Self::Ready(serde_json::from_value(data)?),
            EventKind::GuildCreate => Self::GuildCreate(serde_json::from_value(data)?),
            EventKind::GuildUpdate => Self::GuildUpdate(serde_json::from_value(data)?),
            EventKind::GuildDelete => Self::GuildDelete(serde_json::from_value(data)?),
            EventKind::MessageCreate => Self::MessageCreate(serde_json::from_value(data)?),
            EventKind::InteractionCreate => Self::InteractionCreate(serde_json::from_value(data)?),
        }))
    }
}

/// A payload type bound to exactly one event kind.
///
/// Lets handler registration pick the event kind from the callback's
/// argument type.
pub trait EventPayload: Sized + Send + 'static {
    const KIND: EventKind;

    fn from_event(event: Event) -> Option<Self>;
}

macro_rules! event_payload {
    ($($variant:ident => $payload:ty),* $(,)?) => {
        $(
            impl EventPayload for $payload {
                const KIND: EventKind = EventKind::$variant;

                fn from_event(event: Event) -> Option<Self> {
                    match event {
                        Event::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }
        )*
    };
}

event_payload! {
    Ready => Ready,
    GuildCreate => GuildCreate,
    GuildUpdate => GuildUpdate,
    GuildDelete => GuildDelete,
    MessageCreate => Message,
    InteractionCreate => Interaction,
}
