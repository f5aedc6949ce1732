//! Chat platform abstraction.
//!
//! Everything above this module talks to the platform through
//! [`PlatformSession`]; the Discord implementation lives in `discord`.

mod bus;
pub mod command;
mod event;
#[cfg(test)]
pub mod mock;
mod models;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

pub use bus::{EventBus, HandlerId};
pub use command::{ApplicationCommand, CommandOption, OptionType, same_descriptor};
pub use event::{
    Event, EventKind, EventPayload, GuildCreate, GuildDelete, GuildUpdate, InteractionCreate,
    MessageCreate, Ready,
};
pub use models::{
    BotStatus, Embed, Interaction, InteractionData, InteractionOption, InteractionResponse, Member,
    Message, MessageSend, User,
};

/// Errors forwarded from platform calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("malformed platform payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("session is not connected")]
    NotConnected,
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Callback bound to one event kind on the session.
pub type EventCallback =
    Arc<dyn Fn(Arc<dyn PlatformSession>, Event) -> BoxFuture<'static, ()> + Send + Sync>;

/// Box an async closure into an [`EventCallback`].
pub fn event_callback<F, Fut>(f: F) -> EventCallback
where
    F: Fn(Arc<dyn PlatformSession>, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(
        move |session: Arc<dyn PlatformSession>, event: Event| -> BoxFuture<'static, ()> {
            f(session, event).boxed()
        },
    )
}

/// Where an application command lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandScope {
    Global,
    Guild(String),
}

impl CommandScope {
    /// Guild id of a guild scope, `""` for the global scope.
    pub fn guild_id(&self) -> &str {
        match self {
            Self::Global => "",
            Self::Guild(id) => id,
        }
    }
}

impl std::fmt::Display for CommandScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// Capabilities the bot core needs from a connected chat platform.
#[async_trait]
pub trait PlatformSession: Send + Sync {
    /// Attach a durable callback for one event kind.
    fn add_handler(&self, kind: EventKind, callback: EventCallback) -> HandlerId;

    /// Attach a callback that is detached before its first invocation.
    fn add_handler_once(&self, kind: EventKind, callback: EventCallback) -> HandlerId;

    /// Detach a callback. Returns whether it was still attached.
    fn remove_handler(&self, id: HandlerId) -> bool;

    /// The bot account, known once the session is ready.
    fn current_user(&self) -> Option<User>;

    /// Guilds the bot is currently on.
    fn guild_ids(&self) -> Vec<String>;

    async fn send_message(&self, channel_id: &str, message: MessageSend) -> PlatformResult<Message>;

    async fn update_presence(&self, status: &BotStatus) -> PlatformResult<()>;

    async fn application_commands(
        &self,
        scope: &CommandScope,
    ) -> PlatformResult<Vec<ApplicationCommand>>;

    /// Create a command. Creating an existing name overwrites it.
    async fn create_application_command(
        &self,
        scope: &CommandScope,
        command: &ApplicationCommand,
    ) -> PlatformResult<ApplicationCommand>;

    async fn delete_application_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
    ) -> PlatformResult<()>;

    async fn respond_interaction(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> PlatformResult<()>;
}
