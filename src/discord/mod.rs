//! Discord implementation of [`PlatformSession`].

mod gateway;
mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use self::rest::RestClient;
use crate::platform::{
    ApplicationCommand, BotStatus, CommandScope, EventBus, EventCallback, EventKind, HandlerId,
    Interaction, InteractionResponse, Message, MessageSend, PlatformError, PlatformResult,
    PlatformSession, Ready, User,
};

const OP_PRESENCE_UPDATE: u8 = 3;

/// A bot session on Discord: one gateway connection plus the REST API.
pub struct DiscordSession {
    token: String,
    rest: RestClient,
    bus: EventBus,
    user: RwLock<Option<User>>,
    /// Guild id to name.
    guilds: DashMap<String, String>,
    outgoing: mpsc::UnboundedSender<Value>,
    pending_outgoing: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    shutdown: watch::Sender<bool>,
    ready: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordSession {
    pub fn new(token: &str) -> Arc<Self> {
        let (outgoing, pending) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let (ready, _) = watch::channel(false);

        Arc::new(Self {
            token: token.to_string(),
            rest: RestClient::new(token),
            bus: EventBus::new(),
            user: RwLock::new(None),
            guilds: DashMap::new(),
            outgoing,
            pending_outgoing: Mutex::new(Some(pending)),
            shutdown,
            ready,
            task: Mutex::new(None),
        })
    }

    /// Open the gateway and wait for the first `READY`.
    pub async fn open(self: &Arc<Self>) -> PlatformResult<()> {
        let Some(outgoing) = self.pending_outgoing.lock().take() else {
            return Err(PlatformError::Gateway("session already opened".to_string()));
        };

        let mut ready = self.ready.subscribe();
        let mut task = tokio::spawn(gateway::run(self.clone(), outgoing, self.shutdown.subscribe()));

        let outcome = tokio::select! {
            result = ready.wait_for(|ready| *ready) => result.map(|_| ()).map_err(|_| ()),
            _ = &mut task => Err(()),
        };
        *self.task.lock() = Some(task);

        outcome.map_err(|()| PlatformError::Gateway("gateway stopped before ready".to_string()))
    }

    /// Close the gateway connection and wait for its task.
    pub async fn close(&self) {
        self.shutdown.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    fn on_ready(&self, ready: &Ready) {
        info!(
            "Logged in as {} ({} guilds)",
            ready.user.username,
            ready.guilds.len()
        );
        *self.user.write() = Some(ready.user.clone());
        for guild in &ready.guilds {
            self.guilds.entry(guild.id.clone()).or_default();
        }
        self.ready.send_replace(true);
    }
}

#[async_trait]
impl PlatformSession for DiscordSession {
    fn add_handler(&self, kind: EventKind, callback: EventCallback) -> HandlerId {
        self.bus.add(kind, callback, false)
    }

    fn add_handler_once(&self, kind: EventKind, callback: EventCallback) -> HandlerId {
        self.bus.add(kind, callback, true)
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        self.bus.remove(id)
    }

    fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    fn guild_ids(&self) -> Vec<String> {
        self.guilds.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn send_message(&self, channel_id: &str, message: MessageSend) -> PlatformResult<Message> {
        self.rest.send_message(channel_id, &message).await
    }

    async fn update_presence(&self, status: &BotStatus) -> PlatformResult<()> {
        self.outgoing
            .send(json!({ "op": OP_PRESENCE_UPDATE, "d": status.to_presence() }))
            .map_err(|_| PlatformError::NotConnected)
    }

    async fn application_commands(
        &self,
        scope: &CommandScope,
    ) -> PlatformResult<Vec<ApplicationCommand>> {
        self.rest.application_commands(scope).await
    }

    async fn create_application_command(
        &self,
        scope: &CommandScope,
        command: &ApplicationCommand,
    ) -> PlatformResult<ApplicationCommand> {
        self.rest.create_application_command(scope, command).await
    }

    async fn delete_application_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
    ) -> PlatformResult<()> {
        self.rest.delete_application_command(scope, command_id).await
    }

    async fn respond_interaction(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> PlatformResult<()> {
        self.rest.respond_interaction(interaction, &response).await
    }
}
