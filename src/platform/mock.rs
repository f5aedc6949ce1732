//! Recording in-process session used by tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    ApplicationCommand, BotStatus, CommandScope, Event, EventBus, EventCallback, EventKind,
    HandlerId, Interaction, InteractionResponse, Message, MessageSend, PlatformResult,
    PlatformSession, User,
};

#[derive(Default)]
pub struct MockSession {
    bus: EventBus,
    next_id: AtomicU64,
    guilds: Mutex<Vec<String>>,
    commands: Mutex<HashMap<CommandScope, Vec<ApplicationCommand>>>,
    pub created: Mutex<Vec<(CommandScope, String)>>,
    pub deleted: Mutex<Vec<(CommandScope, String)>>,
    pub sent: Mutex<Vec<(String, MessageSend)>>,
    pub responses: Mutex<Vec<InteractionResponse>>,
    pub presences: Mutex<Vec<BotStatus>>,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bot_user() -> User {
        User {
            id: "1000".into(),
            username: "componentbot".into(),
            global_name: None,
            bot: true,
        }
    }

    pub fn add_guild(&self, guild_id: &str) {
        self.guilds.lock().push(guild_id.to_string());
    }

    /// Seed the platform catalog of a scope.
    pub fn seed_commands(&self, scope: CommandScope, names: &[&str]) {
        let mut commands = self.commands.lock();
        let list = commands.entry(scope).or_default();
        for name in names {
            let mut command = ApplicationCommand::new(*name, format!("{name} command"));
            command.id = Some(self.fresh_id());
            list.push(command);
        }
    }

    /// Command names the platform currently has in a scope.
    pub fn command_names(&self, scope: &CommandScope) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .lock()
            .get(scope)
            .map(|list| list.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn reset_recordings(&self) {
        self.created.lock().clear();
        self.deleted.lock().clear();
        self.sent.lock().clear();
        self.responses.lock().clear();
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.bus.len(kind)
    }

    /// Dispatch an event and wait for every callback to finish.
    pub async fn deliver(self: &Arc<Self>, event: Event) {
        let session: Arc<dyn PlatformSession> = self.clone();
        for handle in self.bus.dispatch(session, event) {
            let _ = handle.await;
        }
    }

    fn fresh_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

#[async_trait]
impl PlatformSession for MockSession {
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
        Some(Self::bot_user())
    }

    fn guild_ids(&self) -> Vec<String> {
        self.guilds.lock().clone()
    }

    async fn send_message(&self, channel_id: &str, message: MessageSend) -> PlatformResult<Message> {
        self.sent.lock().push((channel_id.to_string(), message.clone()));
        Ok(Message {
            id: self.fresh_id(),
            channel_id: channel_id.to_string(),
            author: Self::bot_user(),
            content: message.content.unwrap_or_default(),
            embeds: message.embeds,
            ..Default::default()
        })
    }

    async fn update_presence(&self, status: &BotStatus) -> PlatformResult<()> {
        self.presences.lock().push(status.clone());
        Ok(())
    }

    async fn application_commands(
        &self,
        scope: &CommandScope,
    ) -> PlatformResult<Vec<ApplicationCommand>> {
        Ok(self.commands.lock().get(scope).cloned().unwrap_or_default())
    }

    async fn create_application_command(
        &self,
        scope: &CommandScope,
        command: &ApplicationCommand,
    ) -> PlatformResult<ApplicationCommand> {
        let mut created = command.clone();
        let mut commands = self.commands.lock();
        let list = commands.entry(scope.clone()).or_default();

        match list.iter_mut().find(|c| c.name == command.name) {
            Some(existing) => {
                created.id = existing.id.clone();
                *existing = created.clone();
            }
            None => {
                created.id = Some(self.fresh_id());
                list.push(created.clone());
            }
        }

        self.created.lock().push((scope.clone(), command.name.clone()));
        Ok(created)
    }

    async fn delete_application_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
    ) -> PlatformResult<()> {
        let mut commands = self.commands.lock();
        if let Some(list) = commands.get_mut(scope)
            && let Some(position) = list.iter().position(|c| c.id.as_deref() == Some(command_id))
        {
            let removed = list.remove(position);
            self.deleted.lock().push((scope.clone(), removed.name));
        }
        Ok(())
    }

    async fn respond_interaction(
        &self,
        _interaction: &Interaction,
        response: InteractionResponse,
    ) -> PlatformResult<()> {
        self.responses.lock().push(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::platform::{GuildDelete, event_callback};

    fn counting(counter: Arc<AtomicUsize>) -> EventCallback {
        event_callback(move |_, _| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    fn guild_delete() -> Event {
        Event::GuildDelete(GuildDelete {
            id: "1".into(),
            unavailable: false,
        })
    }

    #[tokio::test]
    async fn test_once_callback_runs_once() {
        let session = MockSession::new();
        let counter = Arc::new(AtomicUsize::new(0));
        session.add_handler_once(EventKind::GuildDelete, counting(counter.clone()));

        session.deliver(guild_delete()).await;
        session.deliver(guild_delete()).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(session.handler_count(EventKind::GuildDelete), 0);
    }

    #[tokio::test]
    async fn test_panic_does_not_affect_other_callbacks() {
        let session = MockSession::new();
        let counter = Arc::new(AtomicUsize::new(0));

        session.add_handler(
            EventKind::GuildDelete,
            event_callback(|_, _| async { panic!("boom") }),
        );
        session.add_handler(EventKind::GuildDelete, counting(counter.clone()));

        session.deliver(guild_delete()).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_removed_callback_is_not_invoked() {
        let session = MockSession::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = session.add_handler(EventKind::GuildDelete, counting(counter.clone()));

        assert!(session.remove_handler(id));
        assert!(!session.remove_handler(id));
        session.deliver(guild_delete()).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
