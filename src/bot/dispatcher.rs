//! Shared application state handed to every component.

use std::sync::Arc;

use super::StatusRotator;
use crate::cache::CacheRegistry;
use crate::commands::CommandRegistry;
use crate::components::ComponentRegistry;
use crate::database::EntityManager;
use crate::events::HandlerTable;
use crate::platform::PlatformSession;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Repositories over the configured store.
    pub entities: Arc<EntityManager>,

    /// Cache registry for creating/accessing caches.
    pub cache: Arc<CacheRegistry>,

    /// Every declared component, in load order.
    pub components: Arc<ComponentRegistry>,

    /// Event handlers by qualified name.
    pub handlers: Arc<HandlerTable>,

    /// Slash commands by name.
    pub commands: Arc<CommandRegistry>,

    /// Presence entries rotated by `bot_status`.
    pub status: Arc<StatusRotator>,

    /// Connected platform session.
    pub session: Arc<dyn PlatformSession>,
}

impl AppState {
    /// Create a new application state with empty registries.
    pub fn new(
        entities: Arc<EntityManager>,
        cache: Arc<CacheRegistry>,
        session: Arc<dyn PlatformSession>,
    ) -> Self {
        let commands = Arc::new(CommandRegistry::new(entities.clone()));

        Self {
            entities,
            cache,
            components: Arc::new(ComponentRegistry::new()),
            handlers: Arc::new(HandlerTable::new()),
            commands,
            status: Arc::new(StatusRotator::new()),
            session,
        }
    }
}
