use std::sync::Arc;

use super::Component;
use crate::bot::{AppState, AuditLogger, StatusRotator};
use crate::cache::CacheRegistry;
use crate::commands::CommandManager;
use crate::database::EntityManager;
use crate::events::HandlerManager;
use crate::platform::PlatformSession;

/// What a component sees of the running bot.
#[derive(Clone)]
pub struct ComponentContext {
    component: Arc<Component>,
    state: AppState,
}

impl ComponentContext {
    pub fn new(component: Arc<Component>, state: AppState) -> Self {
        Self { component, state }
    }

    pub fn component(&self) -> &Arc<Component> {
        &self.component
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn entities(&self) -> &Arc<EntityManager> {
        &self.state.entities
    }

    pub fn cache(&self) -> &Arc<CacheRegistry> {
        &self.state.cache
    }

    pub fn session(&self) -> &Arc<dyn PlatformSession> {
        &self.state.session
    }

    pub fn status(&self) -> &Arc<StatusRotator> {
        &self.state.status
    }

    /// Event handlers owned by this component.
    pub fn handlers(&self) -> HandlerManager {
        HandlerManager::new(
            self.component.clone(),
            self.state.handlers.clone(),
            self.state.session.clone(),
            self.state.entities.clone(),
        )
    }

    /// Slash commands owned by this component.
    pub fn commands(&self) -> CommandManager {
        CommandManager::new(self.component.clone(), self.state.commands.clone())
    }

    /// Audit logging on behalf of this component.
    pub fn audit(&self) -> AuditLogger {
        AuditLogger::new(
            self.component.clone(),
            self.state.entities.clone(),
            self.state.session.clone(),
        )
    }
}
