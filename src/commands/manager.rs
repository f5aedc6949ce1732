use std::sync::Arc;

use tracing::debug;

use super::{Command, CommandError, CommandRegistry};
use crate::components::Component;

/// Slash-command registration on behalf of one component.
#[derive(Clone)]
pub struct CommandManager {
    component: Arc<Component>,
    registry: Arc<CommandRegistry>,
}

impl CommandManager {
    pub fn new(component: Arc<Component>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            component,
            registry,
        }
    }

    pub fn register(&self, command: Command) -> Result<(), CommandError> {
        let name = command.name().to_string();
        self.registry.register(self.component.clone(), command)?;
        debug!(component = self.component.code, "Registered slash command /{}", name);
        Ok(())
    }

    /// Drop every command of this component from the registry.
    pub fn unregister_all(&self) -> usize {
        self.registry.unregister_all(self.component.code)
    }
}
