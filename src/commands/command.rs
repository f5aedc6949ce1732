use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::components::{Category, Component};
use crate::platform::{ApplicationCommand, Interaction, PlatformSession};

/// Interaction handler of a command.
pub type CommandFn = Arc<
    dyn Fn(Arc<dyn PlatformSession>, Interaction) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// A slash command as declared by a component.
pub struct Command {
    pub descriptor: ApplicationCommand,
    /// Published in the global scope instead of per guild.
    pub global: bool,
    pub category: Option<Category>,
    handler: CommandFn,
}

impl Command {
    pub fn new<F, Fut>(descriptor: ApplicationCommand, handler: F) -> Self
    where
        F: Fn(Arc<dyn PlatformSession>, Interaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            descriptor,
            global: false,
            category: None,
            handler: Arc::new(
                move |session: Arc<dyn PlatformSession>,
                      interaction: Interaction|
                      -> BoxFuture<'static, anyhow::Result<()>> {
                    handler(session, interaction).boxed()
                },
            ),
        }
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// A command bound to the component that registered it.
pub struct RegisteredCommand {
    pub descriptor: ApplicationCommand,
    pub global: bool,
    /// Declared category, falling back to the owner's first one.
    pub category: Category,
    pub owner: Arc<Component>,
    pub(super) handler: CommandFn,
}

impl RegisteredCommand {
    pub(super) fn new(owner: Arc<Component>, command: Command) -> Self {
        let category = command
            .category
            .or_else(|| owner.categories.first().copied())
            .unwrap_or(Category::Utilities);

        Self {
            descriptor: command.descriptor,
            global: command.global,
            category,
            owner,
            handler: command.handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
