use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{Command, CommandError, RegisteredCommand};
use crate::components::{Category, Component, is_enabled};
use crate::database::EntityManager;
use crate::platform::{
    CommandOption, Embed, Event, EventKind, HandlerId, Interaction, InteractionOption,
    InteractionResponse, OptionType, PlatformSession, event_callback,
};
use crate::utils::command_id;

/// Process-wide map of slash commands by top-level name.
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<RegisteredCommand>>>,
    pub(super) entities: Arc<EntityManager>,
    initialized: AtomicBool,
}

/// Flattened leaf of a registered command, as listed by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSummary {
    /// Lowercase underscore-joined command path.
    pub id: String,
    /// Space-joined command path.
    pub name: String,
    pub component: String,
    pub category: Category,
    pub description: String,
    /// Value options of the leaf, sub commands excluded.
    #[serde(skip)]
    pub options: Vec<CommandOption>,
}

impl CommandRegistry {
    pub fn new(entities: Arc<EntityManager>) -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
            entities,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn register(
        &self,
        owner: Arc<Component>,
        command: Command,
    ) -> Result<Arc<RegisteredCommand>, CommandError> {
        let mut commands = self.commands.write();
        if commands.contains_key(command.name()) {
            return Err(CommandError::AlreadyRegistered(command.name().to_string()));
        }

        let registered = Arc::new(RegisteredCommand::new(owner, command));
        commands.insert(registered.name().to_string(), registered.clone());

        Ok(registered)
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.commands.write().remove(name).is_some()
    }

    /// Drop every command owned by a component.
    pub fn unregister_all(&self, code: &str) -> usize {
        let mut commands = self.commands.write();
        let before = commands.len();
        commands.retain(|_, command| command.owner.code != code);
        before - commands.len()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        self.commands.read().get(name).cloned()
    }

    /// Every registered command, sorted by name.
    pub fn commands(&self) -> Vec<Arc<RegisteredCommand>> {
        let mut commands: Vec<_> = self.commands.read().values().cloned().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Mount the single interaction handler routing to registered commands.
    pub fn init(self: &Arc<Self>, session: &dyn PlatformSession) -> Result<HandlerId, CommandError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(CommandError::AlreadyInitialized);
        }

        let registry = Arc::clone(self);
        let id = session.add_handler(
            EventKind::InteractionCreate,
            event_callback(move |session: Arc<dyn PlatformSession>, event: Event| {
                let registry = registry.clone();
                async move {
                    if let Event::InteractionCreate(interaction) = event {
                        registry.dispatch(session, interaction).await;
                    }
                }
            }),
        );

        debug!("Mounted slash command dispatcher");
        Ok(id)
    }

    /// Route an interaction to its command, refusing commands of disabled
    /// components.
    pub async fn dispatch(&self, session: Arc<dyn PlatformSession>, interaction: Interaction) {
        if interaction.kind != Interaction::APPLICATION_COMMAND {
            return;
        }
        let Some(data) = interaction.data.as_ref() else {
            return;
        };
        let Some(command) = self.get(&data.name) else {
            warn!("Received interaction for unknown command /{}", data.name);
            return;
        };

        let code = command.owner.code;
        let path = data.command_path().join(" ");
        let options = describe_options(data.leaf_options());
        let invoker = interaction
            .invoker()
            .map(|user| format!("{} ({})", user.username, user.id))
            .unwrap_or_else(|| "unknown user".to_string());
        let place = match interaction.guild_id() {
            "" => "in a direct message".to_string(),
            guild_id => format!("on guild {guild_id}"),
        };

        if !is_enabled(&self.entities, &command.owner, interaction.guild_id()).await {
            let response = self.disabled_response(&command).await;
            if let Err(e) = session.respond_interaction(&interaction, response).await {
                error!(component = code, "Failed to answer disabled command /{}: {}", path, e);
                return;
            }

            info!(
                component = code,
                "{} tried to execute the disabled command \"{}\" with options \"{}\" {}",
                invoker,
                path,
                options,
                place
            );
            return;
        }

        info!(
            component = code,
            "{} executed the command \"{}\" with options \"{}\" {}", invoker, path, options, place
        );

        let handler = command.handler.clone();
        if let Err(e) = handler(session, interaction).await {
            error!(component = code, "Slash command /{} failed: {:#}", path, e);
        }
    }

    async fn disabled_response(&self, command: &RegisteredCommand) -> InteractionResponse {
        let owner = &command.owner;
        let text = if is_enabled(&self.entities, owner, "").await {
            format!(
                "The command `/{}` is disabled on this guild! Ask your guild's administrator \
                 to enable the `{}` component to use this command!",
                command.name(),
                owner.name
            )
        } else {
            format!(
                "The command `/{}` is globally disabled. This might be due to some \
                 maintenance on the `{}` component.",
                command.name(),
                owner.name
            )
        };

        let embed = Embed::new()
            .title("Command unavailable")
            .color(Embed::COLOR_ERROR)
            .field(":no_entry_sign: STOP :no_entry_sign:", text, false);

        InteractionResponse::embed(embed).ephemeral()
    }

    /// Flatten every command into its leaves: the command itself when it
    /// has no sub commands, otherwise each sub command.
    pub fn summaries(&self) -> Vec<CommandSummary> {
        let mut summaries = Vec::new();
        for command in self.commands() {
            let path = vec![command.descriptor.name.clone()];
            let before = summaries.len();
            collect_leaves(&command, &path, &command.descriptor.options, &mut summaries);

            if summaries.len() == before {
                summaries.push(summary(
                    &command,
                    &path,
                    &command.descriptor.description,
                    &command.descriptor.options,
                ));
            }
        }
        summaries
    }

    /// Leaf of a flattened command by id.
    pub fn summary(&self, id: &str) -> Option<CommandSummary> {
        self.summaries().into_iter().find(|s| s.id == id)
    }
}

fn collect_leaves(
    command: &RegisteredCommand,
    path: &[String],
    options: &[CommandOption],
    out: &mut Vec<CommandSummary>,
) {
    for option in options {
        let mut nested = path.to_vec();
        nested.push(option.name.clone());

        match option.kind {
            OptionType::SubCommandGroup => collect_leaves(command, &nested, &option.options, out),
            OptionType::SubCommand => {
                out.push(summary(command, &nested, &option.description, &option.options))
            }
            _ => {}
        }
    }
}

fn summary(
    command: &RegisteredCommand,
    path: &[String],
    description: &str,
    options: &[CommandOption],
) -> CommandSummary {
    CommandSummary {
        id: command_id(path),
        name: path.join(" "),
        component: command.owner.code.to_string(),
        category: command.category,
        description: description.to_string(),
        options: options
            .iter()
            .filter(|o| !o.kind.is_sub_command())
            .cloned()
            .collect(),
    }
}

fn describe_options(options: &[InteractionOption]) -> String {
    options
        .iter()
        .map(|option| match &option.value {
            Some(value) => format!("{}={}", option.name, value),
            None => option.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::database::models::{GlobalComponentStatus, Guild, GuildComponentStatus, RegisteredComponent};
    use crate::database::repository::testing::entity_manager;
    use crate::platform::mock::MockSession;
    use crate::platform::{ApplicationCommand, InteractionData};

    fn jojo() -> ApplicationCommand {
        ApplicationCommand::new("jojo", "Manage the bot")
            .option(
                CommandOption::group("module", "Manage modules")
                    .option(CommandOption::sub_command("list", "List modules"))
                    .option(
                        CommandOption::sub_command("enable", "Enable a module").option(
                            CommandOption::new(OptionType::String, "module", "Module code")
                                .required()
                                .choice("Ping Pong", "ping_pong"),
                        ),
                    ),
            )
            .option(CommandOption::sub_command("sync-commands", "Resync commands"))
    }

    fn interaction(name: &str, guild_id: Option<&str>) -> Interaction {
        Interaction {
            id: "1".into(),
            application_id: "2".into(),
            kind: Interaction::APPLICATION_COMMAND,
            token: "t".into(),
            guild_id: guild_id.map(str::to_string),
            channel_id: Some("3".into()),
            member: None,
            user: Some(MockSession::bot_user()),
            data: Some(InteractionData {
                id: "9".into(),
                name: name.into(),
                options: Vec::new(),
            }),
        }
    }

    #[tokio::test]
    async fn test_duplicate_command_is_rejected() {
        let registry = CommandRegistry::new(entity_manager().await);
        let owner = Arc::new(Component::new("bot_core", "Bot Core"));

        registry
            .register(owner.clone(), Command::new(jojo(), |_, _| async { Ok(()) }))
            .unwrap();
        let Err(err) = registry.register(owner, Command::new(jojo(), |_, _| async { Ok(()) })) else {
            panic!("second /jojo registration was accepted");
        };

        assert!(matches!(err, CommandError::AlreadyRegistered(name) if name == "jojo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_init_mounts_once() {
        let registry = Arc::new(CommandRegistry::new(entity_manager().await));
        let session = MockSession::new();

        registry.init(session.as_ref()).unwrap();
        assert!(matches!(
            registry.init(session.as_ref()),
            Err(CommandError::AlreadyInitialized)
        ));
        assert_eq!(session.handler_count(EventKind::InteractionCreate), 1);
    }

    #[tokio::test]
    async fn test_summaries_flatten_sub_commands() {
        let registry = CommandRegistry::new(entity_manager().await);
        let owner = Arc::new(Component::new("bot_core", "Bot Core").category(Category::Administration));
        registry
            .register(owner.clone(), Command::new(jojo(), |_, _| async { Ok(()) }))
            .unwrap();
        registry
            .register(
                owner,
                Command::new(ApplicationCommand::new("ping", "Ping"), |_, _| async { Ok(()) })
                    .category(Category::Fun),
            )
            .unwrap();

        let ids: Vec<String> = registry.summaries().into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec!["jojo_module_list", "jojo_module_enable", "jojo_sync-commands", "ping"]
        );

        let enable = registry.summary("jojo_module_enable").unwrap();
        assert_eq!(enable.name, "jojo module enable");
        assert_eq!(enable.category, Category::Administration);
        assert_eq!(enable.options.len(), 1);
        assert_eq!(enable.options[0].choices[0].value, json!("ping_pong"));

        assert_eq!(registry.summary("ping").unwrap().category, Category::Fun);
        assert!(registry.summary("jojo_module").is_none());
    }

    #[tokio::test]
    async fn test_disabled_command_is_refused() {
        let entities = entity_manager().await;
        let registry = Arc::new(CommandRegistry::new(entities.clone()));
        let session = MockSession::new();
        registry.init(session.as_ref()).unwrap();

        let mut guild = Guild::new(10, "g");
        entities.guilds().create(&mut guild).await.unwrap();
        let mut registered = RegisteredComponent {
            code: "dice".into(),
            name: "Dice".into(),
            ..Default::default()
        };
        entities.registered_components().create(&mut registered).await.unwrap();
        entities
            .global_component_statuses()
            .create(&mut GlobalComponentStatus::new(registered.id, true))
            .await
            .unwrap();
        entities
            .guild_component_statuses()
            .create(&mut GuildComponentStatus::new(guild.id, registered.id, false))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let hits = calls.clone();
        registry
            .register(
                Arc::new(Component::new("dice", "Dice")),
                Command::new(ApplicationCommand::new("roll", "Roll"), move |_, _| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .unwrap();

        session
            .deliver(Event::InteractionCreate(interaction("roll", Some("10"))))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let responses = session.responses.lock().clone();
        assert_eq!(responses.len(), 1);
        assert!(responses[0].ephemeral);
        let text = &responses[0].embeds[0].fields[0].value;
        assert!(text.contains("disabled on this guild"), "{text}");

        session
            .deliver(Event::InteractionCreate(interaction("roll", None)))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregister_all_removes_owned_commands() {
        let registry = CommandRegistry::new(entity_manager().await);
        let core = Arc::new(Component::new("bot_core", "Bot Core"));
        let dice = Arc::new(Component::new("dice", "Dice"));
        registry
            .register(core, Command::new(jojo(), |_, _| async { Ok(()) }))
            .unwrap();
        registry
            .register(dice, Command::new(ApplicationCommand::new("roll", "Roll"), |_, _| async { Ok(()) }))
            .unwrap();

        assert_eq!(registry.unregister_all("dice"), 1);
        assert!(registry.get("roll").is_none());
        assert!(registry.get("jojo").is_some());
    }
}
