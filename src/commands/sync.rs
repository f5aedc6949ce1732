//! Reconciliation of the platform command catalog with the registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::{CommandRegistry, RegisteredCommand};
use crate::components::is_enabled;
use crate::platform::{ApplicationCommand, CommandScope, PlatformSession, same_descriptor};

struct Local {
    command: Arc<RegisteredCommand>,
    enabled: bool,
}

impl CommandRegistry {
    /// Bring the platform's commands of one scope in line with the
    /// registry: drop orphans and commands of disabled components, create
    /// missing ones, overwrite changed ones.
    ///
    /// Global commands live in the global scope, the others in each guild.
    /// Failures are logged and the remaining steps still run.
    pub async fn sync(&self, session: &dyn PlatformSession, scope: &CommandScope) {
        debug!("Synchronizing slash commands ({})", scope);

        let remote = match session.application_commands(scope).await {
            Ok(remote) => remote,
            Err(e) => {
                error!("Failed to fetch slash commands ({}): {}", scope, e);
                return;
            }
        };

        let local = self.local_commands(scope).await;

        let remote = remove_orphans(session, scope, &local, remote).await;
        let remote = remove_disabled(session, scope, &local, remote).await;
        let remote = add_new(session, scope, &local, remote).await;
        update_changed(session, scope, &local, &remote).await;
    }

    /// Commands published in the scope with their enablement there.
    async fn local_commands(&self, scope: &CommandScope) -> HashMap<String, Local> {
        let global = matches!(scope, CommandScope::Global);
        let mut local = HashMap::new();

        for command in self.commands() {
            if command.global != global {
                continue;
            }
            let enabled = is_enabled(&self.entities, &command.owner, scope.guild_id()).await;
            local.insert(command.name().to_string(), Local { command, enabled });
        }

        local
    }
}

async fn remove_orphans(
    session: &dyn PlatformSession,
    scope: &CommandScope,
    local: &HashMap<String, Local>,
    remote: Vec<ApplicationCommand>,
) -> Vec<ApplicationCommand> {
    let mut kept = Vec::with_capacity(remote.len());
    for command in remote {
        if local.contains_key(&command.name) {
            kept.push(command);
            continue;
        }

        if delete(session, scope, &command).await {
            info!("Removed orphaned slash command /{} ({})", command.name, scope);
        } else {
            kept.push(command);
        }
    }
    kept
}

async fn remove_disabled(
    session: &dyn PlatformSession,
    scope: &CommandScope,
    local: &HashMap<String, Local>,
    remote: Vec<ApplicationCommand>,
) -> Vec<ApplicationCommand> {
    let mut kept = Vec::with_capacity(remote.len());
    for command in remote {
        let disabled = local.get(&command.name).is_some_and(|l| !l.enabled);
        if !disabled {
            kept.push(command);
            continue;
        }

        if delete(session, scope, &command).await {
            info!("Removed disabled slash command /{} ({})", command.name, scope);
        } else {
            kept.push(command);
        }
    }
    kept
}

async fn add_new(
    session: &dyn PlatformSession,
    scope: &CommandScope,
    local: &HashMap<String, Local>,
    mut remote: Vec<ApplicationCommand>,
) -> Vec<ApplicationCommand> {
    let mut missing: Vec<&Local> = local
        .values()
        .filter(|l| l.enabled && !remote.iter().any(|r| r.name == l.command.name()))
        .collect();
    missing.sort_by(|a, b| a.command.name().cmp(b.command.name()));

    for entry in missing {
        let code = entry.command.owner.code;
        match session
            .create_application_command(scope, &entry.command.descriptor)
            .await
        {
            Ok(created) => {
                info!(component = code, "Added slash command /{} ({})", created.name, scope);
                remote.push(created);
            }
            Err(e) => error!(
                component = code,
                "Failed to add slash command /{} ({}): {}",
                entry.command.name(),
                scope,
                e
            ),
        }
    }
    remote
}

async fn update_changed(
    session: &dyn PlatformSession,
    scope: &CommandScope,
    local: &HashMap<String, Local>,
    remote: &[ApplicationCommand],
) {
    for command in remote {
        let Some(entry) = local.get(&command.name).filter(|l| l.enabled) else {
            continue;
        };
        if same_descriptor(&entry.command.descriptor, command) {
            continue;
        }

        let code = entry.command.owner.code;
        match session
            .create_application_command(scope, &entry.command.descriptor)
            .await
        {
            Ok(_) => info!(component = code, "Updated slash command /{} ({})", command.name, scope),
            Err(e) => error!(
                component = code,
                "Failed to update slash command /{} ({}): {}", command.name, scope, e
            ),
        }
    }
}

async fn delete(session: &dyn PlatformSession, scope: &CommandScope, command: &ApplicationCommand) -> bool {
    let Some(id) = command.id.as_deref() else {
        error!("Cannot remove slash command /{} ({}) without an id", command.name, scope);
        return false;
    };

    match session.delete_application_command(scope, id).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to remove slash command /{} ({}): {}", command.name, scope, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::components::Component;
    use crate::database::EntityManager;
    use crate::database::models::{
        GlobalComponentStatus, Guild, GuildComponentStatus, RegisteredComponent,
    };
    use crate::database::repository::testing::entity_manager;
    use crate::platform::mock::MockSession;
    use crate::platform::{CommandOption, OptionType};

    async fn register_component(entities: &EntityManager, code: &str, enabled: bool) -> i64 {
        let mut registered = RegisteredComponent {
            code: code.into(),
            name: code.into(),
            ..Default::default()
        };
        entities.registered_components().create(&mut registered).await.unwrap();
        entities
            .global_component_statuses()
            .create(&mut GlobalComponentStatus::new(registered.id, enabled))
            .await
            .unwrap();
        registered.id
    }

    fn command(name: &str) -> Command {
        Command::new(
            ApplicationCommand::new(name, format!("{name} command")),
            |_, _| async { Ok(()) },
        )
        .global()
    }

    async fn scenario() -> (CommandRegistry, std::sync::Arc<MockSession>) {
        let entities = entity_manager().await;
        register_component(&entities, "ping_pong", true).await;
        register_component(&entities, "statistics", true).await;
        register_component(&entities, "admin", false).await;

        let registry = CommandRegistry::new(entities);
        registry
            .register(Arc::new(Component::new("ping_pong", "Ping Pong")), command("ping"))
            .unwrap();
        registry
            .register(Arc::new(Component::new("statistics", "Statistics")), command("stats"))
            .unwrap();
        registry
            .register(Arc::new(Component::new("admin", "Admin")), command("admin_only"))
            .unwrap();

        let session = MockSession::new();
        session.seed_commands(CommandScope::Global, &["ping", "legacy_cmd"]);

        (registry, session)
    }

    #[tokio::test]
    async fn test_sync_reconciles_global_scope() {
        let (registry, session) = scenario().await;

        registry.sync(session.as_ref(), &CommandScope::Global).await;

        assert_eq!(session.command_names(&CommandScope::Global), vec!["ping", "stats"]);
        let deleted: Vec<String> = session.deleted.lock().iter().map(|(_, n)| n.clone()).collect();
        let created: Vec<String> = session.created.lock().iter().map(|(_, n)| n.clone()).collect();
        assert_eq!(deleted, vec!["legacy_cmd"]);
        assert_eq!(created, vec!["stats"]);
    }

    #[tokio::test]
    async fn test_second_sync_is_a_no_op() {
        let (registry, session) = scenario().await;

        registry.sync(session.as_ref(), &CommandScope::Global).await;
        session.reset_recordings();
        registry.sync(session.as_ref(), &CommandScope::Global).await;

        assert!(session.created.lock().is_empty());
        assert!(session.deleted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_changed_descriptor_is_overwritten() {
        let entities = entity_manager().await;
        register_component(&entities, "dice", true).await;
        let registry = CommandRegistry::new(entities);
        registry
            .register(
                Arc::new(Component::new("dice", "Dice")),
                Command::new(
                    ApplicationCommand::new("roll", "roll command").option(
                        CommandOption::new(OptionType::Integer, "sides", "Number of sides"),
                    ),
                    |_, _| async { Ok(()) },
                )
                .global(),
            )
            .unwrap();

        let session = MockSession::new();
        session.seed_commands(CommandScope::Global, &["roll"]);

        registry.sync(session.as_ref(), &CommandScope::Global).await;

        let created: Vec<String> = session.created.lock().iter().map(|(_, n)| n.clone()).collect();
        assert_eq!(created, vec!["roll"]);
        assert!(session.deleted.lock().is_empty());
        assert_eq!(session.command_names(&CommandScope::Global), vec!["roll"]);
    }

    #[tokio::test]
    async fn test_guild_scope_follows_guild_status() {
        let entities = entity_manager().await;
        let component_id = register_component(&entities, "dice", true).await;
        let mut guild = Guild::new(10, "g");
        entities.guilds().create(&mut guild).await.unwrap();
        let mut status = GuildComponentStatus::new(guild.id, component_id, true);
        entities.guild_component_statuses().create(&mut status).await.unwrap();

        let registry = CommandRegistry::new(entities.clone());
        registry
            .register(
                Arc::new(Component::new("dice", "Dice")),
                Command::new(ApplicationCommand::new("roll", "roll command"), |_, _| async { Ok(()) }),
            )
            .unwrap();
        let session = MockSession::new();
        let scope = CommandScope::Guild("10".into());

        registry.sync(session.as_ref(), &scope).await;
        assert_eq!(session.command_names(&scope), vec!["roll"]);
        assert!(session.command_names(&CommandScope::Global).is_empty());

        entities
            .guild_component_statuses()
            .update(
                &mut status,
                crate::database::models::component_status::COLUMN_ENABLED,
                false,
            )
            .await
            .unwrap();
        registry.sync(session.as_ref(), &scope).await;
        assert!(session.command_names(&scope).is_empty());
    }
}
