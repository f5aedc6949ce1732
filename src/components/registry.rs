//! Ordered component list with load and unload drivers.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::component::lifecycle;
use super::{Component, ComponentContext, LifecycleFn};
use crate::bot::AppState;
use crate::database::EntityManager;
use crate::database::models::RegisteredComponent;
use crate::platform::CommandScope;

struct Entry {
    component: Arc<Component>,
    load: LifecycleFn,
}

/// Owner of every declared component, kept in load order.
///
/// Core components come first; within a tier higher `load_priority`
/// loads earlier and ties keep registration order.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a component with its load hook.
    ///
    /// Registering a code twice replaces the earlier declaration.
    pub fn register<F, Fut>(&self, component: Component, load: F) -> Arc<Component>
    where
        F: Fn(ComponentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let component = Arc::new(component);
        let entry = Entry {
            component: component.clone(),
            load: lifecycle(load),
        };

        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.component.code == component.code) {
            Some(existing) => {
                warn!("Component {} registered twice, replacing it", component.code);
                *existing = entry;
            }
            None => entries.push(entry),
        }

        entries.sort_by(|a, b| {
            b.component
                .is_core()
                .cmp(&a.component.is_core())
                .then(b.component.load_priority.cmp(&a.component.load_priority))
        });

        component
    }

    /// Components in load order.
    pub fn components(&self) -> Vec<Arc<Component>> {
        self.entries.read().iter().map(|e| e.component.clone()).collect()
    }

    pub fn get(&self, code: &str) -> Option<Arc<Component>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.component.code == code)
            .map(|e| e.component.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Mirror every declared component into the database and mark it
    /// as available in this build.
    pub async fn sync_registered_components(&self, entities: &EntityManager) {
        let repository = entities.registered_components();

        for component in self.components() {
            let result = match repository.get(component.code).await {
                Ok(mut existing) => {
                    if existing.name != component.name
                        || existing.description != component.description
                        || existing.default_enabled != component.default_enabled
                    {
                        existing.name = component.name.to_string();
                        existing.description = component.description.to_string();
                        existing.default_enabled = component.default_enabled;
                        debug!(component = component.code, "Updating registered component");
                        repository.save(&mut existing).await
                    } else {
                        Ok(())
                    }
                }
                Err(e) if e.is_not_found() => {
                    let mut registered = RegisteredComponent {
                        code: component.code.to_string(),
                        name: component.name.to_string(),
                        description: component.description.to_string(),
                        default_enabled: component.default_enabled,
                        ..Default::default()
                    };
                    repository.create(&mut registered).await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!(component = component.code, "Failed to register component in database: {}", e);
                continue;
            }

            repository.mark_as_available(component.code);
        }
    }

    /// Run every load hook in order, then reconcile global commands.
    ///
    /// A failing component is logged and stays unloaded.
    pub async fn load(&self, state: &AppState) {
        info!("Starting component load sequence...");

        let entries: Vec<(Arc<Component>, LifecycleFn)> = self
            .entries
            .read()
            .iter()
            .map(|e| (e.component.clone(), e.load.clone()))
            .collect();

        for (component, load) in entries {
            debug!(component = component.code, "Loading component");
            let ctx = ComponentContext::new(component.clone(), state.clone());

            match load(ctx).await {
                Ok(()) => {
                    component.set_loaded(true);
                    info!(component = component.code, "Loaded component {}", component.name);
                }
                Err(e) => {
                    component.set_loaded(false);
                    error!(component = component.code, "Failed to load component: {:#}", e);

                    // Registrations made before the failure die with it.
                    let handlers = state.handlers.unregister_all(state.session.as_ref(), component.code);
                    let commands = state.commands.unregister_all(component.code);
                    if handlers + commands > 0 {
                        debug!(
                            component = component.code,
                            "Dropped {} handlers and {} commands of failed component", handlers, commands
                        );
                    }
                }
            }
        }

        info!("Component load sequence completed");
        state
            .commands
            .sync(state.session.as_ref(), &CommandScope::Global)
            .await;
    }

    /// Unload loaded components in reverse order.
    pub async fn unload(&self, state: &AppState) {
        info!("Starting component unload sequence...");

        let components: Vec<Arc<Component>> = self.components().into_iter().rev().collect();
        for component in components {
            if !component.is_loaded() {
                debug!(component = component.code, "Component not loaded, skipping unload");
                continue;
            }

            if let Some(unload) = component.unload.clone() {
                let ctx = ComponentContext::new(component.clone(), state.clone());
                if let Err(e) = unload(ctx).await {
                    warn!(component = component.code, "Unload hook failed: {:#}", e);
                }
            }

            let removed = state.handlers.unregister_all(state.session.as_ref(), component.code);
            state.commands.unregister_all(component.code);
            component.set_loaded(false);

            info!(component = component.code, "Unloaded component ({} handlers removed)", removed);
        }

        info!("Unload sequence completed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::bot::testing::app_state;
    use crate::platform::{EventKind, Ready};

    fn declare(registry: &ComponentRegistry, code: &'static str, priority: i32) {
        registry.register(Component::new(code, code).load_priority(priority), |_| async {
            Ok(())
        });
    }

    fn codes(registry: &ComponentRegistry) -> Vec<&'static str> {
        registry.components().iter().map(|c| c.code).collect()
    }

    #[test]
    fn test_core_components_precede_features() {
        let registry = ComponentRegistry::new();
        declare(&registry, "component1", 0);
        declare(&registry, "bot_component2", 0);
        declare(&registry, "component3", 0);
        declare(&registry, "bot_component4", 0);

        assert_eq!(
            codes(&registry),
            vec!["bot_component2", "bot_component4", "component1", "component3"]
        );
    }

    #[test]
    fn test_priority_orders_within_tier() {
        let registry = ComponentRegistry::new();
        declare(&registry, "bot_a", -99);
        declare(&registry, "b", -999);
        declare(&registry, "bot_c", 0);
        declare(&registry, "d", 9999);
        declare(&registry, "bot_e", 9999);
        declare(&registry, "f", 0);

        assert_eq!(codes(&registry), vec!["bot_e", "bot_c", "bot_a", "d", "f", "b"]);
    }

    #[test]
    fn test_ordering_invariant_holds_for_any_sequence() {
        let registry = ComponentRegistry::new();
        let declared: [(&'static str, i32); 8] = [
            ("x1", 3),
            ("bot_y1", -4),
            ("x2", 3),
            ("bot_y2", 7),
            ("x3", -1),
            ("bot_y3", 7),
            ("x4", 10),
            ("bot_y4", 0),
        ];
        for (code, priority) in declared {
            declare(&registry, code, priority);
        }

        let ordered = registry.components();
        for pair in ordered.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.is_core() == b.is_core() {
                assert!(a.load_priority >= b.load_priority, "{a:?} before {b:?}");
            } else {
                assert!(a.is_core(), "feature {a:?} before core {b:?}");
            }
        }
        assert_eq!(
            codes(&registry)[..3],
            ["bot_y2", "bot_y3", "bot_y4"],
            "equal priorities keep registration order"
        );
    }

    #[test]
    fn test_duplicate_code_replaces_declaration() {
        let registry = ComponentRegistry::new();
        declare(&registry, "dup", 0);
        declare(&registry, "other", 5);
        declare(&registry, "dup", 10);

        assert_eq!(registry.len(), 2);
        assert_eq!(codes(&registry), vec!["dup", "other"]);
    }

    #[tokio::test]
    async fn test_sync_registered_components_marks_available() {
        let (state, _session) = app_state().await;
        state.components.register(
            Component::new("ping_pong", "Ping Pong").default_enabled(true),
            |_| async { Ok(()) },
        );
        state
            .components
            .sync_registered_components(&state.entities)
            .await;

        let stored = state.entities.registered_components().get("ping_pong").await.unwrap();
        assert!(stored.default_enabled);
        assert_eq!(
            state.entities.registered_components().available_codes(),
            vec!["ping_pong"]
        );

        // A changed declaration updates the stored row.
        state.components.register(
            Component::new("ping_pong", "Ping Pong").description("Replies to ping"),
            |_| async { Ok(()) },
        );
        state
            .components
            .sync_registered_components(&state.entities)
            .await;
        let stored = state.entities.registered_components().get("ping_pong").await.unwrap();
        assert_eq!(stored.description, "Replies to ping");
        assert!(!stored.default_enabled);
    }

    #[tokio::test]
    async fn test_failed_load_continues_and_unload_tears_down() {
        let (state, session) = app_state().await;
        let unloaded = Arc::new(AtomicUsize::new(0));

        let counter = unloaded.clone();
        let good = state.components.register(
            Component::new("bot_good", "Good").on_unload(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            |ctx: ComponentContext| async move {
                ctx.handlers()
                    .register("on_ready", |_, _: Ready| async { Ok(()) })?;
                Ok(())
            },
        );
        let bad = state.components.register(Component::new("bad", "Bad"), |_| async {
            anyhow::bail!("broken")
        });

        state.components.load(&state).await;

        assert!(good.is_loaded());
        assert!(!bad.is_loaded());
        assert_eq!(session.handler_count(EventKind::Ready), 1);

        state.components.unload(&state).await;

        assert!(!good.is_loaded());
        assert_eq!(unloaded.load(Ordering::SeqCst), 1);
        assert_eq!(session.handler_count(EventKind::Ready), 0);
        assert!(state.handlers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_drops_partial_registrations() {
        use crate::commands::Command;
        use crate::platform::{ApplicationCommand, Interaction, PlatformSession};

        let (state, session) = app_state().await;
        let broken = state.components.register(
            Component::new("half_done", "Half Done"),
            |ctx: ComponentContext| async move {
                ctx.handlers()
                    .register("on_ready", |_, _: Ready| async { Ok(()) })?;
                ctx.commands().register(Command::new(
                    ApplicationCommand::new("half", "Never published"),
                    |_: Arc<dyn PlatformSession>, _: Interaction| async { Ok(()) },
                ))?;
                anyhow::bail!("broken after registering")
            },
        );

        state.components.load(&state).await;

        assert!(!broken.is_loaded());
        assert!(state.handlers.is_empty());
        assert!(state.commands.get("half").is_none());
        assert_eq!(session.handler_count(EventKind::Ready), 0);
        assert!(session.command_names(&CommandScope::Global).is_empty());
    }
}
