use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{ComponentContext, is_core_code};

/// Load or unload hook of a component.
pub type LifecycleFn =
    Arc<dyn Fn(ComponentContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Grouping shown in the admin API and command listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Internal,
    Administration,
    Moderation,
    Utilities,
    Fun,
    Information,
}

/// Declaration of a component.
pub struct Component {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub categories: Vec<Category>,
    /// Higher loads earlier within its tier.
    pub load_priority: i32,
    /// Whether guilds get the component enabled when the bot joins.
    pub default_enabled: bool,
    pub(super) unload: Option<LifecycleFn>,
    loaded: AtomicBool,
}

impl Component {
    pub fn new(code: &'static str, name: &'static str) -> Self {
        Self {
            code,
            name,
            description: "",
            categories: Vec::new(),
            load_priority: 0,
            default_enabled: false,
            unload: None,
            loaded: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    #[must_use]
    pub fn load_priority(mut self, priority: i32) -> Self {
        self.load_priority = priority;
        self
    }

    #[must_use]
    pub fn default_enabled(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }

    /// Hook invoked on shutdown, before handlers and commands are torn down.
    #[must_use]
    pub fn on_unload<F, Fut>(mut self, unload: F) -> Self
    where
        F: Fn(ComponentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.unload = Some(lifecycle(unload));
        self
    }

    pub fn is_core(&self) -> bool {
        is_core_code(self.code)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(super) fn set_loaded(&self, loaded: bool) {
        self.loaded.store(loaded, Ordering::Release);
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("code", &self.code)
            .field("load_priority", &self.load_priority)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

pub(super) fn lifecycle<F, Fut>(f: F) -> LifecycleFn
where
    F: Fn(ComponentContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(
        move |ctx: ComponentContext| -> BoxFuture<'static, anyhow::Result<()>> { f(ctx).boxed() },
    )
}
