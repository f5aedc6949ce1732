//! Handler bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::HandlerError;
use crate::components::Component;
use crate::platform::{Event, EventKind, HandlerId, PlatformSession};

/// Type-erased handler step: receives the raw event.
pub type HandlerFn = Arc<
    dyn Fn(Arc<dyn PlatformSession>, Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync,
>;

/// Wraps the rest of the chain; call `next` to continue.
pub type Decorator = Arc<
    dyn Fn(Arc<dyn PlatformSession>, Event, HandlerFn) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// A registered handler and its composed decorator chain.
pub struct AssignedEventHandler {
    pub name: String,
    pub owner: Arc<Component>,
    pub kind: EventKind,
    pub once: bool,
    callback: HandlerFn,
    decorators: Mutex<Vec<Decorator>>,
    chain: RwLock<HandlerFn>,
    platform_id: Mutex<Option<HandlerId>>,
    fired: AtomicBool,
}

impl AssignedEventHandler {
    pub(super) fn new(
        name: String,
        owner: Arc<Component>,
        kind: EventKind,
        once: bool,
        callback: HandlerFn,
    ) -> Self {
        Self {
            name,
            owner,
            kind,
            once,
            chain: RwLock::new(callback.clone()),
            callback,
            decorators: Mutex::new(Vec::new()),
            platform_id: Mutex::new(None),
            fired: AtomicBool::new(false),
        }
    }

    /// Current decorator chain around the callback.
    pub(super) fn chain(&self) -> HandlerFn {
        self.chain.read().clone()
    }

    /// Append a decorator and recompose the chain.
    pub(super) fn add_decorator(&self, decorator: Decorator) {
        let mut decorators = self.decorators.lock();
        decorators.push(decorator);

        let mut chain = self.callback.clone();
        for decorator in decorators.iter().rev() {
            let decorator = decorator.clone();
            let next = chain;
            chain = Arc::new(move |session: Arc<dyn PlatformSession>, event: Event| {
                decorator(session, event, next.clone())
            });
        }

        *self.chain.write() = chain;
    }

    /// Claim the single invocation of a once handler.
    pub(super) fn claim(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }

    pub(super) fn set_platform_id(&self, id: HandlerId) {
        *self.platform_id.lock() = Some(id);
    }

    fn detach(&self, session: &dyn PlatformSession) {
        if let Some(id) = self.platform_id.lock().take() {
            session.remove_handler(id);
        }
    }
}

/// Process-wide table of handlers by qualified name.
#[derive(Default)]
pub struct HandlerTable {
    handlers: RwLock<HashMap<String, Arc<AssignedEventHandler>>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn insert(&self, handler: Arc<AssignedEventHandler>) -> Result<(), HandlerError> {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&handler.name) {
            return Err(HandlerError::AlreadyRegistered(handler.name.clone()));
        }
        handlers.insert(handler.name.clone(), handler);
        Ok(())
    }

    /// Drop a row without touching the platform.
    pub(super) fn take(&self, name: &str) -> Option<Arc<AssignedEventHandler>> {
        self.handlers.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<AssignedEventHandler>> {
        self.handlers.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Remove a handler and detach it from the session.
    pub fn unregister(&self, session: &dyn PlatformSession, name: &str) -> Result<(), HandlerError> {
        let handler = self
            .take(name)
            .ok_or_else(|| HandlerError::NotFound(name.to_string()))?;
        handler.detach(session);
        debug!(component = handler.owner.code, "Unregistered event handler {}", name);
        Ok(())
    }

    /// Remove every handler of a component. Returns how many were removed.
    pub fn unregister_all(&self, session: &dyn PlatformSession, code: &str) -> usize {
        let removed: Vec<Arc<AssignedEventHandler>> = {
            let mut handlers = self.handlers.write();
            let names: Vec<String> = handlers
                .values()
                .filter(|h| h.owner.code == code)
                .map(|h| h.name.clone())
                .collect();
            names.iter().filter_map(|name| handlers.remove(name)).collect()
        };

        for handler in &removed {
            handler.detach(session);
        }
        removed.len()
    }
}
