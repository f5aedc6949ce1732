use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use tracing::{debug, error, trace};

use super::handler::{AssignedEventHandler, Decorator, HandlerFn, HandlerTable};
use super::{HandlerError, MessageMatcher};
use crate::components::{Component, is_enabled};
use crate::database::EntityManager;
use crate::platform::{
    Event, EventKind, EventPayload, Message, PlatformSession, event_callback,
};
use crate::utils::snake_case;

/// Event handler registration on behalf of one component.
#[derive(Clone)]
pub struct HandlerManager {
    component: Arc<Component>,
    table: Arc<HandlerTable>,
    session: Arc<dyn PlatformSession>,
    entities: Arc<EntityManager>,
}

impl HandlerManager {
    pub fn new(
        component: Arc<Component>,
        table: Arc<HandlerTable>,
        session: Arc<dyn PlatformSession>,
        entities: Arc<EntityManager>,
    ) -> Self {
        Self {
            component,
            table,
            session,
            entities,
        }
    }

    /// Table key of a handler of this component.
    pub fn qualified_name(&self, name: &str) -> String {
        format!("{}_{}", snake_case(self.component.name), snake_case(name))
    }

    /// Register a durable handler for the event kind of `E`.
    ///
    /// Returns the qualified name.
    pub fn register<E, F, Fut>(&self, name: &str, callback: F) -> Result<String, HandlerError>
    where
        E: EventPayload,
        F: Fn(Arc<dyn PlatformSession>, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.attach(name, E::KIND, typed(callback), None, false)
    }

    /// Register a handler that runs at most once and then removes itself.
    pub fn register_once<E, F, Fut>(&self, name: &str, callback: F) -> Result<String, HandlerError>
    where
        E: EventPayload,
        F: Fn(Arc<dyn PlatformSession>, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.attach(name, E::KIND, typed(callback), None, true)
    }

    /// Register a message handler firing when the content equals one of
    /// the literals.
    pub fn register_simple_message_handler<F, Fut, S>(
        &self,
        name: &str,
        callback: F,
        literals: &[S],
    ) -> Result<String, HandlerError>
    where
        F: Fn(Arc<dyn PlatformSession>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        S: AsRef<str>,
    {
        let matcher = MessageMatcher::literals(literals);
        self.attach(name, EventKind::MessageCreate, typed(callback), Some(matcher), false)
    }

    /// Register a message handler firing when any pattern matches the
    /// content. An invalid pattern fails the registration.
    #[allow(dead_code)]
    pub fn register_complex_message_handler<F, Fut, S>(
        &self,
        name: &str,
        callback: F,
        patterns: &[S],
    ) -> Result<String, HandlerError>
    where
        F: Fn(Arc<dyn PlatformSession>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        S: AsRef<str>,
    {
        let matcher = MessageMatcher::patterns(patterns)?;
        self.attach(name, EventKind::MessageCreate, typed(callback), Some(matcher), false)
    }

    /// Wrap a handler of this component. Decorators run in the order they
    /// were added and call `next` to continue the chain.
    pub fn add_decorator<F, Fut>(&self, name: &str, decorator: F) -> Result<(), HandlerError>
    where
        F: Fn(Arc<dyn PlatformSession>, Event, HandlerFn) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let qualified = self.qualified_name(name);
        let handler = self
            .table
            .get(&qualified)
            .ok_or_else(|| HandlerError::NotFound(qualified.clone()))?;

        let decorator: Decorator = Arc::new(
            move |session: Arc<dyn PlatformSession>,
                  event: Event,
                  next: HandlerFn|
                  -> BoxFuture<'static, anyhow::Result<()>> {
                decorator(session, event, next).boxed()
            },
        );
        handler.add_decorator(decorator);

        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), HandlerError> {
        self.table
            .unregister(self.session.as_ref(), &self.qualified_name(name))
    }

    /// Drop every handler of this component.
    pub fn unregister_all(&self) -> usize {
        self.table
            .unregister_all(self.session.as_ref(), self.component.code)
    }

    fn attach(
        &self,
        name: &str,
        kind: EventKind,
        callback: HandlerFn,
        matcher: Option<MessageMatcher>,
        once: bool,
    ) -> Result<String, HandlerError> {
        let qualified = self.qualified_name(name);
        let handler = Arc::new(AssignedEventHandler::new(
            qualified.clone(),
            self.component.clone(),
            kind,
            once,
            callback,
        ));
        self.table.insert(handler.clone())?;

        let table = self.table.clone();
        let entities = self.entities.clone();
        let bound = handler.clone();
        let matcher = matcher.map(Arc::new);

        let callback = event_callback(move |session: Arc<dyn PlatformSession>, event: Event| {
            let handler = bound.clone();
            let table = table.clone();
            let entities = entities.clone();
            let matcher = matcher.clone();

            async move {
                if handler.once {
                    if !handler.claim() {
                        return;
                    }
                    table.take(&handler.name);
                }

                if let Some(matcher) = matcher {
                    let Some(message) = event.message() else {
                        return;
                    };
                    if !accepts(session.as_ref(), message, &matcher) {
                        return;
                    }
                }

                let code = handler.owner.code;
                if !is_enabled(&entities, &handler.owner, event.guild_id()).await {
                    trace!(component = code, "Skipping {}: component disabled", handler.name);
                    return;
                }

                let chain = handler.chain();
                if let Err(e) = chain(session, event).await {
                    error!(component = code, "Event handler {} failed: {:#}", handler.name, e);
                }
            }
        });

        let id = if once {
            self.session.add_handler_once(kind, callback)
        } else {
            self.session.add_handler(kind, callback)
        };
        handler.set_platform_id(id);

        debug!(
            component = self.component.code,
            "Registered {} handler {}",
            kind.as_str(),
            qualified
        );

        Ok(qualified)
    }
}

/// Message filter: content must match, bots and the bot itself are ignored.
fn accepts(session: &dyn PlatformSession, message: &Message, matcher: &MessageMatcher) -> bool {
    if message.author.bot {
        return false;
    }
    if let Some(me) = session.current_user() {
        if me.id == message.author.id {
            return false;
        }
    }
    matcher.matches(&message.content)
}

fn typed<E, F, Fut>(callback: F) -> HandlerFn
where
    E: EventPayload,
    F: Fn(Arc<dyn PlatformSession>, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(
        move |session: Arc<dyn PlatformSession>, event: Event| -> BoxFuture<'static, anyhow::Result<()>> {
            match E::from_event(event) {
                Some(payload) => callback(session, payload).boxed(),
                None => ready(Ok(())).boxed(),
            }
        },
    )
}
