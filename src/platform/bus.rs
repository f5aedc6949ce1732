//! Per-kind callback bookkeeping shared by session implementations.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, trace};

use super::{Event, EventCallback, EventKind, PlatformSession};

/// Handle returned when a callback is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Attached {
    id: HandlerId,
    callback: EventCallback,
    once: bool,
}

/// Callbacks attached to a session, grouped by event kind.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: DashMap<EventKind, Vec<Attached>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: EventKind, callback: EventCallback, once: bool) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .entry(kind)
            .or_default()
            .push(Attached { id, callback, once });
        id
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|attached| attached.id != id);
            if entry.len() != before {
                return true;
            }
        }
        false
    }

    /// Number of callbacks attached for a kind.
    pub fn len(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, |h| h.len())
    }

    /// Run every callback of the event's kind on its own task.
    ///
    /// Once-callbacks are detached before they run. A panicking callback
    /// is logged and does not affect the others.
    pub fn dispatch(&self, session: Arc<dyn PlatformSession>, event: Event) -> Vec<JoinHandle<()>> {
        let kind = event.kind();
        let callbacks: Vec<EventCallback> = match self.handlers.get_mut(&kind) {
            Some(mut attached) => {
                let callbacks = attached.iter().map(|a| a.callback.clone()).collect();
                attached.retain(|a| !a.once);
                callbacks
            }
            None => return Vec::new(),
        };

        trace!("Dispatching {} to {} callbacks", kind.as_str(), callbacks.len());

        callbacks
            .into_iter()
            .map(|callback| {
                let session = session.clone();
                let event = event.clone();
                tokio::spawn(async move {
                    let run = AssertUnwindSafe(async move { callback(session, event).await });
                    if let Err(panic) = run.catch_unwind().await {
                        error!("Event handler for {} panicked: {}", kind.as_str(), panic_message(&panic));
                    }
                })
            })
            .collect()
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
