//! Presence rotation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::platform::{BotStatus, PlatformSession};

#[derive(Default)]
struct Rotation {
    statuses: Vec<BotStatus>,
    cursor: usize,
}

/// Round-robin list of presences.
#[derive(Default)]
pub struct StatusRotator {
    rotation: Mutex<Rotation>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StatusRotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, status: BotStatus) {
        self.rotation.lock().statuses.push(status);
    }

    /// The status under the cursor, advancing it. `None` when empty.
    pub fn next(&self) -> Option<BotStatus> {
        let mut rotation = self.rotation.lock();
        if rotation.statuses.is_empty() {
            return None;
        }

        if rotation.cursor >= rotation.statuses.len() {
            rotation.cursor = 0;
        }
        let status = rotation.statuses[rotation.cursor].clone();
        rotation.cursor = (rotation.cursor + 1) % rotation.statuses.len();

        Some(status)
    }

    pub fn len(&self) -> usize {
        self.rotation.lock().statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotation.lock().statuses.is_empty()
    }

    /// Push the next status every `interval`, starting immediately.
    ///
    /// Returns `false` when the rotation is already running.
    pub fn start(self: &Arc<Self>, session: Arc<dyn PlatformSession>, interval: Duration) -> bool {
        let mut task = self.task.lock();
        if task.is_some() {
            return false;
        }

        let rotator = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;

                let Some(status) = rotator.next() else {
                    info!("No bot status registered, nothing to rotate");
                    continue;
                };
                match session.update_presence(&status).await {
                    Ok(()) => debug!("Bot status changed to {:?}", status.content),
                    Err(e) => warn!("Failed to update bot status: {}", e),
                }
            }
        }));

        true
    }

    /// Stop the rotation task. Returns whether it was running.
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}
