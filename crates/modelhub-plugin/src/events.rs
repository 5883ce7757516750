// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle event publication over a tokio broadcast channel.

use async_trait::async_trait;
use modelhub_core::{EventPublisher, HubError, LifecycleEvent};
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity. Slow subscribers past this lag and skip events.
const DEFAULT_CAPACITY: usize = 64;

/// Fans lifecycle events out to every current subscriber.
///
/// Publishing with no subscribers succeeds; the event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: LifecycleEvent) -> Result<(), HubError> {
        match self.sender.send(event) {
            Ok(receivers) => trace!(receivers, "lifecycle event published"),
            Err(broadcast::error::SendError(event)) => {
                trace!(kind = %event.kind, plugin_id = %event.plugin_id, "no lifecycle subscribers")
            }
        }
        Ok(())
    }
}
