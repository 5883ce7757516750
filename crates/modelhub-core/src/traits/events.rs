// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle event publication.

use async_trait::async_trait;

use crate::error::HubError;
use crate::types::LifecycleEvent;

/// Receives plugin lifecycle events.
///
/// Delivery is best-effort: the plugin manager logs and discards publication
/// errors, so a failing publisher never rolls back a transition.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish(&self, event: LifecycleEvent) -> Result<(), HubError>;
}
