//! Service lifecycle state management.
//!
//! [`ServiceHandle`] tracks where a long-running relay is in its lifecycle
//! and lets other tasks wait for it to come up or wind down.
//!
//! # Usage
//!
//! ```rust
//! use hop_client_core::service::{ServiceHandle, ServiceState};
//!
//! let handle = ServiceHandle::new("hop-producer");
//! assert_eq!(handle.state(), ServiceState::Stopped);
//!
//! handle.set_state(ServiceState::Starting);
//! handle.set_state(ServiceState::Ready);
//! assert!(handle.state().is_ready());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::{Error, Result};

// ============================================================================
// ServiceState
// ============================================================================

/// Where a relay is in its lifecycle.
///
/// `Stopped -> Starting -> Ready -> Stopping -> Stopped`, with `Failed`
/// reachable from `Starting` and `Ready`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceState {
    /// Service has not been started, or has shut down cleanly.
    Stopped,
    /// Service is creating its producer and opening streams.
    Starting,
    /// Service is relaying messages.
    Ready,
    /// Service is shutting down.
    Stopping,
    /// Service hit a fatal error.
    Failed(String),
}

impl ServiceState {
    /// The relay is running.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Nothing more will happen without another `start`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_))
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Failed(reason) => return write!(f, "failed: {reason}"),
        };
        f.write_str(label)
    }
}

// ============================================================================
// ServiceHandle
// ============================================================================

/// Shared view of one relay's lifecycle.
///
/// Clones observe the same state; every transition is logged and pushed to
/// subscribers.
#[derive(Clone)]
pub struct ServiceHandle {
    name: Arc<str>,
    state: Arc<watch::Sender<ServiceState>>,
}

impl ServiceHandle {
    /// A handle named `name`, starting out [`ServiceState::Stopped`].
    pub fn new(name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ServiceState::Stopped);
        Self {
            name: Arc::from(name.into()),
            state: Arc::new(state),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        self.state.borrow().clone()
    }

    /// Move to `state`.
    pub fn set_state(&self, state: ServiceState) {
        let previous = self.state.send_replace(state.clone());
        tracing::info!(
            service = %self.name,
            from = %previous,
            to = %state,
            "Service state changed"
        );
    }

    /// Receiver that sees every later transition.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Wait for [`ServiceState::Ready`].
    ///
    /// Fails if the service reaches [`ServiceState::Failed`] first or
    /// `timeout` passes.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.subscribe();
        let reached = tokio::time::timeout(
            timeout,
            rx.wait_for(|s| s.is_ready() || matches!(s, ServiceState::Failed(_))),
        )
        .await
        .map_err(|_| {
            Error::service(
                self.name(),
                format!("not ready after {timeout:?} (state: {})", self.state()),
            )
        })?
        .map_err(|_| Error::service(self.name(), "state channel closed"))?
        .clone();

        match reached {
            ServiceState::Failed(reason) => {
                Err(Error::service(self.name(), format!("failed: {reason}")))
            }
            _ => Ok(()),
        }
    }

    /// Wait for a terminal state and return it.
    pub async fn wait_terminal(&self) -> ServiceState {
        let mut rx = self.subscribe();
        match rx.wait_for(ServiceState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
