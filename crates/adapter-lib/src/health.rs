//! Health check infrastructure for the metrics adapter
//!
//! Liveness and readiness are derived from the adapter lifecycle state:
//! the process is live unless startup failed, and ready only while it is
//! serving queries.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Adapter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Created,
    Configuring,
    Running,
    Stopped,
    /// Startup or serving failed; terminal
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Configuring => "configuring",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        matches!(
            (self, next),
            (Created, Configuring)
                | (Configuring, Running)
                | (Running, Stopped)
                | (Created | Configuring | Running, Failed)
        )
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, LifecycleState::Failed)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Running)
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_transition_timestamp: i64,
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
struct StateRecord {
    state: LifecycleState,
    message: Option<String>,
    since: i64,
}

impl StateRecord {
    fn new(state: LifecycleState, message: Option<String>) -> Self {
        Self {
            state,
            message,
            since: chrono::Utc::now().timestamp(),
        }
    }
}

/// Registry tracking the adapter lifecycle state
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<watch::Sender<StateRecord>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StateRecord::new(LifecycleState::Created, None));
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.borrow().state
    }

    /// Move to `next`, returning the previous state.
    ///
    /// Returns `None` and leaves the state untouched if the transition is
    /// not allowed.
    pub fn transition(&self, next: LifecycleState) -> Option<LifecycleState> {
        let mut previous = None;
        self.state.send_if_modified(|record| {
            if !record.state.can_transition_to(next) {
                return false;
            }
            previous = Some(record.state);
            *record = StateRecord::new(next, None);
            true
        });
        previous
    }

    /// Record a fatal failure
    pub fn fail(&self, message: impl Into<String>) -> Option<LifecycleState> {
        let message = message.into();
        let mut previous = None;
        self.state.send_if_modified(|record| {
            if !record.state.can_transition_to(LifecycleState::Failed) {
                return false;
            }
            previous = Some(record.state);
            *record = StateRecord::new(LifecycleState::Failed, Some(message));
            true
        });
        previous
    }

    /// Wait until the lifecycle reaches `target`.
    ///
    /// Returns the state actually reached, which is `Failed` if startup
    /// aborted first.
    pub async fn wait_for(&self, target: LifecycleState) -> LifecycleState {
        let mut rx = self.state.subscribe();
        let reached = match rx
            .wait_for(|record| record.state == target || record.state == LifecycleState::Failed)
            .await
        {
            Ok(record) => record.state,
            Err(_) => self.state(),
        };
        reached
    }

    pub fn health(&self) -> HealthResponse {
        let record = self.state.borrow().clone();
        HealthResponse {
            status: if record.state.is_live() { "ok" } else { "failed" },
            state: record.state,
            message: record.message,
            last_transition_timestamp: record.since,
        }
    }

    pub fn readiness(&self) -> ReadinessResponse {
        let state = self.state();
        if state.is_ready() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Adapter is {}", state.as_str())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let registry = HealthRegistry::new();
        assert_eq!(registry.state(), LifecycleState::Created);

        let health = registry.health();
        assert_eq!(health.status, "ok");
        assert!(!registry.readiness().ready);
    }

    #[test]
    fn test_full_lifecycle() {
        let registry = HealthRegistry::new();

        assert_eq!(
            registry.transition(LifecycleState::Configuring),
            Some(LifecycleState::Created)
        );
        assert!(!registry.readiness().ready);

        registry.transition(LifecycleState::Running);
        assert!(registry.readiness().ready);

        registry.transition(LifecycleState::Stopped);
        let readiness = registry.readiness();
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Adapter is stopped"));
        assert_eq!(registry.health().status, "ok");
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let registry = HealthRegistry::new();

        assert_eq!(registry.transition(LifecycleState::Running), None);
        assert_eq!(registry.state(), LifecycleState::Created);
    }

    #[test]
    fn test_failure_is_terminal() {
        let registry = HealthRegistry::new();
        registry.transition(LifecycleState::Configuring);

        assert_eq!(
            registry.fail("bad bind address"),
            Some(LifecycleState::Configuring)
        );
        let health = registry.health();
        assert_eq!(health.status, "failed");
        assert_eq!(health.message.as_deref(), Some("bad bind address"));

        assert_eq!(registry.transition(LifecycleState::Running), None);
        assert_eq!(registry.fail("again"), None);
    }

    #[tokio::test]
    async fn test_wait_for_state() {
        let registry = HealthRegistry::new();
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_for(LifecycleState::Running).await })
        };

        registry.transition(LifecycleState::Configuring);
        registry.transition(LifecycleState::Running);

        assert_eq!(waiter.await.unwrap(), LifecycleState::Running);
    }

    #[tokio::test]
    async fn test_wait_for_returns_on_failure() {
        let registry = HealthRegistry::new();
        registry.fail("boom");

        assert_eq!(
            registry.wait_for(LifecycleState::Running).await,
            LifecycleState::Failed
        );
    }

    #[tokio::test]
    async fn test_wait_for_state_already_reached() {
        let registry = HealthRegistry::new();
        registry.transition(LifecycleState::Configuring);

        assert_eq!(
            registry.wait_for(LifecycleState::Configuring).await,
            LifecycleState::Configuring
        );
    }
}
