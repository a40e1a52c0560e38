//! State machine for a project's deployment lifecycle
//!
//! The state machine defines:
//! - Valid states
//! - Events that trigger transitions
//! - Guard conditions for transitions
//!
//! The machine is pure; the deployment service applies it while holding the
//! per-project exclusive section so that state and served content never
//! disagree.

use thiserror::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot transition from {from} to {to} via {event}")]
    InvalidTransition {
        from: String,
        to: String,
        event: String,
    },

    #[error("Guard condition failed: {0}")]
    GuardFailed(String),
}

// ============================================================================
// Deployment State Machine
// ============================================================================

/// Deployment states of a project's pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentState {
    /// No content has ever been published, or it was removed
    NoDeployment,
    /// A publish attempt is in flight
    Deploying,
    /// A deployment is active and its content is servable
    Deployed,
}

impl DeploymentState {
    /// Check if this is a terminal state (the lifecycle has none)
    pub fn is_terminal(&self) -> bool {
        false
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [DeploymentState] {
        match self {
            Self::NoDeployment => &[Self::Deploying],
            Self::Deploying => &[Self::Deployed, Self::NoDeployment],
            Self::Deployed => &[Self::Deploying, Self::NoDeployment],
        }
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDeployment => write!(f, "no_deployment"),
            Self::Deploying => write!(f, "deploying"),
            Self::Deployed => write!(f, "deployed"),
        }
    }
}

/// Events that trigger deployment state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeploymentEvent {
    /// A publish request was accepted and validation/extraction started
    RequestPublish,
    /// The atomic content swap completed
    PublishSucceeded,
    /// Validation or extraction failed before the swap
    PublishFailed,
    /// The owner removed the published content
    Remove,
}

impl std::fmt::Display for DeploymentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestPublish => write!(f, "request_publish"),
            Self::PublishSucceeded => write!(f, "publish_succeeded"),
            Self::PublishFailed => write!(f, "publish_failed"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Guard context for deployment transitions
#[derive(Debug, Clone)]
pub struct DeploymentGuardContext {
    /// Whether a previously-published deployment is still live; a failed
    /// publish falls back to it instead of clearing the deployed state
    pub has_prior_deployment: bool,
}

/// Deployment state machine
pub struct DeploymentStateMachine;

impl DeploymentStateMachine {
    /// Attempt a state transition with guard conditions
    pub fn transition(
        current: DeploymentState,
        event: DeploymentEvent,
        context: Option<&DeploymentGuardContext>,
    ) -> Result<DeploymentState, StateError> {
        let next = match (&current, &event) {
            // Publishing can start whether or not content is live
            (DeploymentState::NoDeployment, DeploymentEvent::RequestPublish) => {
                DeploymentState::Deploying
            }
            (DeploymentState::Deployed, DeploymentEvent::RequestPublish) => {
                DeploymentState::Deploying
            }

            // From Deploying
            (DeploymentState::Deploying, DeploymentEvent::PublishSucceeded) => {
                DeploymentState::Deployed
            }
            (DeploymentState::Deploying, DeploymentEvent::PublishFailed) => {
                // Guard: prior live content stays served after a failure
                match context {
                    Some(ctx) if ctx.has_prior_deployment => DeploymentState::Deployed,
                    _ => DeploymentState::NoDeployment,
                }
            }

            // Removal only makes sense for live content
            (DeploymentState::Deployed, DeploymentEvent::Remove) => DeploymentState::NoDeployment,

            // Invalid transitions
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    to: "unknown".to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(
        current: DeploymentState,
        event: &DeploymentEvent,
        context: Option<&DeploymentGuardContext>,
    ) -> bool {
        Self::transition(current, *event, context).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
