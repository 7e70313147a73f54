//! Error types shared across the agent
//!
//! Capture failures never leave the capture module (they collapse to "no utterance"),
//! so only automation and agent lifecycle errors are public.

use thiserror::Error;

/// Failure while driving the desktop: simulated input, clipboard or app launch.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("input simulation failed: {0}")]
    Input(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("failed to launch {target}: {source}")]
    Launch {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure starting or running the agent itself.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to spawn session worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("failed to initialise {component}: {reason}")]
    Init {
        component: &'static str,
        reason: String,
    },
}

impl AgentError {
    pub fn init(component: &'static str, reason: impl ToString) -> Self {
        AgentError::Init {
            component,
            reason: reason.to_string(),
        }
    }
}
