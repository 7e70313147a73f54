//! Nanba: a voice-driven desktop automation agent
//!
//! Spoken (or typed) commands are normalized, matched against an ordered rule
//! list, turned into an automation plan and executed against the desktop.

pub mod action;
pub mod capture;
pub mod config;
pub mod error;
pub mod executor;
pub mod input;
pub mod intent;
pub mod launcher;
pub mod normalize;
pub mod render;
pub mod session;
pub mod state;
pub mod transcriber;
pub mod tts;
pub mod vad;

pub use action::{ActionRequest, AutomationStep, KeyName};
pub use config::Config;
pub use error::{AgentError, AutomationError};
pub use executor::{Executor, Outcome, Pause};
pub use intent::{Classification, Classifier, Intent};
pub use normalize::{Utterance, normalize};
pub use render::{AgentEvent, Renderer, Role, Ui};
pub use session::{Agent, Collaborators, SessionLoop};
pub use state::{SessionPhase, SessionState, SharedState};
