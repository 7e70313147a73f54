//! Runs automation plans against the desktop collaborators
//!
//! Steps run strictly in order on the calling thread. There is no rollback: if a
//! step fails, whatever already happened (an app launched, a name typed) stays.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::action::{ActionRequest, AutomationStep};
use crate::config::Config;
use crate::error::AutomationError;
use crate::input::InputSimulator;
use crate::launcher::Launcher;
use crate::render::Ui;
use crate::tts::{Cue, Speaker};

/// Sleeps between automation steps
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// Real wall-clock delays
#[derive(Debug, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// What the session loop should do after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

pub struct Executor {
    config: Arc<Config>,
    speaker: Box<dyn Speaker>,
    input: Box<dyn InputSimulator>,
    launcher: Box<dyn Launcher>,
    pause: Box<dyn Pause>,
    ui: Ui,
}

impl Executor {
    pub fn new(
        config: Arc<Config>,
        speaker: Box<dyn Speaker>,
        input: Box<dyn InputSimulator>,
        launcher: Box<dyn Launcher>,
        pause: Box<dyn Pause>,
        ui: Ui,
    ) -> Self {
        Self {
            config,
            speaker,
            input,
            launcher,
            pause,
            ui,
        }
    }

    /// Speak a line and log it to the transcript
    pub fn say(&mut self, text: &str) {
        self.ui.agent_said(text);
        self.speaker.speak(text);
    }

    pub fn cue(&mut self, cue: Cue) {
        self.speaker.cue(cue);
    }

    pub fn wait(&mut self, duration: Duration) {
        self.pause.pause(duration);
    }

    #[hotpath::measure]
    pub fn execute(&mut self, request: &ActionRequest) -> Result<Outcome, AutomationError> {
        let steps = request.plan(&self.config);
        tracing::debug!(intent = %request.intent(), steps = steps.len(), "executing action");

        match request {
            ActionRequest::Message { target, .. } => {
                if let Err(e) = self.run(&steps) {
                    tracing::warn!(error = %e, %target, "message failed");
                    let apology = self.config.phrases.message_apology.clone();
                    self.say(&apology);
                }
            }
            _ => self.run(&steps)?,
        }

        Ok(match request {
            ActionRequest::Exit => Outcome::Exit,
            _ => Outcome::Continue,
        })
    }

    fn run(&mut self, steps: &[AutomationStep]) -> Result<(), AutomationError> {
        for (index, step) in steps.iter().enumerate() {
            tracing::debug!(index, %step, "step");
            self.step(step)?;
        }
        Ok(())
    }

    fn step(&mut self, step: &AutomationStep) -> Result<(), AutomationError> {
        match step {
            AutomationStep::Speak(text) => self.say(text),
            AutomationStep::Launch(app) => self.launcher.launch(app)?,
            AutomationStep::OpenUrl(url) => self.launcher.open_url(url)?,
            AutomationStep::KeyCombo(keys) => self.input.key_combo(keys)?,
            AutomationStep::KeyPress(key) => self.input.key_press(*key)?,
            AutomationStep::TypeText(text) => self.input.type_text(text)?,
            AutomationStep::Wait(duration) => self.wait(*duration),
        }
        Ok(())
    }
}
