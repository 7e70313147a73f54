//! Session loop and the start/stop control surface
//!
//! One worker thread per session runs capture → normalize → classify → execute,
//! strictly sequentially. The presentation layer only sees `AgentEvent`s.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::action::ActionRequest;
use crate::capture::{CaptureParams, SpeechCapture};
use crate::config::Config;
use crate::error::AgentError;
use crate::executor::{Executor, Outcome, Pause};
use crate::input::InputSimulator;
use crate::intent::Classifier;
use crate::launcher::Launcher;
use crate::normalize::normalize;
use crate::render::Ui;
use crate::state::{SessionPhase, SessionState, SharedState};
use crate::tts::{Cue, Speaker};

/// Everything the worker talks to. Built on the worker thread, since audio
/// streams and input backends are not `Send` on every platform.
pub struct Collaborators {
    pub capture: Box<dyn SpeechCapture>,
    pub speaker: Box<dyn Speaker>,
    pub input: Box<dyn InputSimulator>,
    pub launcher: Box<dyn Launcher>,
    pub pause: Box<dyn Pause>,
}

pub type CollaboratorFactory =
    Arc<dyn Fn(&SharedState) -> Result<Collaborators, AgentError> + Send + Sync>;

enum Turn {
    Continue,
    Stop,
}

pub struct SessionLoop {
    config: Arc<Config>,
    state: SharedState,
    generation: u64,
    classifier: Classifier,
    params: CaptureParams,
    capture: Box<dyn SpeechCapture>,
    executor: Executor,
    ui: Ui,
}

impl SessionLoop {
    pub fn new(
        config: Arc<Config>,
        state: SharedState,
        generation: u64,
        ui: Ui,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            capture,
            speaker,
            input,
            launcher,
            pause,
        } = collaborators;

        Self {
            classifier: Classifier::new(&config),
            params: CaptureParams::from_config(&config.capture),
            executor: Executor::new(config.clone(), speaker, input, launcher, pause, ui.clone()),
            config,
            state,
            generation,
            capture,
            ui,
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.state.set_phase(phase);
        self.ui.phase(phase);
    }

    /// Run until stopped or an exit intent, then mark the session finished
    pub fn run(mut self) {
        tracing::info!(name = %self.config.name, generation = self.generation, "session started");
        if self.state.should_continue(self.generation) {
            self.set_phase(SessionPhase::Announcing);
            let online = self.config.phrases.online.clone();
            self.executor.say(&online);
        }

        while self.state.should_continue(self.generation) {
            match catch_unwind(AssertUnwindSafe(|| self.turn())) {
                Ok(Turn::Continue) => {}
                Ok(Turn::Stop) => break,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".into());
                    tracing::error!(%reason, "session turn panicked, continuing");
                    self.ui.error(format!("internal error: {}", reason));
                    self.executor.wait(self.config.timing.idle());
                }
            }
        }

        self.state.finish(self.generation);
        self.set_phase(SessionPhase::Stopped);
        tracing::info!(generation = self.generation, "session stopped");
    }

    /// One capture and dispatch cycle
    fn turn(&mut self) -> Turn {
        self.set_phase(SessionPhase::Capturing);
        self.executor.cue(Cue::Start);
        self.ui.speech_started();
        let raw = self.capture.capture(&self.params);
        self.ui.speech_ended();

        let Some(utterance) = normalize(raw.as_deref()) else {
            self.executor.wait(self.config.timing.idle());
            return Turn::Continue;
        };
        self.executor.cue(Cue::Stop);

        if !self.state.should_continue(self.generation) {
            tracing::debug!(%utterance, "stopped during capture, dropping utterance");
            return Turn::Stop;
        }

        self.ui.user_said(utterance.as_str());
        self.set_phase(SessionPhase::Dispatching);

        let classification = self.classifier.classify(&utterance);
        let request = ActionRequest::extract(&classification, &self.config);
        tracing::info!(intent = %classification.intent, %utterance, "dispatching");

        match self.executor.execute(&request) {
            Ok(Outcome::Exit) => return Turn::Stop,
            Ok(Outcome::Continue) => {}
            Err(e) => tracing::warn!(error = %e, intent = %request.intent(), "action failed"),
        }

        self.executor.wait(self.config.timing.idle());
        Turn::Continue
    }
}

/// Marks the session finished when the worker exits, including by unwinding
struct FinishGuard {
    state: SharedState,
    generation: u64,
    ui: Ui,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.ui.error("internal error: session worker panicked");
        }
        self.state.finish(self.generation);
        if self.state.generation() == self.generation {
            self.state.set_phase(SessionPhase::Stopped);
            self.ui.phase(SessionPhase::Stopped);
        }
    }
}

/// Control surface for the presentation layer
pub struct Agent {
    config: Arc<Config>,
    ui: Ui,
    factory: CollaboratorFactory,
    state: SharedState,
    workers: Vec<JoinHandle<()>>,
}

impl Agent {
    pub fn new<F>(config: Arc<Config>, ui: Ui, factory: F) -> Self
    where
        F: Fn(&SharedState) -> Result<Collaborators, AgentError> + Send + Sync + 'static,
    {
        Self {
            config,
            ui,
            factory: Arc::new(factory),
            state: SessionState::new(),
            workers: Vec::new(),
        }
    }

    /// Start a session on a new worker thread. Returns `false` if one is already running.
    pub fn start(&mut self) -> Result<bool, AgentError> {
        if self.state.is_running() {
            return Ok(false);
        }
        self.workers.retain(|worker| !worker.is_finished());

        let generation = self.state.begin();
        let state = self.state.clone();
        let config = self.config.clone();
        let ui = self.ui.clone();
        let factory = self.factory.clone();

        let spawned = thread::Builder::new()
            .name(format!("session-{}", generation))
            .spawn(move || {
                // Wait for a previous worker still finishing its last turn
                let _worker = state.lock_worker();
                if !state.should_continue(generation) {
                    return;
                }
                let _finish = FinishGuard {
                    state: state.clone(),
                    generation,
                    ui: ui.clone(),
                };
                match factory(&state) {
                    Ok(collaborators) => {
                        SessionLoop::new(config, state.clone(), generation, ui, collaborators)
                            .run()
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to start session");
                        ui.error(&e);
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                self.workers.push(handle);
                Ok(true)
            }
            Err(e) => {
                self.state.finish(generation);
                Err(AgentError::Spawn(e))
            }
        }
    }

    /// Ask the worker to stop after its current turn
    pub fn stop(&self) {
        self.state.request_stop();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Wait for every worker to exit
    pub fn join(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("session worker panicked");
            }
        }
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.stop();
    }
}
