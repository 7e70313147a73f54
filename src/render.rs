use std::io::Write;

use crate::state::SessionPhase;

/// Who said a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

/// Notifications from the session worker to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    SpeechStarted,
    SpeechEnded,
    Log { role: Role, text: String },
    Phase(SessionPhase),
    Error(String),
}

/// Worker-side handle. Sending never blocks; events are dropped if nobody is listening.
#[derive(Clone)]
pub struct Ui {
    tx: flume::Sender<AgentEvent>,
}

impl Ui {
    pub fn new() -> (Self, flume::Receiver<AgentEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    pub fn speech_started(&self) {
        let _ = self.tx.send(AgentEvent::SpeechStarted);
    }

    pub fn speech_ended(&self) {
        let _ = self.tx.send(AgentEvent::SpeechEnded);
    }

    pub fn user_said(&self, text: &str) {
        let _ = self.tx.send(AgentEvent::Log {
            role: Role::User,
            text: text.to_string(),
        });
    }

    pub fn agent_said(&self, text: &str) {
        let _ = self.tx.send(AgentEvent::Log {
            role: Role::Agent,
            text: text.to_string(),
        });
    }

    pub fn phase(&self, phase: SessionPhase) {
        let _ = self.tx.send(AgentEvent::Phase(phase));
    }

    pub fn error(&self, message: impl ToString) {
        let _ = self.tx.send(AgentEvent::Error(message.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Offline,
    Ready,
    Listening,
    Processing,
    Stopped,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Offline => "Offline",
            Status::Ready => "Ready",
            Status::Listening => "Listening...",
            Status::Processing => "Processing...",
            Status::Stopped => "Stopped",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Status::Offline | Status::Stopped => "\x1b[90m",
            Status::Ready => "\x1b[32m",
            Status::Listening => "\x1b[94m",
            Status::Processing => "\x1b[33m",
        }
    }
}

/// Terminal presentation: a status line plus a timestamped transcript.
///
/// Lines end in `\r\n` so output stays aligned when the terminal is in raw mode.
pub struct Renderer {
    status: Status,
    out: Box<dyn Write>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Self {
            status: Status::Offline,
            out,
        }
    }

    /// Drain everything currently queued without blocking
    pub fn drain(&mut self, rx: &flume::Receiver<AgentEvent>) {
        for event in rx.try_iter() {
            self.handle(event);
        }
    }

    pub fn handle(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::SpeechStarted => self.set_status(Status::Listening),
            AgentEvent::SpeechEnded => self.set_status(Status::Processing),
            AgentEvent::Phase(phase) => match phase {
                SessionPhase::Stopped => self.set_status(Status::Stopped),
                SessionPhase::Announcing => self.set_status(Status::Ready),
                // Capture/dispatch are reported through the speech events
                SessionPhase::Capturing | SessionPhase::Dispatching => {}
            },
            AgentEvent::Log { role, text } => {
                let stamp = chrono::Local::now().format("%H:%M");
                let line = match role {
                    Role::User => format!("\x1b[36m[{}] [You]: {}\x1b[0m", stamp, text),
                    Role::Agent => format!("[{}] [Agent]: {}", stamp, text),
                };
                self.clear_line();
                let _ = write!(self.out, "{}\r\n", line);
                self.render_status();
            }
            AgentEvent::Error(message) => {
                self.clear_line();
                let _ = write!(self.out, "\x1b[31m! {}\x1b[0m\r\n", message);
                self.render_status();
            }
        }
        self.out.flush().ok();
    }

    pub fn notice(&mut self, text: &str) {
        self.clear_line();
        let _ = write!(self.out, "\x1b[90m{}\x1b[0m\r\n", text);
        self.render_status();
        self.out.flush().ok();
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        self.render_status();
    }

    fn clear_line(&mut self) {
        let _ = write!(self.out, "\r\x1b[K");
    }

    fn render_status(&mut self) {
        let _ = write!(
            self.out,
            "\r\x1b[K{}● {}\x1b[0m",
            self.status.color(),
            self.status.label()
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
