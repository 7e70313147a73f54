use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use nanba::capture::{MicCapture, SpeechCapture, TextCapture, spawn_stdin_reader};
use nanba::executor::ThreadPause;
use nanba::input::{DryRunInput, EnigoInput, InputMethod, InputSimulator};
use nanba::launcher::{DesktopLauncher, DryRunLauncher, Launcher};
use nanba::tts::{SilentSpeaker, Speaker, SystemVoice};
use nanba::{
    ActionRequest, Agent, AgentError, AgentEvent, Classifier, Collaborators, Config, Renderer, Ui,
    normalize,
};

#[derive(Parser)]
#[command(name = "nanba", about = "Voice-driven desktop automation agent")]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log automation steps instead of touching the desktop
    #[arg(long)]
    dry_run: bool,

    /// Do not speak; replies only appear in the transcript
    #[arg(long)]
    mute: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Listen on the microphone (default)
    Listen,
    /// Read commands typed on stdin
    Text,
    /// Show how a command would be interpreted, without running it
    Classify {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[derive(Clone, Copy)]
struct Options {
    dry_run: bool,
    mute: bool,
}

const EVENT_POLL: Duration = Duration::from_millis(50);

#[hotpath::main]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Listen);

    // Raw mode turns log lines into a staircase, so keep the listen screen quiet by default
    let default_level = match command {
        Command::Listen => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load(&cli.config));
    let options = Options {
        dry_run: cli.dry_run,
        mute: cli.mute,
    };

    match command {
        Command::Classify { words } => {
            classify(&config, &words.join(" "));
            Ok(())
        }
        Command::Text => run_text(config, options),
        Command::Listen => run_listen(config, options),
    }
}

/// Desktop-facing collaborators, honouring --dry-run and --mute
fn collaborators(
    config: &Config,
    options: Options,
    capture: Box<dyn SpeechCapture>,
) -> Result<Collaborators, AgentError> {
    let speaker: Box<dyn Speaker> = if options.mute || !config.speech.enabled {
        Box::new(SilentSpeaker)
    } else {
        Box::new(SystemVoice::new(&config.speech))
    };

    let (input, launcher): (Box<dyn InputSimulator>, Box<dyn Launcher>) = if options.dry_run {
        (Box::new(DryRunInput), Box::new(DryRunLauncher))
    } else {
        let input = EnigoInput::new(InputMethod::from_str(&config.input.method))
            .map_err(|e| AgentError::init("input", e))?;
        (
            Box::new(input),
            Box::new(DesktopLauncher::new(config.apps.clone())),
        )
    };

    Ok(Collaborators {
        capture,
        speaker,
        input,
        launcher,
        pause: Box::new(ThreadPause),
    })
}

fn classify(config: &Config, text: &str) {
    let Some(utterance) = normalize(Some(text)) else {
        println!("(empty utterance)");
        return;
    };

    let classification = Classifier::new(config).classify(&utterance);
    let request = ActionRequest::extract(&classification, config);
    let steps = request.plan(config);

    println!("utterance: {}", utterance);
    println!("intent:    {}", classification.intent);
    println!("request:   {:?}", request);
    if steps.is_empty() {
        println!("steps:     (none)");
    } else {
        println!("steps:");
        for (i, step) in steps.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, step);
        }
    }
}

fn run_text(config: Arc<Config>, options: Options) -> anyhow::Result<()> {
    let (ui, events) = Ui::new();
    let lines = spawn_stdin_reader();

    let factory_config = config.clone();
    let mut agent = Agent::new(config, ui, move |state| {
        let capture = TextCapture::new(lines.clone(), state.clone());
        collaborators(&factory_config, options, Box::new(capture))
    });

    let state = agent.state();
    ctrlc::set_handler(move || state.request_stop()).context("failed to set Ctrl+C handler")?;

    let mut renderer = Renderer::new();
    renderer.notice("Type a command and press Enter. Ctrl+C or Ctrl+D to quit.");
    agent.start()?;

    while agent.is_running() {
        if let Ok(event) = events.recv_timeout(EVENT_POLL) {
            renderer.handle(event);
        }
    }

    agent.join();
    renderer.drain(&events);
    Ok(())
}

fn run_listen(config: Arc<Config>, options: Options) -> anyhow::Result<()> {
    let (ui, events) = Ui::new();

    let factory_config = config.clone();
    let mut agent = Agent::new(config, ui, move |_state| {
        let capture = MicCapture::new(&factory_config.capture)
            .map_err(|e| AgentError::init("microphone capture", e))?;
        collaborators(&factory_config, options, Box::new(capture))
    });

    let mut renderer = Renderer::new();
    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    renderer.notice("space: start/stop   q: quit");

    let result = control_loop(&mut agent, &mut renderer, &events);

    if agent.is_running() {
        renderer.notice("Stopping after the current turn...");
    }
    agent.stop();
    agent.join();
    renderer.drain(&events);
    terminal::disable_raw_mode().ok();
    println!();
    result
}

/// Keyboard control surface: space toggles the session, q/Esc/Ctrl+C quits
fn control_loop(
    agent: &mut Agent,
    renderer: &mut Renderer,
    events: &flume::Receiver<AgentEvent>,
) -> anyhow::Result<()> {
    agent.start()?;

    loop {
        renderer.drain(events);

        if !event::poll(EVENT_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char(' ') => {
                if agent.is_running() {
                    agent.stop();
                    renderer.notice("Stopping after the current turn...");
                } else {
                    agent.start()?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}
