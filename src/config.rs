use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub phrases: PhrasesConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub open: OpenConfig,
    /// Spoken application name -> launch target
    #[serde(default = "default_apps")]
    pub apps: BTreeMap<String, String>,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            phrases: PhrasesConfig::default(),
            capture: CaptureConfig::default(),
            timing: TimingConfig::default(),
            messaging: MessagingConfig::default(),
            commands: CommandsConfig::default(),
            open: OpenConfig::default(),
            apps: default_apps(),
            speech: SpeechConfig::default(),
            input: InputConfig::default(),
        }
    }
}

fn default_name() -> String {
    "Nanba".into()
}

// ============================================================================
// Phrases
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PhrasesConfig {
    #[serde(default = "default_online")]
    pub online: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_farewell")]
    pub farewell: String,
    #[serde(default = "default_message_apology")]
    pub message_apology: String,
    #[serde(default = "default_message_sent")]
    pub message_sent: String,
    #[serde(default = "default_typing")]
    pub typing: String,
}

impl Default for PhrasesConfig {
    fn default() -> Self {
        Self {
            online: default_online(),
            greeting: default_greeting(),
            farewell: default_farewell(),
            message_apology: default_message_apology(),
            message_sent: default_message_sent(),
            typing: default_typing(),
        }
    }
}

fn default_online() -> String {
    "Hi Nanba, I am Online.".into()
}
fn default_greeting() -> String {
    "Hello Nanba, I am ready to help you.".into()
}
fn default_farewell() -> String {
    "Goodbye!".into()
}
fn default_message_apology() -> String {
    "I couldn't send the message.".into()
}
fn default_message_sent() -> String {
    "Message sent.".into()
}
fn default_typing() -> String {
    "Typing...".into()
}

// ============================================================================
// Capture Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Seconds to wait for speech to begin before giving up
    #[serde(default = "default_capture_timeout")]
    pub timeout_secs: f32,
    /// Maximum length of a single phrase
    #[serde(default = "default_phrase_limit")]
    pub phrase_limit_secs: f32,
    /// Noise-floor calibration before each capture
    #[serde(default = "default_ambient_adjust")]
    pub ambient_adjust_secs: f32,
    /// Trailing silence that ends a phrase
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u32,
    #[serde(default = "default_vad_model")]
    pub vad_model: String,
    #[serde(default = "default_transcriber_model")]
    pub transcriber_model: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_capture_timeout(),
            phrase_limit_secs: default_phrase_limit(),
            ambient_adjust_secs: default_ambient_adjust(),
            pause_ms: default_pause_ms(),
            vad_model: default_vad_model(),
            transcriber_model: default_transcriber_model(),
        }
    }
}

fn default_capture_timeout() -> f32 {
    5.0
}
fn default_phrase_limit() -> f32 {
    8.0
}
fn default_ambient_adjust() -> f32 {
    0.5
}
fn default_pause_ms() -> u32 {
    800
}
fn default_vad_model() -> String {
    "models/silero_vad_v4.onnx".into()
}
fn default_transcriber_model() -> String {
    "models/parakeet-tdt-0.6b-v3-int8".into()
}

// ============================================================================
// Timing Config
// ============================================================================

/// Fixed delays between automation steps. There is no feedback from the
/// target application, so these are the only synchronisation available.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Wait after launching the messaging app
    #[serde(default = "default_app_open_ms")]
    pub app_open_ms: u64,
    /// Wait after opening the search box
    #[serde(default = "default_search_ms")]
    pub search_ms: u64,
    /// Wait between the remaining chat steps
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Pause between loop iterations
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            app_open_ms: default_app_open_ms(),
            search_ms: default_search_ms(),
            step_ms: default_step_ms(),
            idle_ms: default_idle_ms(),
        }
    }
}

impl TimingConfig {
    /// All delays zeroed, for tests and scripted runs
    pub fn immediate() -> Self {
        Self {
            app_open_ms: 0,
            search_ms: 0,
            step_ms: 0,
            idle_ms: 0,
        }
    }

    pub fn app_open(&self) -> Duration {
        Duration::from_millis(self.app_open_ms)
    }

    pub fn search(&self) -> Duration {
        Duration::from_millis(self.search_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

fn default_app_open_ms() -> u64 {
    2000
}
fn default_search_ms() -> u64 {
    500
}
fn default_step_ms() -> u64 {
    1000
}
fn default_idle_ms() -> u64 {
    500
}

// ============================================================================
// Messaging Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Launch token, resolved through the apps table
    #[serde(default = "default_messaging_app")]
    pub app: String,
    /// Name used in spoken feedback
    #[serde(default = "default_messaging_display")]
    pub display_name: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            app: default_messaging_app(),
            display_name: default_messaging_display(),
        }
    }
}

fn default_messaging_app() -> String {
    "whatsapp".into()
}
fn default_messaging_display() -> String {
    "WhatsApp".into()
}

// ============================================================================
// Commands Config
// ============================================================================

/// Trigger keywords per intent. Matching is case-insensitive substring search.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_exit_keywords")]
    pub exit: Vec<String>,
    #[serde(default = "default_greeting_keywords")]
    pub greeting: Vec<String>,
    #[serde(default = "default_call_keywords")]
    pub call: Vec<String>,
    #[serde(default = "default_message_keywords")]
    pub message: Vec<String>,
    #[serde(default = "default_type_keywords")]
    pub dictation: Vec<String>,
    #[serde(default = "default_open_keywords")]
    pub open: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            exit: default_exit_keywords(),
            greeting: default_greeting_keywords(),
            call: default_call_keywords(),
            message: default_message_keywords(),
            dictation: default_type_keywords(),
            open: default_open_keywords(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_exit_keywords() -> Vec<String> {
    words(&["exit", "quit", "stop", "shut down", "bye"])
}
fn default_greeting_keywords() -> Vec<String> {
    words(&["hello", "hi nanba"])
}
fn default_call_keywords() -> Vec<String> {
    words(&["call"])
}
fn default_message_keywords() -> Vec<String> {
    words(&["message", "send"])
}
fn default_type_keywords() -> Vec<String> {
    words(&["type", "write"])
}
fn default_open_keywords() -> Vec<String> {
    words(&["open"])
}

// ============================================================================
// Open Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OpenConfig {
    /// Sites that make "open <host>" go to the browser instead of an app
    #[serde(default = "default_known_sites")]
    pub known_sites: Vec<String>,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            known_sites: default_known_sites(),
        }
    }
}

fn default_known_sites() -> Vec<String> {
    words(&["google.com", "youtube.com"])
}

fn default_apps() -> BTreeMap<String, String> {
    let table: &[(&str, &str)] = if cfg!(target_os = "macos") {
        &[
            ("whatsapp", "WhatsApp"),
            ("notepad", "TextEdit"),
            ("calculator", "Calculator"),
            ("chrome", "Google Chrome"),
            ("browser", "Safari"),
            ("terminal", "Terminal"),
        ]
    } else if cfg!(target_os = "windows") {
        &[
            ("whatsapp", "whatsapp:"),
            ("notepad", "notepad"),
            ("calculator", "calc"),
            ("chrome", "chrome"),
            ("browser", "msedge"),
            ("terminal", "wt"),
        ]
    } else {
        &[
            ("whatsapp", "whatsapp-for-linux"),
            ("notepad", "gedit"),
            ("calculator", "gnome-calculator"),
            ("chrome", "google-chrome"),
            ("browser", "firefox"),
            ("terminal", "x-terminal-emulator"),
        ]
    };
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Speech / Input Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Start/stop tones around each capture
    #[serde(default = "default_true")]
    pub earcons: bool,
    /// Override the platform speech command; the text is appended as the last argument
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            earcons: true,
            command: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// "direct" or "clipboard"
    #[serde(default = "default_input_method")]
    pub method: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            method: default_input_method(),
        }
    }
}

fn default_input_method() -> String {
    "direct".into()
}

impl Config {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Config::default();
        }

        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| toml::from_str::<Config>(&s).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => {
                tracing::info!(path = %path.display(), "config loaded");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Config::default()
            }
        }
    }
}
