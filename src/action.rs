//! Parameter extraction and automation plans
//!
//! An [`ActionRequest`] is built from a classification and turned into an ordered list of
//! [`AutomationStep`]s. Plans are plain data so they can be printed, logged and tested
//! without touching the desktop.

use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::intent::{Classification, Intent, find_resource, pressed_key};

/// Target used when a message names no recipient
pub const UNKNOWN_TARGET: &str = "unknown";

/// Word separating message content from its recipient
const MESSAGE_SEPARATOR: &str = "to";

/// Keys the agent can press, independent of the input backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    Enter,
    Tab,
    Escape,
    Space,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Control,
    Shift,
    Alt,
    Meta,
    Char(char),
}

impl KeyName {
    /// Map a spoken key name to a key
    pub fn from_spoken(word: &str) -> Option<Self> {
        let key = match word {
            "enter" | "return" => KeyName::Enter,
            "tab" => KeyName::Tab,
            "escape" | "esc" => KeyName::Escape,
            "space" | "spacebar" => KeyName::Space,
            "backspace" => KeyName::Backspace,
            "delete" => KeyName::Delete,
            "up" => KeyName::Up,
            "down" => KeyName::Down,
            "left" => KeyName::Left,
            "right" => KeyName::Right,
            "home" => KeyName::Home,
            "end" => KeyName::End,
            _ => return None,
        };
        Some(key)
    }

    /// Cmd on macOS, Ctrl elsewhere
    pub fn primary_modifier() -> Self {
        if cfg!(target_os = "macos") {
            KeyName::Meta
        } else {
            KeyName::Control
        }
    }

    /// Shortcut that focuses the search box in the messaging app
    pub fn find_combo() -> Vec<KeyName> {
        vec![Self::primary_modifier(), KeyName::Char('f')]
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyName::Char(c) => write!(f, "{}", c),
            other => write!(f, "{}", format!("{:?}", other).to_lowercase()),
        }
    }
}

/// One atomic unit of an automation sequence
#[derive(Debug, Clone, PartialEq)]
pub enum AutomationStep {
    Speak(String),
    Launch(String),
    OpenUrl(String),
    KeyCombo(Vec<KeyName>),
    KeyPress(KeyName),
    TypeText(String),
    Wait(Duration),
}

impl fmt::Display for AutomationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationStep::Speak(text) => write!(f, "speak \"{}\"", text),
            AutomationStep::Launch(app) => write!(f, "launch {}", app),
            AutomationStep::OpenUrl(url) => write!(f, "open {}", url),
            AutomationStep::KeyCombo(keys) => {
                let names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
                write!(f, "combo {}", names.join("+"))
            }
            AutomationStep::KeyPress(key) => write!(f, "press {}", key),
            AutomationStep::TypeText(text) => write!(f, "type \"{}\"", text),
            AutomationStep::Wait(d) => write!(f, "wait {}ms", d.as_millis()),
        }
    }
}

/// Intent-bound unit of work with its extracted parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    Exit,
    Greeting,
    Call { target: String },
    Message { target: String, content: String },
    TypeDictation { content: String },
    PressKey { key: KeyName },
    OpenResource { resource: String },
    /// `None` when nothing follows the open keyword
    OpenApplication { app: Option<String> },
    Unrecognized,
}

impl ActionRequest {
    /// Extract intent parameters from the utterance
    pub fn extract(classification: &Classification, config: &Config) -> Self {
        let text = classification.utterance.as_str();
        let commands = &config.commands;

        match classification.intent {
            Intent::Exit => ActionRequest::Exit,
            Intent::Greeting => ActionRequest::Greeting,
            Intent::Call => ActionRequest::Call {
                target: strip_keywords(text, &commands.call),
            },
            Intent::Message => {
                let (content, target) = split_message(text, &commands.message);
                ActionRequest::Message { target, content }
            }
            Intent::TypeDictation => ActionRequest::TypeDictation {
                content: strip_keywords(text, &commands.dictation),
            },
            Intent::PressKey => ActionRequest::PressKey {
                key: pressed_key(text).unwrap_or(KeyName::Enter),
            },
            Intent::OpenResource => match find_resource(text, &config.open.known_sites) {
                Some(resource) => ActionRequest::OpenResource {
                    resource: resource.to_string(),
                },
                None => ActionRequest::OpenApplication {
                    app: application_token(text),
                },
            },
            Intent::OpenApplication => ActionRequest::OpenApplication {
                app: application_token(text),
            },
            Intent::Unrecognized => ActionRequest::Unrecognized,
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            ActionRequest::Exit => Intent::Exit,
            ActionRequest::Greeting => Intent::Greeting,
            ActionRequest::Call { .. } => Intent::Call,
            ActionRequest::Message { .. } => Intent::Message,
            ActionRequest::TypeDictation { .. } => Intent::TypeDictation,
            ActionRequest::PressKey { .. } => Intent::PressKey,
            ActionRequest::OpenResource { .. } => Intent::OpenResource,
            ActionRequest::OpenApplication { .. } => Intent::OpenApplication,
            ActionRequest::Unrecognized => Intent::Unrecognized,
        }
    }

    /// Build the ordered automation sequence for this request
    pub fn plan(&self, config: &Config) -> Vec<AutomationStep> {
        use AutomationStep::*;

        let timing = &config.timing;
        let messaging = &config.messaging;

        match self {
            ActionRequest::Exit => vec![Speak(config.phrases.farewell.clone())],
            ActionRequest::Greeting => vec![Speak(config.phrases.greeting.clone())],
            ActionRequest::Call { target } => vec![
                Speak(format!("Calling {} on {}", target, messaging.display_name)),
                Launch(messaging.app.clone()),
                Wait(timing.app_open()),
                KeyCombo(KeyName::find_combo()),
                Wait(timing.search()),
                TypeText(target.clone()),
                Wait(timing.step()),
                KeyPress(KeyName::Enter),
                Wait(timing.step()),
                // The call button has no shortcut; leave the last click to the user
                Speak(format!(
                    "Opened chat for {}. Please press call button.",
                    target
                )),
            ],
            ActionRequest::Message { target, content } => vec![
                Speak(format!("Messaging {}", target)),
                Launch(messaging.app.clone()),
                Wait(timing.app_open()),
                KeyCombo(KeyName::find_combo()),
                TypeText(target.clone()),
                Wait(timing.step()),
                KeyPress(KeyName::Enter),
                Wait(timing.step()),
                TypeText(content.clone()),
                KeyPress(KeyName::Enter),
                Speak(config.phrases.message_sent.clone()),
            ],
            ActionRequest::TypeDictation { content } => vec![
                Speak(config.phrases.typing.clone()),
                TypeText(format!("{} ", content)),
            ],
            ActionRequest::PressKey { key } => vec![KeyPress(*key)],
            ActionRequest::OpenResource { resource } => vec![
                Speak(format!("Opening {}", resource)),
                OpenUrl(resource_url(resource)),
            ],
            ActionRequest::OpenApplication { app: Some(app) } => vec![Launch(app.clone())],
            ActionRequest::OpenApplication { app: None } | ActionRequest::Unrecognized => {
                Vec::new()
            }
        }
    }
}

/// Remove every occurrence of the trigger keywords and tidy whitespace
fn strip_keywords(text: &str, keywords: &[String]) -> String {
    let mut out = text.to_string();
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() {
            out = out.replace(&keyword, "");
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split "send <content> to <target>" into (content, target)
fn split_message(text: &str, keywords: &[String]) -> (String, String) {
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.iter().position(|w| *w == MESSAGE_SEPARATOR) {
        Some(idx) => {
            let content = strip_keywords(&words[..idx].join(" "), keywords);
            let target = words[idx + 1..].join(" ");
            let target = if target.is_empty() {
                UNKNOWN_TARGET.to_string()
            } else {
                target
            };
            (content, target)
        }
        None => (text.to_string(), UNKNOWN_TARGET.to_string()),
    }
}

/// Everything after the first word ("open")
fn application_token(text: &str) -> Option<String> {
    text.split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

fn resource_url(resource: &str) -> String {
    if resource.starts_with("http://") || resource.starts_with("https://") {
        resource.to_string()
    } else {
        format!("https://{}", resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Classifier;
    use crate::normalize::normalize;

    fn request_for(intent: Intent, text: &str) -> ActionRequest {
        let config = Config::default();
        let classification = Classification {
            intent,
            utterance: normalize(Some(text)).unwrap(),
        };
        ActionRequest::extract(&classification, &config)
    }

    fn request(text: &str) -> ActionRequest {
        let config = Config::default();
        let classifier = Classifier::new(&config);
        let classification = classifier.classify(&normalize(Some(text)).unwrap());
        ActionRequest::extract(&classification, &config)
    }

    #[test]
    fn test_message_with_separator() {
        assert_eq!(
            request_for(Intent::Message, "send hello to sam"),
            ActionRequest::Message {
                target: "sam".into(),
                content: "hello".into(),
            }
        );
        assert_eq!(
            request("message running late to the team"),
            ActionRequest::Message {
                target: "the team".into(),
                content: "running late".into(),
            }
        );
    }

    #[test]
    fn test_message_without_separator_uses_sentinel() {
        assert_eq!(
            request("message sam"),
            ActionRequest::Message {
                target: UNKNOWN_TARGET.into(),
                content: "message sam".into(),
            }
        );
    }

    #[test]
    fn test_message_separator_is_a_whole_word() {
        // "potato" must not be split on its "to"
        assert_eq!(
            request("send potato"),
            ActionRequest::Message {
                target: UNKNOWN_TARGET.into(),
                content: "send potato".into(),
            }
        );
        assert_eq!(
            request("send lunch to"),
            ActionRequest::Message {
                target: UNKNOWN_TARGET.into(),
                content: "lunch".into(),
            }
        );
    }

    #[test]
    fn test_call_target() {
        assert_eq!(
            request("call priya"),
            ActionRequest::Call {
                target: "priya".into()
            }
        );
        assert_eq!(
            request("please call  the office "),
            ActionRequest::Call {
                target: "please the office".into()
            }
        );
    }

    #[test]
    fn test_type_content_gets_one_trailing_space() {
        let req = request_for(Intent::TypeDictation, "type hello world");
        assert_eq!(
            req,
            ActionRequest::TypeDictation {
                content: "hello world".into()
            }
        );
        let plan = req.plan(&Config::default());
        assert_eq!(plan.last(), Some(&AutomationStep::TypeText("hello world ".into())));
    }

    #[test]
    fn test_open_application_token() {
        assert_eq!(
            request("open notepad"),
            ActionRequest::OpenApplication {
                app: Some("notepad".into())
            }
        );
        assert_eq!(
            request("open visual studio code"),
            ActionRequest::OpenApplication {
                app: Some("visual studio code".into())
            }
        );
        assert_eq!(request("open"), ActionRequest::OpenApplication { app: None });
        assert!(request("open").plan(&Config::default()).is_empty());
    }

    #[test]
    fn test_open_resource() {
        let req = request("open youtube.com");
        assert_eq!(
            req,
            ActionRequest::OpenResource {
                resource: "youtube.com".into()
            }
        );
        assert_eq!(
            req.plan(&Config::default()),
            vec![
                AutomationStep::Speak("Opening youtube.com".into()),
                AutomationStep::OpenUrl("https://youtube.com".into()),
            ]
        );
    }

    #[test]
    fn test_press_key_plan() {
        let req = request("press enter");
        assert_eq!(req, ActionRequest::PressKey { key: KeyName::Enter });
        assert_eq!(
            req.plan(&Config::default()),
            vec![AutomationStep::KeyPress(KeyName::Enter)]
        );
    }

    #[test]
    fn test_call_plan_order() {
        let config = Config::default();
        let plan = request("call priya").plan(&config);
        assert_eq!(
            plan,
            vec![
                AutomationStep::Speak("Calling priya on WhatsApp".into()),
                AutomationStep::Launch("whatsapp".into()),
                AutomationStep::Wait(Duration::from_millis(2000)),
                AutomationStep::KeyCombo(KeyName::find_combo()),
                AutomationStep::Wait(Duration::from_millis(500)),
                AutomationStep::TypeText("priya".into()),
                AutomationStep::Wait(Duration::from_millis(1000)),
                AutomationStep::KeyPress(KeyName::Enter),
                AutomationStep::Wait(Duration::from_millis(1000)),
                AutomationStep::Speak("Opened chat for priya. Please press call button.".into()),
            ]
        );
    }

    #[test]
    fn test_message_plan_types_target_then_content() {
        let mut config = Config::default();
        config.timing = crate::config::TimingConfig::immediate();
        let plan = request_for(Intent::Message, "send hello to sam").plan(&config);
        let typed: Vec<&str> = plan
            .iter()
            .filter_map(|s| match s {
                AutomationStep::TypeText(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(typed, vec!["sam", "hello"]);
        assert_eq!(plan.first(), Some(&AutomationStep::Speak("Messaging sam".into())));
        assert_eq!(plan.last(), Some(&AutomationStep::Speak("Message sent.".into())));
    }

    #[test]
    fn test_mixed_case_known_site_opens_url() {
        let mut config = Config::default();
        config.open.known_sites = vec!["Google.com".into()];
        let utterance = normalize(Some("open google.com")).unwrap();
        let classification = Classifier::new(&config).classify(&utterance);
        assert_eq!(classification.intent, Intent::OpenResource);
        assert_eq!(
            ActionRequest::extract(&classification, &config),
            ActionRequest::OpenResource {
                resource: "google.com".into()
            }
        );
    }

    #[test]
    fn test_status_lines_come_from_phrases() {
        let mut config = Config::default();
        config.phrases.message_sent = "Sent!".into();
        config.phrases.typing = "On it.".into();
        let message = request_for(Intent::Message, "send hi to sam").plan(&config);
        assert_eq!(message.last(), Some(&AutomationStep::Speak("Sent!".into())));
        let dictation = request_for(Intent::TypeDictation, "type hi").plan(&config);
        assert_eq!(dictation.first(), Some(&AutomationStep::Speak("On it.".into())));
    }

    #[test]
    fn test_unrecognized_has_no_steps() {
        let req = request("what time is it");
        assert_eq!(req, ActionRequest::Unrecognized);
        assert!(req.plan(&Config::default()).is_empty());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(
            AutomationStep::KeyCombo(vec![KeyName::Control, KeyName::Char('f')]).to_string(),
            "combo control+f"
        );
        assert_eq!(AutomationStep::Wait(Duration::from_millis(500)).to_string(), "wait 500ms");
    }
}
