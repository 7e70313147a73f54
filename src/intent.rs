//! Intent classification - maps a normalized utterance to exactly one command
//!
//! Rules are evaluated in order, first match wins:
//! 1. Exit - always checked first so "stop" wins over anything else in the sentence
//! 2. Greeting
//! 3. Call
//! 4. Message
//! 5. Type (dictation)
//! 6. Press <key>
//! 7. Open (website or application)
//! 8. Unrecognized - silently ignored

use std::fmt;

use crate::action::KeyName;
use crate::config::Config;
use crate::normalize::Utterance;

/// Classified command category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Exit,
    Greeting,
    Call,
    Message,
    TypeDictation,
    PressKey,
    OpenResource,
    OpenApplication,
    Unrecognized,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Exit => "exit",
            Intent::Greeting => "greeting",
            Intent::Call => "call",
            Intent::Message => "message",
            Intent::TypeDictation => "type",
            Intent::PressKey => "press-key",
            Intent::OpenResource => "open-resource",
            Intent::OpenApplication => "open-application",
            Intent::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// Test applied to the utterance text
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Any keyword appears anywhere in the text
    ContainsAny(Vec<String>),
    /// "press" followed by a known key name
    PressKey,
    /// Any open keyword; refined into resource vs application
    Open(Vec<String>),
}

impl Predicate {
    fn matches(&self, text: &str) -> bool {
        match self {
            Predicate::ContainsAny(keywords) | Predicate::Open(keywords) => {
                keywords.iter().any(|k| text.contains(k.as_str()))
            }
            Predicate::PressKey => pressed_key(text).is_some(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub intent: Intent,
    pub predicate: Predicate,
}

/// Result of classification: the intent plus the untouched utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub utterance: Utterance,
}

/// Ordered rule set built from the command keyword config
pub struct Classifier {
    rules: Vec<Rule>,
    known_sites: Vec<String>,
}

impl Classifier {
    pub fn new(config: &Config) -> Self {
        let lower = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let commands = &config.commands;

        let rules = vec![
            Rule {
                intent: Intent::Exit,
                predicate: Predicate::ContainsAny(lower(&commands.exit)),
            },
            Rule {
                intent: Intent::Greeting,
                predicate: Predicate::ContainsAny(lower(&commands.greeting)),
            },
            Rule {
                intent: Intent::Call,
                predicate: Predicate::ContainsAny(lower(&commands.call)),
            },
            Rule {
                intent: Intent::Message,
                predicate: Predicate::ContainsAny(lower(&commands.message)),
            },
            Rule {
                intent: Intent::TypeDictation,
                predicate: Predicate::ContainsAny(lower(&commands.dictation)),
            },
            Rule {
                intent: Intent::PressKey,
                predicate: Predicate::PressKey,
            },
            Rule {
                intent: Intent::OpenApplication,
                predicate: Predicate::Open(lower(&commands.open)),
            },
        ];

        Self {
            rules,
            known_sites: lower(&config.open.known_sites),
        }
    }

    /// The rule list in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[hotpath::measure]
    pub fn classify(&self, utterance: &Utterance) -> Classification {
        let text = utterance.as_str();
        let intent = self
            .rules
            .iter()
            .find(|rule| rule.predicate.matches(text))
            .map(|rule| match rule.predicate {
                Predicate::Open(_) if find_resource(text, &self.known_sites).is_some() => {
                    Intent::OpenResource
                }
                _ => rule.intent,
            })
            .unwrap_or(Intent::Unrecognized);

        Classification {
            intent,
            utterance: utterance.clone(),
        }
    }

    pub fn known_sites(&self) -> &[String] {
        &self.known_sites
    }
}

/// Key named after "press", if it is one we can send
pub fn pressed_key(text: &str) -> Option<KeyName> {
    if text.contains("press enter") {
        return Some(KeyName::Enter);
    }
    let mut words = text.split_whitespace();
    while let Some(word) = words.next() {
        if word == "press" {
            if let Some(key) = words.clone().next().and_then(KeyName::from_spoken) {
                return Some(key);
            }
        }
    }
    None
}

/// Dotted word to open in the browser, only when a known site is mentioned
pub fn find_resource<'a>(text: &'a str, known_sites: &[String]) -> Option<&'a str> {
    if !known_sites
        .iter()
        .map(|site| site.trim().to_lowercase())
        .any(|site| !site.is_empty() && text.contains(&site))
    {
        return None;
    }
    text.split_whitespace()
        .find(|w| w.contains('.') && !w.starts_with("open"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn classify(text: &str) -> Intent {
        let classifier = Classifier::new(&Config::default());
        classifier.classify(&normalize(Some(text)).unwrap()).intent
    }

    #[test]
    fn test_rule_order_is_contract() {
        let classifier = Classifier::new(&Config::default());
        let order: Vec<Intent> = classifier.rules().iter().map(|r| r.intent).collect();
        assert_eq!(
            order,
            vec![
                Intent::Exit,
                Intent::Greeting,
                Intent::Call,
                Intent::Message,
                Intent::TypeDictation,
                Intent::PressKey,
                Intent::OpenApplication,
            ]
        );
    }

    #[test]
    fn test_basic_intents() {
        assert_eq!(classify("quit"), Intent::Exit);
        assert_eq!(classify("shut down now"), Intent::Exit);
        assert_eq!(classify("hello there"), Intent::Greeting);
        assert_eq!(classify("hi nanba"), Intent::Greeting);
        assert_eq!(classify("call priya"), Intent::Call);
        assert_eq!(classify("send the report to sam"), Intent::Message);
        assert_eq!(classify("message sam"), Intent::Message);
        assert_eq!(classify("type good morning"), Intent::TypeDictation);
        assert_eq!(classify("write a note"), Intent::TypeDictation);
        assert_eq!(classify("press enter"), Intent::PressKey);
        assert_eq!(classify("open notepad"), Intent::OpenApplication);
        assert_eq!(classify("open google.com"), Intent::OpenResource);
        assert_eq!(classify("what time is it"), Intent::Unrecognized);
    }

    #[test]
    fn test_exit_short_circuits_everything() {
        assert_eq!(classify("stop and open notepad"), Intent::Exit);
        assert_eq!(classify("hello bye"), Intent::Exit);
        assert_eq!(classify("send goodbye to sam"), Intent::Exit);
    }

    #[test]
    fn test_greeting_shadows_dictation_and_message() {
        // keyword overlap is resolved purely by rule order
        assert_eq!(classify("type hello world"), Intent::Greeting);
        assert_eq!(classify("send hello to sam"), Intent::Greeting);
    }

    #[test]
    fn test_specific_before_generic() {
        // "message" must win over "open"
        assert_eq!(classify("open chat and message sam"), Intent::Message);
        // greeting wins over call
        assert_eq!(classify("hello call mom"), Intent::Greeting);
        // call wins over message
        assert_eq!(classify("call and send"), Intent::Call);
    }

    #[test]
    fn test_press_generalises_to_known_keys() {
        assert_eq!(pressed_key("press enter"), Some(KeyName::Enter));
        assert_eq!(pressed_key("please press tab"), Some(KeyName::Tab));
        assert_eq!(pressed_key("press escape"), Some(KeyName::Escape));
        assert_eq!(pressed_key("press banana"), None);
        assert_eq!(pressed_key("press"), None);
        assert_eq!(classify("press banana"), Intent::Unrecognized);
    }

    #[test]
    fn test_open_resource_needs_known_site() {
        let sites = Config::default().open.known_sites;
        assert_eq!(find_resource("open youtube.com", &sites), Some("youtube.com"));
        assert_eq!(find_resource("open example.com", &sites), None);
        assert_eq!(classify("open example.com"), Intent::OpenApplication);
    }

    #[test]
    fn test_known_sites_match_regardless_of_case() {
        let sites = vec!["Google.com".to_string()];
        assert_eq!(find_resource("open google.com", &sites), Some("google.com"));
    }

    #[test]
    fn test_custom_keywords() {
        let mut config = Config::default();
        config.commands.exit = vec!["Goodnight".into()];
        let classifier = Classifier::new(&config);
        let intent = classifier.classify(&normalize(Some("goodnight")).unwrap()).intent;
        assert_eq!(intent, Intent::Exit);
        let intent = classifier.classify(&normalize(Some("stop")).unwrap()).intent;
        assert_eq!(intent, Intent::Unrecognized);
    }
}
