//! Transcript cleanup applied to every captured utterance before classification

use std::fmt;

/// Normalized text of one spoken turn: lowercase, trimmed, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utterance(String);

impl Utterance {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Utterance {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase and trim raw transcription; `None` when nothing was said.
pub fn normalize(raw: Option<&str>) -> Option<Utterance> {
    let text = raw?.trim().to_lowercase();
    // Lowercasing can expose new edge whitespace for some scripts
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(Utterance(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_trims() {
        let u = normalize(Some("  Open Notepad \n")).unwrap();
        assert_eq!(u.as_str(), "open notepad");
    }

    #[test]
    fn test_empty_is_no_utterance() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
        assert_eq!(normalize(Some("   \t ")), None);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize(Some("  Send Hello TO Sam ")).unwrap();
        let twice = normalize(Some(once.as_str())).unwrap();
        assert_eq!(once, twice);
    }
}
