//! [`ActionHistory`] – bounded ring of executed-action summaries.
//!
//! Purely advisory: the last few entries are folded into future oracle
//! prompts as context. Nothing downstream depends on it for correctness.

use std::collections::VecDeque;
use std::sync::Mutex;

use stormbot_types::ActionCommand;

/// Entries kept before the oldest is dropped.
const HISTORY_CAP: usize = 15;

/// Longest summary before truncation.
const SUMMARY_MAX_CHARS: usize = 20;

/// Ring buffer of short text summaries of executed actions.
#[derive(Default)]
pub struct ActionHistory {
    entries: Mutex<VecDeque<String>>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `command`, summarised as its speech text (or the action token
    /// when it said nothing), truncated for prompt budget.
    pub fn record(&self, command: &ActionCommand) {
        let source = if command.speech.is_empty() {
            command.kind.as_token()
        } else {
            command.speech.as_str()
        };
        let summary = if source.chars().count() > SUMMARY_MAX_CHARS {
            let head: String = source.chars().take(SUMMARY_MAX_CHARS).collect();
            format!("{head}...")
        } else {
            source.to_string()
        };

        let mut entries = self.lock_entries();
        entries.push_back(summary);
        while entries.len() > HISTORY_CAP {
            entries.pop_front();
        }
    }

    /// The most recent `n` summaries in chronological order.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let entries = self.lock_entries();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stormbot_types::ActionKind;

    fn speak(speech: &str) -> ActionCommand {
        ActionCommand {
            kind: ActionKind::Speak,
            speed: 0,
            duration: 0.1,
            angle: 0,
            speech: speech.to_string(),
        }
    }

    #[test]
    fn silent_commands_are_summarised_by_kind() {
        let history = ActionHistory::new();
        history.record(&ActionCommand {
            kind: ActionKind::TurnRight,
            speed: 30,
            duration: 1.0,
            angle: 90,
            speech: String::new(),
        });
        assert_eq!(history.recent(3), vec!["turn_right".to_string()]);
    }

    #[test]
    fn long_speech_is_truncated_with_ellipsis() {
        let history = ActionHistory::new();
        history.record(&speak("this is a very long announcement indeed"));
        let entries = history.recent(1);
        assert_eq!(entries[0], "this is a very long ...");
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let history = ActionHistory::new();
        for i in 0..20 {
            history.record(&speak(&format!("entry {i}")));
        }
        assert_eq!(history.len(), 15);
        let recent = history.recent(1);
        assert_eq!(recent[0], "entry 19");
        // Oldest surviving entry is number 5.
        let all = history.recent(15);
        assert_eq!(all[0], "entry 5");
    }

    #[test]
    fn recent_returns_chronological_order() {
        let history = ActionHistory::new();
        history.record(&speak("one"));
        history.record(&speak("two"));
        history.record(&speak("three"));
        assert_eq!(history.recent(2), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn recent_on_empty_history_is_empty() {
        let history = ActionHistory::new();
        assert!(history.recent(3).is_empty());
        assert!(history.is_empty());
    }
}
