// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Word recognition from sequences of stable signs.
//!
//! Each time a new sign becomes stable it is appended to a short history. A
//! word is recognized when the most recent signs equal the word's sign
//! sequence, so spelling `H E L L O` yields `hello` on the final `O`.

use std::collections::{BTreeMap, VecDeque};

/// Stable signs remembered for matching.
pub const DEFAULT_HISTORY: usize = 32;

/// Word to sign-sequence table.
pub type SequenceTable = BTreeMap<String, Vec<String>>;

/// True when `recent` ends with `target`.
///
/// A history shorter than the target never matches.
#[must_use]
pub fn ends_with<S: AsRef<str>>(recent: &[S], target: &[S]) -> bool {
    if recent.len() < target.len() {
        return false;
    }
    recent[recent.len() - target.len()..]
        .iter()
        .zip(target)
        .all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Tracks stable signs across frames and reports completed words.
///
/// A sign is recorded on the frame it becomes stable. It is recorded again
/// only after the stable label changes or a frame without a stable label
/// intervenes, so holding one sign does not repeat it.
///
/// ```
/// use sign_caption::sequence::{SequenceTable, WordTracker};
///
/// let mut words = SequenceTable::new();
/// words.insert("hi".to_string(), vec!["H".to_string(), "I".to_string()]);
/// let mut tracker = WordTracker::new(words);
///
/// assert_eq!(tracker.observe(Some("H")), None);
/// assert_eq!(tracker.observe(Some("I")).as_deref(), Some("hi"));
/// ```
#[derive(Debug, Clone)]
pub struct WordTracker {
    words: SequenceTable,
    capacity: usize,
    recent: VecDeque<String>,
    last_stable: Option<String>,
}

impl WordTracker {
    /// Tracker over `words` with the default history length.
    #[must_use]
    pub fn new(words: SequenceTable) -> Self {
        let longest = words.values().map(Vec::len).max().unwrap_or(0);
        Self {
            words,
            capacity: DEFAULT_HISTORY.max(longest),
            recent: VecDeque::new(),
            last_stable: None,
        }
    }

    /// Feed the stable label of one frame; return the word completed by it.
    ///
    /// When several words end with the recorded history the longest wins, then
    /// the alphabetically first.
    pub fn observe(&mut self, stable: Option<&str>) -> Option<String> {
        let Some(label) = stable else {
            self.last_stable = None;
            return None;
        };
        if self.last_stable.as_deref() == Some(label) {
            return None;
        }
        self.last_stable = Some(label.to_string());

        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(label.to_string());
        self.recent.make_contiguous();
        let (recent, _) = self.recent.as_slices();

        self.words
            .iter()
            .filter(|(_, signs)| !signs.is_empty() && ends_with(recent, signs))
            .max_by(|(a, x), (b, y)| x.len().cmp(&y.len()).then_with(|| b.cmp(a)))
            .map(|(word, _)| word.clone())
    }

    /// Recorded signs, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    /// Forget the recorded signs.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.last_stable = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &[&str])]) -> SequenceTable {
        entries
            .iter()
            .map(|(word, signs)| {
                (word.to_string(), signs.iter().map(|s| s.to_string()).collect())
            })
            .collect()
    }

    #[test]
    fn test_ends_with_suffix() {
        assert!(ends_with(&["X", "H", "I"], &["H", "I"]));
        assert!(ends_with(&["H", "I"], &["H", "I"]));
        assert!(!ends_with(&["H", "I", "X"], &["H", "I"]));
        assert!(ends_with::<&str>(&["A"], &[]));
    }

    #[test]
    fn test_history_shorter_than_target_never_matches() {
        assert!(!ends_with(&["L", "O"], &["H", "E", "L", "L", "O"]));
        assert!(!ends_with::<&str>(&[], &["A"]));

        let mut tracker = WordTracker::new(table(&[("hello", &["H", "E", "L", "L", "O"])]));
        assert_eq!(tracker.observe(Some("L")), None);
        assert_eq!(tracker.observe(Some("O")), None);
    }

    #[test]
    fn test_word_completes_on_last_sign() {
        let mut tracker = WordTracker::new(table(&[("hello", &["H", "E", "L", "L", "O"])]));
        let stream = [
            Some("X"),
            Some("H"),
            Some("E"),
            Some("L"),
            None,
            Some("L"),
            Some("L"),
        ];
        for stable in stream {
            assert_eq!(tracker.observe(stable), None);
        }
        assert_eq!(tracker.observe(Some("O")).as_deref(), Some("hello"));
        assert_eq!(
            tracker.recent().collect::<Vec<_>>(),
            vec!["X", "H", "E", "L", "L", "O"]
        );
    }

    #[test]
    fn test_held_sign_recorded_once() {
        let mut tracker = WordTracker::new(table(&[("aa", &["A", "A"])]));
        for _ in 0..5 {
            assert_eq!(tracker.observe(Some("A")), None);
        }
        assert_eq!(tracker.recent().count(), 1);
        tracker.observe(None);
        assert_eq!(tracker.observe(Some("A")).as_deref(), Some("aa"));
    }

    #[test]
    fn test_longest_word_wins() {
        let mut tracker = WordTracker::new(table(&[
            ("no", &["N", "O"]),
            ("piano", &["P", "I", "A", "N", "O"]),
            ("zo", &["N", "O"]),
        ]));
        for sign in ["P", "I", "A", "N"] {
            tracker.observe(Some(sign));
        }
        assert_eq!(tracker.observe(Some("O")).as_deref(), Some("piano"));

        tracker.reset();
        tracker.observe(Some("N"));
        assert_eq!(tracker.observe(Some("O")).as_deref(), Some("no"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = WordTracker::new(SequenceTable::new());
        for i in 0..(DEFAULT_HISTORY + 5) {
            tracker.observe(Some(if i % 2 == 0 { "A" } else { "B" }));
        }
        assert_eq!(tracker.recent().count(), DEFAULT_HISTORY);
    }
}
