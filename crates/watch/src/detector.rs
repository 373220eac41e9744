//! Detects when the author finishes a thought.
//!
//! The detector owns one snapshot of last-seen text per watched document and
//! decides, on every (debounced) change, whether the new suffix completes a
//! sentence.  It never consults the busy gate itself; the host drops
//! triggers when the gate is held.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Characters that terminate a completed thought.
const TERMINAL_CHARS: [char; 4] = ['.', '!', '?', '\n'];

/// Signals that the author just completed a sentence/paragraph.  Immutable,
/// consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    /// The last paragraph of the document, the pipeline input.
    pub paragraph: String,
    pub source_path: PathBuf,
    pub at: DateTime<Utc>,
}

/// Turns a document path into plain text.  The document's on-disk format is
/// a collaborator concern; the default implementation reads UTF-8 files
/// as-is.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

pub struct ChangeDetector {
    extractor: Box<dyn TextExtractor>,
    /// Last-seen text per document.  Created on first observed change,
    /// replaced on every subsequent one, lives for the process lifetime.
    snapshots: HashMap<PathBuf, String>,
}

impl ChangeDetector {
    pub fn new(extractor: Box<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            snapshots: HashMap::new(),
        }
    }

    /// Process one debounced change notification.
    ///
    /// Emits a trigger iff the unseen suffix is non-empty and the whole
    /// text's last non-blank character terminates a thought.  A document
    /// seen for the first time treats its entire content as the suffix.
    /// Unreadable files are logged and skipped, never fatal.
    pub fn handle_change(&mut self, path: &Path) -> Option<TriggerEvent> {
        let current = match self.extractor.extract(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), ?err, "failed to extract document text; skipping");
                return None;
            }
        };

        let previous_len = self
            .snapshots
            .get(path)
            .map(|previous| previous.len())
            .unwrap_or(0);
        let diff = suffix_after(&current, previous_len);
        let diff_empty = diff.is_empty();
        self.snapshots.insert(path.to_path_buf(), current.clone());

        if diff_empty {
            return None;
        }

        let cleaned = strip_continuations(&current);
        if !ends_terminal(&cleaned) {
            debug!(path = %path.display(), "change does not complete a thought");
            return None;
        }

        let paragraph = last_paragraph(&cleaned);
        if paragraph.is_empty() {
            return None;
        }

        Some(TriggerEvent {
            paragraph,
            source_path: path.to_path_buf(),
            at: Utc::now(),
        })
    }

    /// Last snapshot recorded for `path`, if any.
    pub fn snapshot(&self, path: &Path) -> Option<&str> {
        self.snapshots.get(path).map(String::as_str)
    }
}

// ── Text helpers ──────────────────────────────────────────────────────────────

/// The byte suffix of `text` after `len`, clamped to a char boundary so a
/// snapshot taken mid-edit can never cause a panic.
fn suffix_after(text: &str, len: usize) -> &str {
    if len >= text.len() {
        return "";
    }
    let mut start = len;
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Drop stray continuation-backslash artifacts (a backslash at end of line)
/// left behind by the source document format, so formatting noise cannot
/// suppress or fake thought detection.
fn strip_continuations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(newline) = rest.find('\n') {
        let line = &rest[..newline];
        out.push_str(line.strip_suffix('\\').unwrap_or(line));
        out.push('\n');
        rest = &rest[newline + 1..];
    }
    out.push_str(rest.strip_suffix('\\').unwrap_or(rest));
    out
}

/// True when the text's last non-blank character is a sentence terminator.
/// Trailing spaces and tabs are ignored; a trailing newline itself counts as
/// terminal.
fn ends_terminal(text: &str) -> bool {
    let trimmed = text.trim_end_matches([' ', '\t']);
    trimmed
        .chars()
        .last()
        .is_some_and(|last| TERMINAL_CHARS.contains(&last))
}

/// The text segment after the final blank line, or the whole text when no
/// blank line exists.
fn last_paragraph(text: &str) -> String {
    let trimmed = text.trim_end();
    match trimmed.rfind("\n\n") {
        Some(i) => trimmed[i + 2..].trim().to_string(),
        None => trimmed.trim().to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Extractor backed by a mutable in-memory map, so tests control exactly
    /// what each "file" contains without touching the filesystem.
    #[derive(Clone, Default)]
    struct FakeExtractor {
        texts: Arc<Mutex<HashMap<PathBuf, String>>>,
    }

    impl FakeExtractor {
        fn set(&self, path: &str, text: &str) {
            self.texts
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), text.to_string());
        }
    }

    impl TextExtractor for FakeExtractor {
        fn extract(&self, path: &Path) -> Result<String> {
            self.texts
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unreadable: {}", path.display()))
        }
    }

    fn detector() -> (ChangeDetector, FakeExtractor) {
        let fake = FakeExtractor::default();
        (ChangeDetector::new(Box::new(fake.clone())), fake)
    }

    // ── Trigger law ────────────────────────────────────────────────────────

    #[test]
    fn completed_sentence_emits_trigger_with_last_paragraph() {
        let (mut detector, fake) = detector();
        fake.set("/n/doc.md", "Ideas for app X.");

        let trigger = detector.handle_change(Path::new("/n/doc.md")).unwrap();
        assert_eq!(trigger.paragraph, "Ideas for app X.");
        assert_eq!(trigger.source_path, PathBuf::from("/n/doc.md"));
    }

    #[test]
    fn unterminated_text_does_not_trigger() {
        let (mut detector, fake) = detector();
        fake.set("/n/doc.md", "Ideas for app");

        assert!(detector.handle_change(Path::new("/n/doc.md")).is_none());
    }

    #[test]
    fn empty_diff_is_a_no_op_even_when_text_is_terminal() {
        let (mut detector, fake) = detector();
        fake.set("/n/doc.md", "Done thought.");
        assert!(detector.handle_change(Path::new("/n/doc.md")).is_some());

        // Same content again: nothing new was written.
        assert!(detector.handle_change(Path::new("/n/doc.md")).is_none());
    }

    #[test]
    fn terminal_test_uses_whole_text_not_just_the_diff() {
        let (mut detector, fake) = detector();
        fake.set("/n/doc.md", "First thought.");
        detector.handle_change(Path::new("/n/doc.md"));

        // The appended diff ("!") alone is terminal, and so is the whole
        // text; but an appended mid-word fragment must not trigger even
        // though earlier text contains terminators.
        fake.set("/n/doc.md", "First thought. And some mo");
        assert!(detector.handle_change(Path::new("/n/doc.md")).is_none());

        fake.set("/n/doc.md", "First thought. And some more!");
        assert!(detector.handle_change(Path::new("/n/doc.md")).is_some());
    }

    #[test]
    fn paragraph_is_segment_after_final_blank_line() {
        let (mut detector, fake) = detector();
        fake.set(
            "/n/doc.md",
            "Old paragraph about gardens.\n\nNew paragraph about app X.",
        );

        let trigger = detector.handle_change(Path::new("/n/doc.md")).unwrap();
        assert_eq!(trigger.paragraph, "New paragraph about app X.");
    }

    #[test]
    fn trailing_newline_counts_as_terminal() {
        let (mut detector, fake) = detector();
        fake.set("/n/doc.md", "A full line of thought\n");

        assert!(detector.handle_change(Path::new("/n/doc.md")).is_some());
    }

    #[test]
    fn continuation_backslashes_are_stripped_before_the_terminal_test() {
        let (mut detector, fake) = detector();
        // The format writes "sentence.\"; the artifact must not suppress
        // detection of the terminal '.'.
        fake.set("/n/doc.md", "A finished sentence.\\");

        let trigger = detector.handle_change(Path::new("/n/doc.md")).unwrap();
        assert_eq!(trigger.paragraph, "A finished sentence.");
    }

    #[test]
    fn first_sighting_treats_entire_content_as_diff() {
        let (mut detector, fake) = detector();
        fake.set("/n/new.md", "Brand new document!");

        assert!(detector.handle_change(Path::new("/n/new.md")).is_some());
    }

    #[test]
    fn unreadable_file_is_skipped_without_panicking() {
        let (mut detector, _fake) = detector();
        assert!(detector.handle_change(Path::new("/n/missing.md")).is_none());
    }

    #[test]
    fn snapshot_is_updated_even_without_a_trigger() {
        let (mut detector, fake) = detector();
        fake.set("/n/doc.md", "partial tex");
        detector.handle_change(Path::new("/n/doc.md"));

        assert_eq!(detector.snapshot(Path::new("/n/doc.md")), Some("partial tex"));
    }

    // ── Helper edge cases ──────────────────────────────────────────────────

    #[test]
    fn suffix_after_clamps_to_char_boundaries() {
        let text = "héllo more";
        // Index 2 falls inside the two-byte 'é'.
        assert_eq!(suffix_after(text, 2), "llo more");
        assert_eq!(suffix_after(text, text.len()), "");
        assert_eq!(suffix_after(text, text.len() + 10), "");
    }

    #[test]
    fn question_and_exclamation_marks_are_terminal() {
        assert!(ends_terminal("really?"));
        assert!(ends_terminal("yes!"));
        assert!(ends_terminal("done.  \t"));
        assert!(!ends_terminal("pending,"));
        assert!(!ends_terminal(""));
    }
}
