//! The command-line editor.
//!
//! A UTF-8 buffer with a byte cursor and an optional selection. Every
//! edit re-derives the input mode (see [`crate::mode`]); commit strips
//! cosmetic separators, parses, and either hands the objects to the
//! caller or positions the cursor on the syntax error and restores the
//! separators for further editing.

use rpl_core::object::Value;
use rpl_core::parse;
use rpl_core::settings::Settings;

use crate::mode::{self, EditMode};

/// Editor state.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    buffer: String,
    cursor: usize,
    select: Option<usize>,
    mode: EditMode,
}

/// Result of committing the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    /// Nothing to do, the buffer was empty.
    Empty,
    /// Parsed objects ready to enter, buffer cleared.
    Objects(Vec<Value>),
    /// Syntax error; the cursor now sits at the offending byte.
    SyntaxError {
        /// Offset reported by the parser, in stripped-buffer bytes.
        offset: usize,
    },
}

impl Editor {
    /// An empty editor in stack mode.
    pub fn new() -> Editor {
        Editor::default()
    }

    /// The buffer contents.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor byte offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current input mode.
    pub fn mode(&self) -> EditMode {
        if self.buffer.is_empty() && self.cursor == 0 && self.mode == EditMode::Stack {
            EditMode::Stack
        } else {
            self.mode
        }
    }

    /// Whether an edit session is open.
    pub fn is_editing(&self) -> bool {
        self.mode != EditMode::Stack || !self.buffer.is_empty()
    }

    /// Begin editing, from stack mode.
    pub fn open(&mut self) {
        if self.mode == EditMode::Stack {
            self.mode = EditMode::Direct;
        }
    }

    /// Load existing text for re-editing, cursor at the end.
    pub fn load(&mut self, text: &str) {
        self.buffer = text.to_owned();
        self.cursor = self.buffer.len();
        self.rescan();
    }

    /// Insert text at the cursor, auto-pairing delimiters per mode.
    /// This is also the soft-menu programmatic entry point.
    pub fn insert(&mut self, text: &str) {
        self.open();
        self.delete_selection();
        let pair = match (self.mode, text) {
            (EditMode::Text, _) => None,
            (_, "\"") => Some('"'),
            (_, "(") => Some(')'),
            (_, "[") => Some(']'),
            (_, "{") => Some('}'),
            (_, "«") => Some('»'),
            (_, "'") if self.mode != EditMode::Algebraic => Some('\''),
            _ => None,
        };
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
        if let Some(close) = pair {
            self.buffer.insert(self.cursor, close);
        }
        self.rescan();
    }

    /// Delete backwards over one code point, or the selection.
    pub fn backspace(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.cursor == 0 {
            return;
        }
        let prev = self.buffer[..self.cursor]
            .chars()
            .next_back()
            .map(char::len_utf8)
            .unwrap_or(0);
        self.buffer.drain(self.cursor - prev..self.cursor);
        self.cursor -= prev;
        self.rescan();
    }

    fn delete_selection(&mut self) -> bool {
        let Some(select) = self.select.take() else {
            return false;
        };
        let (lo, hi) = if select < self.cursor {
            (select, self.cursor)
        } else {
            (self.cursor, select)
        };
        self.buffer.drain(lo..hi);
        self.cursor = lo;
        self.rescan();
        true
    }

    /// Move the cursor one code point left.
    pub fn left(&mut self) {
        if let Some(c) = self.buffer[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.rescan();
        }
    }

    /// Move the cursor one code point right.
    pub fn right(&mut self) {
        if let Some(c) = self.buffer[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
            self.rescan();
        }
    }

    /// Set or clear the selection anchor at the cursor.
    pub fn toggle_select(&mut self) {
        self.select = match self.select {
            Some(_) => None,
            None => Some(self.cursor),
        };
    }

    /// Move the cursor to a byte offset, clamping onto a boundary.
    pub fn seek(&mut self, offset: usize) {
        let mut at = offset.min(self.buffer.len());
        while at > 0 && !self.buffer.is_char_boundary(at) {
            at -= 1;
        }
        self.cursor = at;
        self.rescan();
    }

    fn rescan(&mut self) {
        self.mode = mode::scan(&self.buffer, self.cursor);
    }

    /// Commit the buffer: strip cosmetic separators, parse, clear on
    /// success. On a syntax error the buffer (separators restored)
    /// stays open with the cursor at the offending byte.
    pub fn commit(&mut self, settings: &Settings) -> Commit {
        if self.buffer.trim().is_empty() {
            self.clear();
            return Commit::Empty;
        }
        let stripped: String = match settings.thousands_separator {
            Some(sep) => self.buffer.chars().filter(|c| *c != sep).collect(),
            None => self.buffer.clone(),
        };
        match parse::parse_source(&stripped, settings) {
            Ok(objects) => {
                self.clear();
                Commit::Objects(objects)
            }
            Err(err) => {
                self.seek(map_offset(&self.buffer, &stripped, err.offset, settings));
                Commit::SyntaxError { offset: err.offset }
            }
        }
    }

    /// Reset to stack mode.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.select = None;
        self.mode = EditMode::Stack;
    }
}

/// Map an offset in the stripped text back onto the buffer with its
/// cosmetic separators.
fn map_offset(buffer: &str, stripped: &str, offset: usize, settings: &Settings) -> usize {
    let Some(sep) = settings.thousands_separator else {
        return offset.min(stripped.len());
    };
    let mut stripped_at = 0;
    for (at, c) in buffer.char_indices() {
        if stripped_at >= offset {
            return at;
        }
        if c != sep {
            stripped_at += c.len_utf8();
        }
    }
    buffer.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_auto_pairs_and_tracks_mode() {
        let mut ed = Editor::new();
        assert_eq!(ed.mode(), EditMode::Stack);
        ed.insert("«");
        assert_eq!(ed.buffer(), "«»");
        assert_eq!(ed.mode(), EditMode::Program);
        ed.insert("dup");
        assert_eq!(ed.buffer(), "«dup»");
    }

    #[test]
    fn no_auto_pairing_inside_text() {
        let mut ed = Editor::new();
        ed.insert("\"");
        assert_eq!(ed.buffer(), "\"\"");
        assert_eq!(ed.mode(), EditMode::Text);
        ed.insert("(");
        // Inside a string, parentheses are literal.
        assert_eq!(ed.buffer(), "\"(\"");
    }

    #[test]
    fn backspace_handles_multibyte_glyphs() {
        let mut ed = Editor::new();
        ed.insert("2…4");
        ed.backspace();
        ed.backspace();
        assert_eq!(ed.buffer(), "2");
    }

    #[test]
    fn commit_parses_and_clears() {
        let mut ed = Editor::new();
        ed.insert("2 3 +");
        let settings = Settings::default();
        let Commit::Objects(objects) = ed.commit(&settings) else {
            panic!("expected objects");
        };
        assert_eq!(objects.len(), 3);
        assert!(!ed.is_editing());
    }

    #[test]
    fn syntax_error_positions_the_cursor() {
        let mut ed = Editor::new();
        ed.insert("1 \"oops");
        // Remove the auto-paired closing quote to leave it unterminated.
        ed.seek(ed.buffer().len());
        let before = ed.buffer().to_owned();
        ed.buffer_truncate_for_test(before.len() - 1);
        let settings = Settings::default();
        let Commit::SyntaxError { offset } = ed.commit(&settings) else {
            panic!("expected syntax error");
        };
        assert_eq!(offset, 3);
        assert_eq!(ed.cursor(), 3);
        assert!(ed.is_editing());
    }

    #[test]
    fn commit_strips_separators_and_restores_on_error() {
        let mut settings = Settings::default();
        settings.thousands_separator = Some('\u{202F}');
        let mut ed = Editor::new();
        ed.insert("1\u{202F}234");
        let Commit::Objects(objects) = ed.commit(&settings) else {
            panic!("expected objects");
        };
        assert_eq!(objects, vec![rpl_core::object::Value::Int(1234)]);

        // Error case: buffer keeps its separators.
        ed.insert("1\u{202F}234 \"x");
        let before = ed.buffer().to_owned();
        ed.buffer_truncate_for_test(before.len() - 1);
        let Commit::SyntaxError { .. } = ed.commit(&settings) else {
            panic!("expected syntax error");
        };
        assert!(ed.buffer().contains('\u{202F}'));
    }

    impl Editor {
        fn buffer_truncate_for_test(&mut self, len: usize) {
            self.buffer.truncate(len);
            if self.cursor > len {
                self.cursor = len;
            }
            self.rescan();
        }
    }
}
