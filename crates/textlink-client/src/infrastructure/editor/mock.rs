//! Mock focus-field editor for unit and integration testing.
//!
//! # Why a mock editor?
//!
//! A real `FocusTextEditor` implementation talks to the desktop's
//! accessibility or input-method APIs, which:
//!
//! - Require a desktop session with a focused text field to run.
//! - Actually modify whatever field happens to be focused on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! The `MockFocusEditor` replaces field access with an in-memory string.
//! Replacements are also recorded in a `Mutex<Vec<...>>` so test assertions
//! can inspect exactly what was written and in what order.
//!
//! # `should_fail` flag
//!
//! Construct via [`MockFocusEditor::failing`] to make every method return an
//! `EditError::Platform`. This lets you test error-handling paths in callers
//! without needing a broken desktop.

use std::sync::Mutex;

use crate::application::apply_edit::{EditError, FocusTextEditor};

/// A mock editor backed by an in-memory buffer instead of a real text field.
///
/// The buffer and the replacement log live in `Mutex` fields so tests can
/// safely share the editor across threads (e.g., when wrapping it in an `Arc`).
#[derive(Default)]
pub struct MockFocusEditor {
    /// Current content of the simulated focused field.
    pub buffer: Mutex<String>,
    /// Records each (text, append) pair passed to `replace_focus_text`.
    pub replacements: Mutex<Vec<(String, bool)>>,
    /// When `true`, every method immediately returns an `EditError::Platform`.
    pub should_fail: bool,
}

impl MockFocusEditor {
    /// Creates a new editor with an empty buffer and `should_fail = false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an editor whose every call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }
}

impl FocusTextEditor for MockFocusEditor {
    /// Returns the buffer content, or an error if `should_fail` is set.
    ///
    /// The mock has no selection model; `selection_only` returns the whole
    /// buffer as well.
    fn read_focus_text(&self, _selection_only: bool) -> Result<String, EditError> {
        if self.should_fail {
            return Err(EditError::Platform("mock failure".into()));
        }
        Ok(self.buffer.lock().unwrap().clone())
    }

    /// Replaces or appends to the buffer, or returns an error if
    /// `should_fail` is set.
    fn replace_focus_text(&self, text: &str, append: bool) -> Result<(), EditError> {
        if self.should_fail {
            return Err(EditError::Platform("mock failure".into()));
        }
        let mut buffer = self.buffer.lock().unwrap();
        if append {
            buffer.push_str(text);
        } else {
            *buffer = text.to_string();
        }
        self.replacements
            .lock()
            .unwrap()
            .push((text.to_string(), append));
        Ok(())
    }
}
