//! Editable form state: three text fields and the auto-search toggle.

use unicode_segmentation::UnicodeSegmentation;

use disentangler_types::{FormField, FormInput};

/// Single-line text field with grapheme-aware cursor movement.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DraftInput {
    text: String,
    cursor: usize,
}

impl DraftInput {
    /// Field pre-filled with `text`, cursor at the end.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let mut draft = Self::default();
        draft.set_text(text);
        draft
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in graphemes.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The text before the cursor, for cursor placement.
    #[must_use]
    pub fn text_before_cursor(&self) -> &str {
        &self.text[..self.byte_index()]
    }

    pub fn set_text(&mut self, text: &str) {
        text.clone_into(&mut self.text);
        self.move_cursor_end();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index();
        self.text.insert(index, new_char);
        self.move_cursor_right();
    }

    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }

        let start = self.byte_index_at(self.cursor - 1);
        let end = self.byte_index_at(self.cursor);
        self.text.replace_range(start..end, "");
        self.move_cursor_left();
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor >= self.grapheme_count() {
            return;
        }

        let start = self.byte_index_at(self.cursor);
        let end = self.byte_index_at(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn delete_word_backwards(&mut self) {
        while self.cursor > 0 && self.grapheme_is_separator(self.cursor - 1) {
            self.delete_char();
        }
        while self.cursor > 0 && !self.grapheme_is_separator(self.cursor - 1) {
            self.delete_char();
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = self.cursor.saturating_add(1).min(self.grapheme_count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Whitespace and the list delimiter both end a word.
    fn grapheme_is_separator(&self, index: usize) -> bool {
        self.text
            .graphemes(true)
            .nth(index)
            .is_some_and(|grapheme| grapheme.chars().all(|c| c.is_whitespace() || c == ','))
    }

    fn byte_index(&self) -> usize {
        self.byte_index_at(self.cursor)
    }

    fn byte_index_at(&self, grapheme_index: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

/// The hypothesis form.
#[derive(Debug, Clone)]
pub struct Form {
    output: DraftInput,
    inputs: DraftInput,
    constants: DraftInput,
    auto_search: bool,
    focus: FormField,
}

impl Default for Form {
    fn default() -> Self {
        Self {
            output: DraftInput::default(),
            inputs: DraftInput::default(),
            constants: DraftInput::default(),
            auto_search: false,
            focus: FormField::Output,
        }
    }
}

impl Form {
    #[must_use]
    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn set_focus(&mut self, field: FormField) {
        self.focus = field;
    }

    pub fn focus_next(&mut self) {
        let index = Self::position(self.focus);
        self.focus = FormField::ALL[(index + 1) % FormField::ALL.len()];
    }

    pub fn focus_prev(&mut self) {
        let index = Self::position(self.focus);
        let len = FormField::ALL.len();
        self.focus = FormField::ALL[(index + len - 1) % len];
    }

    fn position(field: FormField) -> usize {
        FormField::ALL
            .iter()
            .position(|candidate| *candidate == field)
            .unwrap_or(0)
    }

    /// `None` for the auto-search toggle.
    #[must_use]
    pub fn draft(&self, field: FormField) -> Option<&DraftInput> {
        match field {
            FormField::Output => Some(&self.output),
            FormField::Inputs => Some(&self.inputs),
            FormField::Constants => Some(&self.constants),
            FormField::AutoSearch => None,
        }
    }

    pub fn draft_mut(&mut self, field: FormField) -> Option<&mut DraftInput> {
        match field {
            FormField::Output => Some(&mut self.output),
            FormField::Inputs => Some(&mut self.inputs),
            FormField::Constants => Some(&mut self.constants),
            FormField::AutoSearch => None,
        }
    }

    /// The text field under focus, if focus is on one.
    pub fn focused_draft_mut(&mut self) -> Option<&mut DraftInput> {
        self.draft_mut(self.focus)
    }

    #[must_use]
    pub fn auto_search(&self) -> bool {
        self.auto_search
    }

    pub fn set_auto_search(&mut self, enabled: bool) {
        self.auto_search = enabled;
    }

    pub fn toggle_auto_search(&mut self) {
        self.auto_search = !self.auto_search;
    }

    /// Raw field values as they read right now.
    #[must_use]
    pub fn snapshot(&self) -> FormInput {
        FormInput {
            output: self.output.text().to_string(),
            inputs: self.inputs.text().to_string(),
            constants: self.constants.text().to_string(),
            auto_search: self.auto_search,
        }
    }
}
