/// One in-progress inline edit of a row's comment cell.
///
/// The buffer opens pre-populated and fully selected, so the first typed
/// character (or Backspace/Delete) replaces the whole text, like the entry
/// popup of a desktop table editor. At most one session exists at a time;
/// the owner drops it to cancel. The cursor is a character index, never a
/// byte index, since comments are routinely Cyrillic.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub row: usize,
    pub original: String,
    pub input: String,
    pub cursor: usize,
    pub selected_all: bool,
}

impl EditSession {
    pub fn new(row: usize, text: &str) -> Self {
        Self {
            row,
            original: text.to_string(),
            input: text.to_string(),
            cursor: text.chars().count(),
            selected_all: true,
        }
    }

    /// True when confirming would be a no-op.
    pub fn unchanged(&self) -> bool {
        self.input == self.original
    }

    pub fn select_all(&mut self) {
        self.selected_all = true;
    }

    pub fn insert_char(&mut self, c: char) {
        self.replace_selection();
        let at = self.byte_at(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.take_selection() {
            return;
        }
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_at(self.cursor - 1);
        self.input.remove(at);
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        if self.take_selection() {
            return;
        }
        if self.cursor >= self.char_len() {
            return;
        }
        let at = self.byte_at(self.cursor);
        self.input.remove(at);
    }

    pub fn left(&mut self) {
        self.selected_all = false;
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.selected_all = false;
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.selected_all = false;
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.selected_all = false;
        self.cursor = self.char_len();
    }

    pub fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn replace_selection(&mut self) {
        if self.selected_all {
            self.input.clear();
            self.cursor = 0;
            self.selected_all = false;
        }
    }

    fn take_selection(&mut self) -> bool {
        if self.selected_all {
            self.input.clear();
            self.cursor = 0;
            self.selected_all = false;
            true
        } else {
            false
        }
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
