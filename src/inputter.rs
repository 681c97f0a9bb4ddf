use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single-line editor used for the row filter. The cursor counts characters,
/// not bytes.
#[derive(Debug, Default)]
pub struct Inputter {
    text: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
    /// The text differs from before the key.
    pub changed: bool,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        let before = self.text.clone();
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.finished = true,
            (KeyCode::Esc, _) => {
                self.finished = true;
                self.canceled = true;
            }
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, _) => self.cursor = (self.cursor + 1).min(self.char_len()),
            (KeyCode::Home, _) => self.cursor = 0,
            (KeyCode::End, _) => self.cursor = self.char_len(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.text.clear();
                self.cursor = 0;
            }
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => self.insert(chr),
            _ => {}
        }
        let mut result = self.get();
        result.changed = before != self.text;
        trace!("Input {:?} cursor {}", self.text, self.cursor);
        result
    }

    /// Starts an edit session with `s` and the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.text = s.to_string();
        self.cursor = self.char_len();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.text.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor: self.cursor,
            changed: false,
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.finished = false;
        self.canceled = false;
    }

    fn insert(&mut self, chr: char) {
        let at = self.byte_pos(self.cursor);
        self.text.insert(at, chr);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_pos(self.cursor);
            self.text.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_pos(self.cursor);
            self.text.remove(at);
        }
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(inputter: &mut Inputter, s: &str) -> InputResult {
        s.chars()
            .map(|c| inputter.read(key(KeyCode::Char(c))))
            .last()
            .unwrap_or_default()
    }

    #[test]
    fn typing_and_enter() {
        let mut inputter = Inputter::default();
        let result = type_str(&mut inputter, "mscu");
        assert_eq!(result.input, "mscu");
        assert!(result.changed);
        assert!(!result.finished);

        let result = inputter.read(key(KeyCode::Enter));
        assert!(result.finished);
        assert!(!result.canceled);
        assert!(!result.changed);
        assert_eq!(result.input, "mscu");
    }

    #[test]
    fn backspace_removes_before_cursor() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "abcd");
        inputter.read(key(KeyCode::Left));
        inputter.read(key(KeyCode::Left));
        let result = inputter.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "acd");
        assert_eq!(result.cursor, 1);
        assert!(result.changed);
    }

    #[test]
    fn multibyte_characters_are_edited_whole() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "Zürich");
        inputter.read(key(KeyCode::Home));
        inputter.read(key(KeyCode::Right));
        inputter.read(key(KeyCode::Right));
        let result = inputter.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "Zrich");

        let result = inputter.read(key(KeyCode::Delete));
        assert_eq!(result.input, "Zich");
        assert_eq!(result.cursor, 1);
    }

    #[test]
    fn cursor_moves_do_not_change_text() {
        let mut inputter = Inputter::default();
        inputter.set("la");
        assert_eq!(inputter.get().cursor, 2);
        let result = inputter.read(key(KeyCode::Right));
        assert_eq!(result.cursor, 2);
        assert!(!result.changed);
        let result = inputter.read(key(KeyCode::Left));
        assert_eq!(result.cursor, 1);
        assert!(!result.changed);
    }

    #[test]
    fn escape_cancels_and_keeps_text() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "ny");
        let result = inputter.read(key(KeyCode::Esc));
        assert!(result.finished);
        assert!(result.canceled);

        inputter.clear();
        assert_eq!(inputter.get(), InputResult::default());
    }

    #[test]
    fn ctrl_u_clears_line() {
        let mut inputter = Inputter::default();
        inputter.set("seal");
        let result = inputter.read(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(result.input, "");
        assert!(result.changed);
    }
}
