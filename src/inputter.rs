use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor shared by the search box, the login screen and
/// modal form fields. The cursor counts chars, not bytes.
#[derive(Default, Debug, Clone)]
pub struct Inputter {
    current_input: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        let result = match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.current_input.clear();
                self.cursor = 0;
                self.get()
            }
            (kc, km) => self.key(kc, km),
        };
        trace!("Input {:?} -> {:?}", key.code, result.input);
        result
    }

    /// Replaces the content and puts the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor = s.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor: self.cursor,
        }
    }

    pub fn value(&self) -> &str {
        &self.current_input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor > 0 {
            self.cursor -= 1;
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.cursor < self.current_input.chars().count() {
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor = self.cursor.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor < self.current_input.chars().count() {
            self.cursor += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.cursor = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.cursor = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.byte_pos(), chr);
            self.cursor += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_and_backspace_at_cursor() {
        let mut input = Inputter::default();
        type_str(&mut input, "press");
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Left);
        let r = press(&mut input, KeyCode::Backspace);
        assert_eq!(r.input, "prss");
        assert_eq!(r.cursor, 2);
    }

    #[test]
    fn multibyte_chars_are_handled() {
        let mut input = Inputter::default();
        input.set("₹500");
        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Delete);
        assert_eq!(input.value(), "500");
        type_str(&mut input, "é");
        assert_eq!(input.value(), "é500");
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut input = Inputter::default();
        type_str(&mut input, "abc");
        let r = press(&mut input, KeyCode::Esc);
        assert!(r.canceled && r.finished);
        assert!(r.input.is_empty());
    }

    #[test]
    fn enter_finishes_with_content() {
        let mut input = Inputter::default();
        type_str(&mut input, "TR-101");
        let r = press(&mut input, KeyCode::Enter);
        assert!(r.finished && !r.canceled);
        assert_eq!(r.input, "TR-101");
    }
}
