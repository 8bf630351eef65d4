use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

// Minimal line editor for the search box.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize, // position in chars, not bytes
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (kc, km) => self.key(kc, km),
        }
    }

    // Preload the editor, e.g. with the current search text.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = s.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
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
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let pos = self.byte_pos(self.cursor_pos);
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn key(&mut self, code: KeyCode, _modifier: KeyModifiers) -> InputResult {
        if let Some(chr) = code.as_char() {
            let pos = self.byte_pos(self.cursor_pos);
            self.current_input.insert(pos, chr);
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_appends_at_the_cursor() {
        let mut input = Inputter::default();
        input.read(KeyCode::Char('a').into());
        input.read(KeyCode::Char('c').into());
        input.read(KeyCode::Left.into());
        let result = input.read(KeyCode::Char('b').into());
        assert_eq!(result.input, "abc");
        assert_eq!(result.cursor_pos, 2);
    }

    #[test]
    fn backspace_removes_before_the_cursor() {
        let mut input = Inputter::default();
        input.set("abc");
        input.read(KeyCode::Left.into());
        let result = input.read(KeyCode::Backspace.into());
        assert_eq!(result.input, "ac");
        assert_eq!(result.cursor_pos, 1);
    }

    #[test]
    fn escape_cancels_and_finishes() {
        let mut input = Inputter::default();
        input.set("abc");
        let result = input.read(KeyCode::Esc.into());
        assert!(result.canceled);
        assert!(result.finished);
        assert_eq!(result.input, "");
    }
}
