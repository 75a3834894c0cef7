//! Editable input line: text plus cursor offset.

use unicode_segmentation::UnicodeSegmentation;

/// Single editable line with a cursor.
///
/// `cursor` is a byte offset into `text`, always on a `char` boundary, with
/// `0 <= cursor <= text.len()`. Only decoder-driven edits and history
/// restoration mutate the buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Cursor position in char cells, for render math.
    pub fn cursor_chars(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    /// Replace the whole line and move the cursor to the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
    }

    /// Clear the line and reset the cursor.
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Take the line out, leaving an empty buffer.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn insert_char(&mut self, ch: char) {
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let before = &self.text[..self.cursor];
        let last = before.graphemes(true).next_back();
        self.cursor = self.cursor.saturating_sub(last.map(str::len).unwrap_or(1));
    }

    pub fn move_right(&mut self) {
        if self.cursor >= self.text.len() {
            return;
        }
        let after = &self.text[self.cursor..];
        let first = after.graphemes(true).next();
        self.cursor = (self.cursor + first.map(str::len).unwrap_or(1)).min(self.text.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Delete the grapheme before the cursor; no-op at offset 0.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let before = &self.text[..self.cursor];
        let last = before.graphemes(true).next_back();
        let start = self.cursor.saturating_sub(last.map(str::len).unwrap_or(1));
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    /// Delete the grapheme at the cursor; no-op at end of line.
    pub fn delete_forward(&mut self) {
        if self.cursor >= self.text.len() {
            return;
        }
        let after = &self.text[self.cursor..];
        let first = after.graphemes(true).next();
        let end = (self.cursor + first.map(str::len).unwrap_or(1)).min(self.text.len());
        self.text.replace_range(self.cursor..end, "");
    }

    /// Kill the whole line.
    pub fn kill_line(&mut self) {
        self.clear();
    }

    /// Kill from the cursor to the end of the line.
    pub fn kill_to_end(&mut self) {
        self.text.truncate(self.cursor);
    }

    /// Delete the word before the cursor: trailing whitespace collapses with
    /// the word, deletion stops one past the previous space (or at 0).
    pub fn delete_word_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let before = &self.text[..self.cursor];
        let trimmed_len = before.trim_end().len();
        let start = match before[..trimmed_len].rfind(' ') {
            Some(pos) => pos + 1,
            None => 0,
        };
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
    }
}

#[cfg(test)]
mod tests {
    use super::LineBuffer;

    fn type_str(buffer: &mut LineBuffer, text: &str) {
        for ch in text.chars() {
            buffer.insert_char(ch);
        }
    }

    #[test]
    fn inserts_in_order_and_advances_cursor() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "hello");
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.cursor(), 5);
    }

    #[test]
    fn insert_mid_line() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "helo");
        buffer.move_left();
        buffer.insert_char('l');
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.cursor(), 4);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut buffer = LineBuffer::new();
        buffer.backspace();
        assert_eq!(buffer.text(), "");
        assert_eq!(buffer.cursor(), 0);

        type_str(&mut buffer, "ab");
        buffer.move_home();
        buffer.backspace();
        assert_eq!(buffer.text(), "ab");
    }

    #[test]
    fn delete_forward_at_end_is_noop() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "ab");
        buffer.delete_forward();
        assert_eq!(buffer.text(), "ab");

        buffer.move_home();
        buffer.delete_forward();
        assert_eq!(buffer.text(), "b");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn delete_word_back_collapses_trailing_whitespace() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "foo bar  ");
        buffer.delete_word_back();
        assert_eq!(buffer.text(), "foo ");
        assert_eq!(buffer.cursor(), 4);
    }

    #[test]
    fn delete_word_back_reaches_line_start() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "word");
        buffer.delete_word_back();
        assert_eq!(buffer.text(), "");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn kill_line_and_kill_to_end() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "hello world");
        buffer.move_home();
        for _ in 0..5 {
            buffer.move_right();
        }
        buffer.kill_to_end();
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.cursor(), 5);

        buffer.kill_line();
        assert_eq!(buffer.text(), "");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn movement_is_bounded() {
        let mut buffer = LineBuffer::new();
        type_str(&mut buffer, "ab");
        buffer.move_right();
        assert_eq!(buffer.cursor(), 2);
        buffer.move_home();
        buffer.move_left();
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn grapheme_aware_backspace() {
        let mut buffer = LineBuffer::new();
        buffer.set_text("ok👍");
        buffer.backspace();
        assert_eq!(buffer.text(), "ok");
        assert_eq!(buffer.cursor(), 2);
    }
}
