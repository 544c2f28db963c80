//! Line editor for character-mode sessions
//!
//! Holds the line being typed, the cursor and the history. Every editing
//! method returns the bytes to echo so the client's screen follows the
//! buffer; the session decides when to write them.

fn left(n: usize) -> String {
    if n == 0 {
        String::new()
    } else {
        format!("\x1b[{}D", n)
    }
}

fn right(n: usize) -> String {
    if n == 0 {
        String::new()
    } else {
        format!("\x1b[{}C", n)
    }
}

#[derive(Debug, Default)]
pub(crate) struct LineEditor {
    buffer: Vec<char>,
    cursor: usize,
    history: Vec<String>,
    /// Entry shown by Up/Down; `None` while editing a fresh line.
    history_index: Option<usize>,
    /// The fresh line saved while browsing history.
    draft: String,
    max_history: usize,
}

impl LineEditor {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn line(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn before_cursor(&self) -> String {
        self.buffer[..self.cursor].iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Record a submitted line unless it is blank or repeats the last entry.
    pub fn push_history(&mut self, line: &str) {
        if line.trim().is_empty() || self.history.last().is_some_and(|last| last == line) {
            return;
        }
        self.history.push(line.to_string());
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }

    /// Take the line and reset for the next one.
    pub fn take_line(&mut self) -> String {
        let line = self.line();
        self.clear();
        line
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_index = None;
        self.draft.clear();
    }

    pub fn insert_str(&mut self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let count = chars.len();
        self.buffer.splice(self.cursor..self.cursor, chars);
        self.cursor += count;
        let tail: String = self.buffer[self.cursor..].iter().collect();
        format!("{}{}{}", text, tail, left(self.buffer.len() - self.cursor))
    }

    pub fn insert(&mut self, c: char) -> String {
        self.insert_str(c.encode_utf8(&mut [0; 4]))
    }

    pub fn backspace(&mut self) -> String {
        if self.cursor == 0 {
            return String::new();
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        let tail: String = self.buffer[self.cursor..].iter().collect();
        format!("\x08{} {}", tail, left(tail.chars().count() + 1))
    }

    pub fn delete(&mut self) -> String {
        if self.cursor >= self.buffer.len() {
            return String::new();
        }
        self.buffer.remove(self.cursor);
        let tail: String = self.buffer[self.cursor..].iter().collect();
        format!("{} {}", tail, left(tail.chars().count() + 1))
    }

    pub fn move_left(&mut self) -> String {
        if self.cursor == 0 {
            return String::new();
        }
        self.cursor -= 1;
        left(1)
    }

    pub fn move_right(&mut self) -> String {
        if self.cursor >= self.buffer.len() {
            return String::new();
        }
        self.cursor += 1;
        right(1)
    }

    pub fn move_home(&mut self) -> String {
        let moved = self.cursor;
        self.cursor = 0;
        left(moved)
    }

    pub fn move_end(&mut self) -> String {
        let moved = self.buffer.len() - self.cursor;
        self.cursor = self.buffer.len();
        right(moved)
    }

    /// Ctrl-K
    pub fn kill_to_end(&mut self) -> String {
        self.buffer.truncate(self.cursor);
        "\x1b[K".to_string()
    }

    /// Ctrl-U
    pub fn kill_to_start(&mut self) -> String {
        let moved = self.cursor;
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        let line = self.line();
        format!("{}{}\x1b[K{}", left(moved), line, left(line.chars().count()))
    }

    /// Replace the whole line, e.g. with a history entry.
    fn replace(&mut self, line: &str) -> String {
        let erase = format!("{}\x1b[K", left(self.cursor));
        self.buffer = line.chars().collect();
        self.cursor = self.buffer.len();
        format!("{}{}", erase, line)
    }

    pub fn history_up(&mut self) -> String {
        let index = match self.history_index {
            None if self.history.is_empty() => return String::new(),
            None => {
                self.draft = self.line();
                self.history.len() - 1
            }
            Some(0) => return String::new(),
            Some(i) => i - 1,
        };
        self.history_index = Some(index);
        let entry = self.history[index].clone();
        self.replace(&entry)
    }

    pub fn history_down(&mut self) -> String {
        let Some(index) = self.history_index else {
            return String::new();
        };
        if index + 1 < self.history.len() {
            self.history_index = Some(index + 1);
            let entry = self.history[index + 1].clone();
            self.replace(&entry)
        } else {
            self.history_index = None;
            let draft = std::mem::take(&mut self.draft);
            self.replace(&draft)
        }
    }

    /// Redraw the line after the prompt was printed again, leaving the
    /// cursor where it was.
    pub fn redraw(&self) -> String {
        format!("{}{}", self.line(), left(self.buffer.len() - self.cursor))
    }
}
