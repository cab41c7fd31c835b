use std::ops::{Add, AddAssign};

/// A position in the input text.
///
/// `offset` is a byte offset, `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.offset.cmp(&other.offset)
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line={}, col={}", self.line, self.column)
    }
}

impl Cursor {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Moves the cursor past the character.
impl AddAssign<char> for Cursor {
    fn add_assign(&mut self, ch: char) {
        self.offset += ch.len_utf8();

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Add<char> for Cursor {
    type Output = Self;

    fn add(mut self, ch: char) -> Self::Output {
        self += ch;
        self
    }
}

/// Moves the cursor past the text.
impl AddAssign<&str> for Cursor {
    fn add_assign(&mut self, text: &str) {
        text.chars().for_each(|ch| *self += ch);
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
/// The location of a token in the input text.
///
/// `to` is the position of the last character of the token.
pub struct Span {
    pub from: Cursor,
    pub to: Cursor,
}

impl From<Cursor> for Span {
    fn from(value: Cursor) -> Self {
        Self {
            from: value,
            to: value,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.from)
    }
}

impl Span {
    pub fn new(from: Cursor, to: Cursor) -> Self {
        Self { from, to }
    }

    /// Span covering `text`, starting at `from`.
    pub fn covering(from: Cursor, text: &str) -> Self {
        let mut to = from;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if chars.peek().is_some() {
                to += ch;
            }
        }

        Self { from, to }
    }
}
