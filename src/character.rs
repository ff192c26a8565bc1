use std::fmt::{self, Display, Formatter};
use unicode_width::UnicodeWidthChar;

/// One decoded unit of buffer content, as produced by the block iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Character {
    /// A Unicode scalar value
    Unicode(char),

    /// A byte that does not start a valid UTF-8 sequence, or any byte >= 0x80
    /// when the buffer is decoded byte-wise
    Byte(u8),

    /// A horizontal tab
    Tab,

    /// A newline
    Newline,

    /// ASCII control character (rendered visibly, e.g. ^C)
    Control(u8),
}

impl Character {
    /// Render the character to a formatter/output
    pub fn render(&self, out: &mut impl fmt::Write) -> fmt::Result {
        match self {
            Character::Unicode(c) => write!(out, "{}", c),
            Character::Byte(b) => write!(out, "\\x{:02X}", b),
            Character::Tab => write!(out, "\t"),
            Character::Newline => writeln!(out),
            Character::Control(0x7F) => write!(out, "^?"),
            // 0 -> ^@, 1 -> ^A, ...
            Character::Control(b) => write!(out, "^{}", (b + 64) as char),
        }
    }

    /// Display width of the character when it starts at column `col`
    pub fn render_width(&self, col: usize, tab_width: usize) -> usize {
        match self {
            Character::Unicode(c) => UnicodeWidthChar::width(*c).unwrap_or(0),
            Character::Byte(_) => 4, // \xNN
            Character::Tab => {
                let tab_width = tab_width.max(1);
                tab_width - (col % tab_width)
            }
            Character::Newline => 0,
            Character::Control(_) => 2, // ^C
        }
    }

    /// Number of bytes this character occupies in the document
    pub fn len_utf8(&self) -> usize {
        match self {
            Character::Unicode(c) => c.len_utf8(),
            _ => 1,
        }
    }

    /// Append the document bytes of this character to `buf`
    pub fn encode_utf8(&self, buf: &mut Vec<u8>) {
        match self {
            Character::Unicode(c) => {
                let mut tmp = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
            }
            Character::Byte(b) | Character::Control(b) => buf.push(*b),
            Character::Tab => buf.push(b'\t'),
            Character::Newline => buf.push(b'\n'),
        }
    }
}

impl Display for Character {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.render(f)
    }
}

impl From<char> for Character {
    fn from(c: char) -> Self {
        match c {
            '\t' => Character::Tab,
            '\n' => Character::Newline,
            c if c.is_ascii_control() => Character::Control(c as u8),
            c => Character::Unicode(c),
        }
    }
}

impl From<u8> for Character {
    fn from(b: u8) -> Self {
        if b.is_ascii() {
            Character::from(b as char)
        } else {
            Character::Byte(b)
        }
    }
}

#[cfg(test)]
#[path = "character_tests.rs"]
mod tests;
