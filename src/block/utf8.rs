//! Character decoding strategies
//!
//! The strategy is picked once when a buffer is opened and copied into every
//! iterator. Malformed UTF-8 never fails: each offending byte decodes as one
//! opaque [`Character::Byte`], so iteration always makes progress.

use crate::character::Character;

/// How buffer bytes are grouped into characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoding {
    /// Multi-byte UTF-8 sequences are one character
    #[default]
    Utf8,
    /// Every byte is one character
    Bytes,
}

impl Decoding {
    /// Longest byte sequence a single character can occupy
    #[must_use]
    pub fn max_char_len(self) -> usize {
        match self {
            Decoding::Utf8 => 4,
            Decoding::Bytes => 1,
        }
    }

    /// Decode the character at the start of `bytes`
    #[must_use]
    pub fn decode_first(self, bytes: &[u8]) -> (Character, usize) {
        match self {
            Decoding::Utf8 => decode_first(bytes),
            Decoding::Bytes => (Character::from(bytes[0]), 1),
        }
    }

    /// Decode the character ending at the end of `bytes`
    #[must_use]
    pub fn decode_last(self, bytes: &[u8]) -> (Character, usize) {
        match self {
            Decoding::Utf8 => decode_last(bytes),
            Decoding::Bytes => (Character::from(bytes[bytes.len() - 1]), 1),
        }
    }
}

/// Length of the sequence a lead byte announces, `None` if it cannot lead one
#[must_use]
pub fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

#[must_use]
pub fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Decode the first character of a non-empty slice
#[must_use]
pub fn decode_first(bytes: &[u8]) -> (Character, usize) {
    let lead = bytes[0];
    if lead < 0x80 {
        return (Character::from(lead), 1);
    }
    if let Some(seq) = sequence_len(lead).and_then(|len| bytes.get(..len)) {
        // from_utf8 rejects overlong forms, surrogates and values past U+10FFFF
        if let Some(c) = std::str::from_utf8(seq).ok().and_then(|s| s.chars().next()) {
            return (Character::from(c), seq.len());
        }
    }
    (Character::Byte(lead), 1)
}

/// Decode the character that ends a non-empty slice
#[must_use]
pub fn decode_last(bytes: &[u8]) -> (Character, usize) {
    let n = bytes.len();
    let last = bytes[n - 1];
    if last < 0x80 {
        return (Character::from(last), 1);
    }
    if is_continuation(last) {
        for len in 2..=n.min(4) {
            let start = n - len;
            if is_continuation(bytes[start]) {
                continue;
            }
            let (ch, used) = decode_first(&bytes[start..]);
            if used == len {
                return (ch, len);
            }
            break;
        }
    }
    (Character::Byte(last), 1)
}
