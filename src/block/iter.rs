//! Block iterator
//!
//! A [`BlockIter`] is a cursor over a [`BlockList`]: the current block and a
//! byte offset inside it, in `[0, size]`. An offset equal to the block size is
//! only canonical on the last block; [`BlockIter::normalize`] moves any other
//! end-of-block position to the start of the following block.
//!
//! All reads and navigation go through this type. Iterators are `Copy`, so
//! throwaway scans ("where does this line start?") work on a copy.

use super::{Block, BlockId, BlockList, BlockPos, Decoding};
use crate::character::Character;
use std::borrow::Cow;
use std::fmt;

/// Cursor position inside its line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Column {
    /// Characters between the line start and the cursor
    pub chars: usize,
    /// Display cells between the line start and the cursor
    pub width: usize,
}

#[derive(Clone, Copy)]
pub struct BlockIter<'a> {
    list: &'a BlockList,
    blk: BlockId,
    offset: usize,
    decoding: Decoding,
}

impl fmt::Debug for BlockIter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockIter")
            .field("blk", &self.blk)
            .field("offset", &self.offset)
            .field("decoding", &self.decoding)
            .finish()
    }
}

/// Position of the next newline in `rest`, the unread tail of `block`
fn newline_in(block: &Block, rest: &[u8]) -> Option<usize> {
    if block.single_trailing_newline() {
        Some(rest.len() - 1)
    } else if block.newline_count() == 0 {
        None
    } else {
        memchr::memchr(b'\n', rest)
    }
}

impl<'a> BlockIter<'a> {
    /// Iterator at the start of `list`
    #[must_use]
    pub fn new(list: &'a BlockList, decoding: Decoding) -> Self {
        Self {
            list,
            blk: list.first(),
            offset: 0,
            decoding,
        }
    }

    #[must_use]
    pub fn list(&self) -> &'a BlockList {
        self.list
    }

    #[must_use]
    pub fn decoding(&self) -> Decoding {
        self.decoding
    }

    /// Snapshot for a mutation through the list
    #[must_use]
    pub fn pos(&self) -> BlockPos {
        self.list.make_pos(self.blk, self.offset)
    }

    fn block(&self) -> &'a Block {
        self.list.block(self.blk)
    }

    pub fn normalize(&mut self) {
        if self.offset == self.block().size() {
            if let Some(next) = self.list.next(self.blk) {
                self.blk = next;
                self.offset = 0;
            }
        }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.offset == self.block().size() && self.list.next(self.blk).is_none()
    }

    #[must_use]
    pub fn is_bof(&self) -> bool {
        self.offset == 0 && self.list.prev(self.blk).is_none()
    }

    /// True at the start of the document or right after a newline
    #[must_use]
    pub fn is_bol(&self) -> bool {
        let mut tmp = *self;
        matches!(tmp.prev_byte(), None | Some(b'\n'))
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        self.normalize();
        let byte = *self.block().data().get(self.offset)?;
        self.offset += 1;
        Some(byte)
    }

    pub fn prev_byte(&mut self) -> Option<u8> {
        if self.offset == 0 {
            self.blk = self.list.prev(self.blk)?;
            self.offset = self.block().size();
        }
        self.offset -= 1;
        Some(self.block().data()[self.offset])
    }

    /// Byte under the cursor without moving
    #[must_use]
    pub fn get_byte(&self) -> Option<u8> {
        let mut tmp = *self;
        tmp.next_byte()
    }

    /// Up to `max` bytes following the cursor, across blocks
    fn peek_ahead(&self, max: usize) -> ([u8; 4], usize) {
        let mut buf = [0u8; 4];
        let mut tmp = *self;
        let mut n = 0;
        while n < max {
            match tmp.next_byte() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        (buf, n)
    }

    /// Up to `max` bytes preceding the cursor, in document order
    fn peek_behind(&self, max: usize) -> ([u8; 4], usize) {
        let mut buf = [0u8; 4];
        let mut tmp = *self;
        let mut n = 0;
        while n < max {
            match tmp.prev_byte() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        buf[..n].reverse();
        (buf, n)
    }

    /// Advance one character. Returns it with its length in bytes, `None` at
    /// the end of the document.
    pub fn next_char(&mut self) -> Option<(Character, usize)> {
        self.normalize();
        let lead = *self.block().data().get(self.offset)?;
        if lead < 0x80 || self.decoding == Decoding::Bytes {
            self.offset += 1;
            return Some((Character::from(lead), 1));
        }
        let (buf, n) = self.peek_ahead(self.decoding.max_char_len());
        let (ch, len) = self.decoding.decode_first(&buf[..n]);
        self.skip_bytes(len);
        Some((ch, len))
    }

    /// Retreat one character. `None` at the start of the document.
    pub fn prev_char(&mut self) -> Option<(Character, usize)> {
        if self.offset > 0 {
            let byte = self.block().data()[self.offset - 1];
            if byte < 0x80 || self.decoding == Decoding::Bytes {
                self.offset -= 1;
                return Some((Character::from(byte), 1));
            }
        }
        let (buf, n) = self.peek_behind(self.decoding.max_char_len());
        if n == 0 {
            return None;
        }
        let (ch, len) = self.decoding.decode_last(&buf[..n]);
        self.back_bytes(len);
        Some((ch, len))
    }

    /// Character under the cursor without moving
    #[must_use]
    pub fn get_char(&self) -> Option<(Character, usize)> {
        let mut tmp = *self;
        tmp.next_char()
    }

    /// Panics when moving past the end of the document
    pub fn skip_bytes(&mut self, count: usize) {
        let mut count = count;
        let mut avail = self.block().size() - self.offset;
        while count > avail {
            count -= avail;
            self.blk = match self.list.next(self.blk) {
                Some(next) => next,
                None => panic!("skip_bytes moved past the end of the document"),
            };
            self.offset = 0;
            avail = self.block().size();
        }
        self.offset += count;
    }

    /// Panics when moving before the start of the document
    pub fn back_bytes(&mut self, count: usize) {
        let mut count = count;
        while count > self.offset {
            count -= self.offset;
            self.blk = match self.list.prev(self.blk) {
                Some(prev) => prev,
                None => panic!("back_bytes moved before the start of the document"),
            };
            self.offset = self.block().size();
        }
        self.offset -= count;
    }

    /// Move to the beginning of the current line. Returns bytes moved.
    pub fn bol(&mut self) -> usize {
        let mut moved = 0;
        loop {
            let block = self.block();
            let before = &block.data()[..self.offset];
            let skip_scan = block.newline_count() == 0
                || (block.single_trailing_newline() && self.offset < block.size());
            let found = if skip_scan {
                None
            } else {
                memchr::memrchr(b'\n', before)
            };
            match found {
                Some(i) => {
                    moved += self.offset - (i + 1);
                    self.offset = i + 1;
                    break;
                }
                None => {
                    moved += self.offset;
                    self.offset = 0;
                    // Only an unaligned layout lets a line start in an earlier block
                    match self.list.prev(self.blk) {
                        Some(prev) if !self.list.block(prev).ends_with_newline() => {
                            self.blk = prev;
                            self.offset = self.block().size();
                        }
                        _ => break,
                    }
                }
            }
        }
        self.normalize();
        moved
    }

    /// Move to the end of the current line, before its newline. Returns bytes moved.
    pub fn eol(&mut self) -> usize {
        let mut moved = 0;
        loop {
            self.normalize();
            let block = self.block();
            let rest = &block.data()[self.offset..];
            if rest.is_empty() {
                break;
            }
            match newline_in(block, rest) {
                Some(i) => {
                    self.offset += i;
                    moved += i;
                    break;
                }
                None => {
                    moved += rest.len();
                    self.offset = block.size();
                }
            }
        }
        moved
    }

    /// Move past the next newline, or to the end of the document.
    /// Returns bytes moved.
    pub fn eat_line(&mut self) -> usize {
        let mut moved = 0;
        loop {
            self.normalize();
            let block = self.block();
            let rest = &block.data()[self.offset..];
            if rest.is_empty() {
                break;
            }
            match newline_in(block, rest) {
                Some(i) => {
                    self.offset += i + 1;
                    moved += i + 1;
                    break;
                }
                None => {
                    moved += rest.len();
                    self.offset = block.size();
                }
            }
        }
        moved
    }

    /// Move to the beginning of the next line. The iterator stays put and 0 is
    /// returned when there is no next line; the empty position after a final
    /// newline does not count as one.
    pub fn next_line(&mut self) -> usize {
        let mut tmp = *self;
        let moved = tmp.eat_line();
        if moved == 0 || tmp.is_eof() {
            return 0;
        }
        *self = tmp;
        moved
    }

    /// Move to the beginning of the previous line. Returns 0 without moving
    /// when the cursor is on the first line.
    pub fn prev_line(&mut self) -> usize {
        let mut tmp = *self;
        let mut moved = tmp.bol();
        if tmp.prev_byte().is_none() {
            return 0;
        }
        moved += 1 + tmp.bol();
        *self = tmp;
        moved
    }

    /// Absolute positioning; offsets past the end clamp to the end
    pub fn goto_offset(&mut self, offset: usize) {
        let list = self.list;
        let mut remaining = offset;
        for id in list.ids() {
            let size = list.block(id).size();
            if remaining <= size {
                self.blk = id;
                self.offset = remaining;
                return;
            }
            remaining -= size;
        }
        self.blk = list.last();
        self.offset = list.block(self.blk).size();
    }

    /// Move to the start of line `line` (0-based). Returns `false`, leaving
    /// the iterator at the end of the document, when there is no such line.
    pub fn goto_line(&mut self, line: usize) -> bool {
        let list = self.list;
        let mut blk = list.first();
        let mut nl = 0;
        while let Some(next) = list.next(blk) {
            let count = list.block(blk).newline_count();
            if nl + count >= line {
                break;
            }
            nl += count;
            blk = next;
        }

        self.blk = blk;
        self.offset = 0;
        while nl < line {
            if self.eat_line() == 0 || !self.is_bol() {
                return false;
            }
            nl += 1;
        }
        self.normalize();
        true
    }

    /// Absolute byte offset. Walks every preceding block; callers that need
    /// offsets often should track them incrementally.
    #[must_use]
    pub fn get_offset(&self) -> usize {
        let mut offset = 0;
        for id in self.list.ids() {
            if id == self.blk {
                break;
            }
            offset += self.list.block(id).size();
        }
        offset + self.offset
    }

    /// Number of newlines before the cursor, i.e. its 0-based line
    #[must_use]
    pub fn line_number(&self) -> usize {
        let mut nl = 0;
        for id in self.list.ids() {
            if id == self.blk {
                break;
            }
            nl += self.list.block(id).newline_count();
        }
        nl + super::count_newlines(&self.block().data()[..self.offset])
    }

    /// Copy `len` bytes starting at the cursor.
    ///
    /// Panics if the document has fewer than `len` bytes left; callers
    /// validate lengths first.
    #[must_use]
    pub fn get_bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(len);
        let mut blk = self.blk;
        let mut offset = self.offset;
        while buf.len() < len {
            let data = self.list.block(blk).data();
            let count = (len - buf.len()).min(data.len() - offset);
            buf.extend_from_slice(&data[offset..offset + count]);
            if buf.len() < len {
                blk = match self.list.next(blk) {
                    Some(next) => next,
                    None => panic!("get_bytes: {} bytes requested past the end of the document", len),
                };
                offset = 0;
            }
        }
        buf
    }

    /// The line starting at the cursor, without its newline.
    ///
    /// The cursor must sit at a line start. The result borrows the block when
    /// the line lies inside one, which always holds for line-aligned lists.
    pub fn fill_line_ref(&mut self) -> Cow<'a, [u8]> {
        debug_assert!(self.is_bol(), "line reference requested away from a line start");
        self.line_from_here(false)
    }

    /// Like [`fill_line_ref`](Self::fill_line_ref), newline included when present
    pub fn fill_line_with_terminator_ref(&mut self) -> Cow<'a, [u8]> {
        debug_assert!(self.is_bol(), "line reference requested away from a line start");
        self.line_from_here(true)
    }

    fn line_from_here(&mut self, with_newline: bool) -> Cow<'a, [u8]> {
        self.normalize();
        let block = self.block();
        let rest = &block.data()[self.offset..];
        if rest.is_empty() {
            return Cow::Borrowed(rest);
        }
        if let Some(i) = newline_in(block, rest) {
            let end = if with_newline { i + 1 } else { i };
            return Cow::Borrowed(&rest[..end]);
        }
        if self.list.next(self.blk).is_none() {
            return Cow::Borrowed(rest);
        }

        let mut end = *self;
        let len = end.eol();
        let mut line = self.get_bytes(len);
        if with_newline && !end.is_eof() {
            line.push(b'\n');
        }
        Cow::Owned(line)
    }

    /// Bytes back to the start of the current line, and that line
    #[must_use]
    pub fn fetch_this_line(&self) -> (usize, Cow<'a, [u8]>) {
        let mut tmp = *self;
        let count = tmp.bol();
        (count, tmp.fill_line_ref())
    }

    /// Character index and display width of the cursor within its line
    #[must_use]
    pub fn display_column(&self, tab_width: usize) -> Column {
        let mut tmp = *self;
        let back = tmp.bol();
        let mut column = Column::default();
        let mut consumed = 0;
        while consumed < back {
            let Some((ch, len)) = tmp.next_char() else {
                break;
            };
            consumed += len;
            column.chars += 1;
            column.width += ch.render_width(column.width, tab_width);
        }
        column
    }

    /// Consume the iterator into a character iterator
    #[must_use]
    pub fn chars(self) -> Chars<'a> {
        Chars { iter: self }
    }
}

/// Characters from an iterator's position to the end of the document
#[derive(Debug, Clone)]
pub struct Chars<'a> {
    iter: BlockIter<'a>,
}

impl Iterator for Chars<'_> {
    type Item = Character;

    fn next(&mut self) -> Option<Character> {
        self.iter.next_char().map(|(ch, _)| ch)
    }
}

#[cfg(test)]
#[path = "iter_tests.rs"]
mod tests;
