//! Block list storage
//!
//! Document bytes live in a circular doubly linked list of blocks kept in an
//! arena. Slot 0 is the sentinel head and never holds data; links are arena
//! indices, so splitting or merging a block never moves unrelated blocks.
//!
//! ## Layout
//!
//! Edits keep blocks made of whole lines: every block except the last ends
//! with `\n`, and a block only grows past the edit size when it holds one
//! line too long to split. Lists built with [`BlockList::from_chunks`] may
//! break lines (or UTF-8 sequences) across blocks; [`BlockIter`] copes with
//! either layout.
//!
//! ## Positions
//!
//! [`BlockIter`] borrows the list, so no iterator survives a mutation.
//! Positions that must outlive one are kept as absolute byte offsets and
//! re-derived with [`BlockIter::goto_offset`]. A [`BlockPos`] snapshot is
//! stamped with the list generation and mutating through a stale one panics.

use crate::constants::blocks::{
    alloc_round, BLOCK_EDIT_SIZE, BLOCK_MERGE_SIZE, LOAD_BLOCK_SIZE,
};
use std::ops::Range;

pub mod iter;
pub mod utf8;

pub use iter::{BlockIter, Chars};
pub use utf8::Decoding;

/// Handle of a block inside its list's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

impl BlockId {
    const HEAD: BlockId = BlockId(0);
}

/// A chunk of document bytes
#[derive(Debug, Clone)]
pub struct Block {
    data: Vec<u8>,
    /// Allocated size, always a multiple of `MIN_ALLOC`
    alloc: usize,
    /// Number of `\n` bytes in `data`
    nl: usize,
}

impl Block {
    /// Allocate an empty block able to hold at least `capacity` bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let alloc = alloc_round(capacity.max(1));
        Self {
            data: Vec::with_capacity(alloc),
            alloc,
            nl: 0,
        }
    }

    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut block = Self::with_capacity(bytes.len());
        block.data.extend_from_slice(bytes);
        block.nl = count_newlines(bytes);
        block
    }

    /// Bytes in use
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes allocated
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.alloc
    }

    #[must_use]
    pub fn newline_count(&self) -> usize {
        self.nl
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn ends_with_newline(&self) -> bool {
        self.data.last() == Some(&b'\n')
    }

    /// The only newline of the block is its last byte, so line lookups inside
    /// it need no scan.
    pub(crate) fn single_trailing_newline(&self) -> bool {
        self.nl == 1 && self.ends_with_newline()
    }

    fn reserve_for(&mut self, size: usize) {
        if size > self.alloc {
            self.alloc = alloc_round(size);
            self.data.reserve_exact(self.alloc - self.data.len());
        }
    }

    fn insert_at(&mut self, offset: usize, bytes: &[u8]) -> usize {
        self.reserve_for(self.size() + bytes.len());
        self.data.splice(offset..offset, bytes.iter().copied());
        let nl = count_newlines(bytes);
        self.nl += nl;
        nl
    }

    fn remove_range(&mut self, offset: usize, count: usize, out: &mut Vec<u8>) -> usize {
        let removed = &self.data[offset..offset + count];
        let nl = count_newlines(removed);
        out.extend_from_slice(removed);
        self.data.drain(offset..offset + count);
        self.nl -= nl;
        nl
    }

    fn append(&mut self, other: Block) {
        self.reserve_for(self.size() + other.size());
        self.data.extend_from_slice(&other.data);
        self.nl += other.nl;
    }

    fn replace_data(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.reserve_for(bytes.len());
        self.data.extend_from_slice(bytes);
        self.nl = count_newlines(bytes);
    }
}

pub(crate) fn count_newlines(bytes: &[u8]) -> usize {
    memchr::memchr_iter(b'\n', bytes).count()
}

/// Cut `data` into ranges of whole lines, each preferably no longer than
/// `size`. A range is only longer when a single line is. The last range may
/// lack a trailing newline.
fn line_chunks(data: &[u8], size: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let limit = start + size;
        if limit >= data.len() {
            ranges.push(start..data.len());
            break;
        }
        let end = match memchr::memrchr(b'\n', &data[start..limit]) {
            Some(i) => start + i + 1,
            None => memchr::memchr(b'\n', &data[limit..])
                .map_or(data.len(), |i| limit + i + 1),
        };
        ranges.push(start..end);
        start = end;
    }
    ranges
}

#[derive(Debug, Clone)]
struct Node {
    prev: BlockId,
    next: BlockId,
    /// `None` for the sentinel head and for free slots
    block: Option<Block>,
}

/// A position snapshot, valid until the next mutation of its list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPos {
    pub(crate) blk: BlockId,
    pub(crate) offset: usize,
    pub(crate) generation: u64,
}

impl BlockPos {
    #[must_use]
    pub fn block(&self) -> BlockId {
        self.blk
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The document's bytes as a circular list of blocks
#[derive(Debug, Clone)]
pub struct BlockList {
    nodes: Vec<Node>,
    free: Vec<BlockId>,
    blocks: usize,
    /// Total bytes
    len: usize,
    /// Total newlines
    nl: usize,
    edit_size: usize,
    merge_size: usize,
    /// Bumped on every mutation
    generation: u64,
}

impl Default for BlockList {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockList {
    /// Empty document: exactly one block of size 0
    #[must_use]
    pub fn new() -> Self {
        let mut list = Self::headless();
        list.push_back(Block::with_capacity(0));
        list
    }

    /// Chunk loaded file bytes into whole-line blocks
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_bytes_with_size(bytes, LOAD_BLOCK_SIZE)
    }

    #[must_use]
    pub fn from_bytes_with_size(bytes: &[u8], chunk_size: usize) -> Self {
        if bytes.is_empty() {
            return Self::new();
        }
        let mut list = Self::headless();
        for range in line_chunks(bytes, chunk_size.max(1)) {
            list.push_back(Block::from_slice(&bytes[range]));
        }
        list
    }

    /// Build a list with exactly the given layout. Empty chunks are skipped.
    /// Lines and UTF-8 sequences may span the resulting block boundaries.
    #[must_use]
    pub fn from_chunks<C: AsRef<[u8]>>(chunks: impl IntoIterator<Item = C>) -> Self {
        let mut list = Self::headless();
        for chunk in chunks {
            let chunk = chunk.as_ref();
            if !chunk.is_empty() {
                list.push_back(Block::from_slice(chunk));
            }
        }
        if list.blocks == 0 {
            list.push_back(Block::with_capacity(0));
        }
        list
    }

    /// Override the split threshold. Blocks smaller than a quarter of it are
    /// merged with their successor after deletes.
    #[must_use]
    pub fn with_edit_size(mut self, edit_size: usize) -> Self {
        self.edit_size = edit_size.max(1);
        self.merge_size = self.edit_size / 4;
        self
    }

    fn headless() -> Self {
        Self {
            nodes: vec![Node {
                prev: BlockId::HEAD,
                next: BlockId::HEAD,
                block: None,
            }],
            free: Vec::new(),
            blocks: 0,
            len: 0,
            nl: 0,
            edit_size: BLOCK_EDIT_SIZE,
            merge_size: BLOCK_MERGE_SIZE,
            generation: 0,
        }
    }

    /// Total document bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of `\n` bytes in the document
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.nl
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    #[must_use]
    pub fn edit_size(&self) -> usize {
        self.edit_size
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn first(&self) -> BlockId {
        self.nodes[BlockId::HEAD.0].next
    }

    #[must_use]
    pub fn last(&self) -> BlockId {
        self.nodes[BlockId::HEAD.0].prev
    }

    /// Following block, `None` at the end of the list
    #[must_use]
    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        let next = self.nodes[id.0].next;
        (next != BlockId::HEAD).then_some(next)
    }

    /// Preceding block, `None` at the start of the list
    #[must_use]
    pub fn prev(&self, id: BlockId) -> Option<BlockId> {
        let prev = self.nodes[id.0].prev;
        (prev != BlockId::HEAD).then_some(prev)
    }

    /// Panics if `id` no longer names a live block
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        match self.nodes.get(id.0).and_then(|n| n.block.as_ref()) {
            Some(block) => block,
            None => panic!("stale block reference {:?}", id),
        }
    }

    fn block_mut(&mut self, id: BlockId) -> &mut Block {
        match self.nodes.get_mut(id.0).and_then(|n| n.block.as_mut()) {
            Some(block) => block,
            None => panic!("stale block reference {:?}", id),
        }
    }

    /// Block handles in document order
    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(Some(self.first()), |&id| self.next(id))
    }

    /// Raw block payloads in document order
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.ids().map(|id| self.block(id).data())
    }

    /// Copy the whole document out
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Iterator at the start of the document
    #[must_use]
    pub fn iter(&self, decoding: Decoding) -> BlockIter<'_> {
        BlockIter::new(self, decoding)
    }

    /// Canonical position of absolute byte `offset` (clamped to the end)
    #[must_use]
    pub fn pos_at(&self, offset: usize) -> BlockPos {
        let mut iter = self.iter(Decoding::Bytes);
        iter.goto_offset(offset);
        iter.normalize();
        iter.pos()
    }

    pub(crate) fn make_pos(&self, blk: BlockId, offset: usize) -> BlockPos {
        BlockPos {
            blk,
            offset,
            generation: self.generation,
        }
    }

    fn check_pos(&self, pos: BlockPos) {
        assert_eq!(
            pos.generation, self.generation,
            "stale block position used after the list changed"
        );
        assert!(
            pos.offset <= self.block(pos.blk).size(),
            "block position {} past block end {}",
            pos.offset,
            self.block(pos.blk).size()
        );
    }

    fn is_only_block(&self, id: BlockId) -> bool {
        let node = &self.nodes[id.0];
        node.prev == BlockId::HEAD && node.next == BlockId::HEAD
    }

    fn push_back(&mut self, block: Block) {
        self.len += block.size();
        self.nl += block.newline_count();
        let last = self.last();
        self.link_after(last, block);
    }

    /// Link `block` after `after`. Totals are the caller's business.
    fn link_after(&mut self, after: BlockId, block: Block) -> BlockId {
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0].block = Some(block);
                id
            }
            None => {
                self.nodes.push(Node {
                    prev: BlockId::HEAD,
                    next: BlockId::HEAD,
                    block: Some(block),
                });
                BlockId(self.nodes.len() - 1)
            }
        };
        let next = self.nodes[after.0].next;
        self.nodes[id.0].prev = after;
        self.nodes[id.0].next = next;
        self.nodes[after.0].next = id;
        self.nodes[next.0].prev = id;
        self.blocks += 1;
        self.generation += 1;
        id
    }

    /// Unlink a block and release its slot. Totals are the caller's business.
    fn remove_block(&mut self, id: BlockId) -> Block {
        assert!(id != BlockId::HEAD, "the sentinel head cannot be removed");
        let block = match self.nodes[id.0].block.take() {
            Some(block) => block,
            None => panic!("block {:?} removed twice", id),
        };
        let (prev, next) = (self.nodes[id.0].prev, self.nodes[id.0].next);
        self.nodes[prev.0].next = next;
        self.nodes[next.0].prev = prev;
        self.free.push(id);
        self.blocks -= 1;
        self.generation += 1;
        block
    }

    /// Insert `bytes` at `pos`. Returns the number of newlines inserted.
    ///
    /// The block grows in place while it stays under the edit size (or still
    /// holds a single line); otherwise it is re-cut into whole-line blocks.
    pub fn insert(&mut self, pos: BlockPos, bytes: &[u8]) -> usize {
        self.check_pos(pos);
        if bytes.is_empty() {
            return 0;
        }

        let (mut blk, mut offset) = (pos.blk, pos.offset);
        if offset == self.block(blk).size() {
            if let Some(next) = self.next(blk) {
                blk = next;
                offset = 0;
            }
        }

        let block = self.block(blk);
        let new_size = block.size() + bytes.len();
        let grow_in_place = new_size <= block.capacity()
            || new_size <= self.edit_size
            || (block.newline_count() <= 1 && memchr::memchr(b'\n', bytes).is_none());

        let nl = if grow_in_place {
            self.block_mut(blk).insert_at(offset, bytes)
        } else {
            self.split_and_insert(blk, offset, bytes)
        };

        self.len += bytes.len();
        self.nl += nl;
        self.generation += 1;
        nl
    }

    fn split_and_insert(&mut self, blk: BlockId, offset: usize, bytes: &[u8]) -> usize {
        let old = self.block(blk);
        let mut combined = Vec::with_capacity(old.size() + bytes.len());
        combined.extend_from_slice(&old.data()[..offset]);
        combined.extend_from_slice(bytes);
        combined.extend_from_slice(&old.data()[offset..]);

        let mut ranges = line_chunks(&combined, self.edit_size).into_iter();
        let pieces = ranges.len();
        if let Some(first) = ranges.next() {
            self.block_mut(blk).replace_data(&combined[first]);
        }
        let mut after = blk;
        for range in ranges {
            after = self.link_after(after, Block::from_slice(&combined[range]));
        }

        tracing::trace!(pieces, size = combined.len(), "split block");
        count_newlines(bytes)
    }

    /// Remove `len` bytes starting at `pos` and return them.
    ///
    /// Panics if fewer than `len` bytes follow `pos`.
    pub fn delete(&mut self, pos: BlockPos, len: usize) -> Vec<u8> {
        self.check_pos(pos);
        let mut buf = Vec::with_capacity(len);
        if len == 0 {
            return buf;
        }

        let mut blk = pos.blk;
        let mut offset = pos.offset;
        // The block at the deletion point can empty out and disappear
        let saved_prev = (offset == 0).then(|| self.nodes[blk.0].prev);
        let mut deleted_nl = 0;

        while buf.len() < len {
            let next = self.nodes[blk.0].next;
            let block = self.block_mut(blk);
            let count = (len - buf.len()).min(block.size() - offset);
            deleted_nl += block.remove_range(offset, count, &mut buf);
            let emptied = block.is_empty();
            if emptied && !self.is_only_block(blk) {
                self.remove_block(blk);
            }
            assert!(
                buf.len() == len || next != BlockId::HEAD,
                "delete of {} bytes runs past the end of the document",
                len
            );
            offset = 0;
            blk = next;
        }

        self.len -= len;
        self.nl -= deleted_nl;
        self.generation += 1;

        let at = match saved_prev {
            Some(prev) => {
                let next = self.nodes[prev.0].next;
                if next == BlockId::HEAD {
                    prev
                } else {
                    next
                }
            }
            None => pos.blk,
        };
        if at != BlockId::HEAD {
            self.merge_with_next(at);
        }
        buf
    }

    /// Join `blk` with its successor when it no longer ends a line or when
    /// both are small.
    fn merge_with_next(&mut self, blk: BlockId) {
        let Some(next) = self.next(blk) else {
            return;
        };
        let block = self.block(blk);
        let combined = block.size() + self.block(next).size();
        let broken_line = !block.is_empty() && !block.ends_with_newline();
        let small = block.size() < self.merge_size && combined <= self.edit_size;
        if broken_line || small {
            let next_block = self.remove_block(next);
            self.block_mut(blk).append(next_block);
            tracing::trace!(size = combined, broken_line, "merged block");
        }
    }

    /// Every block but the last ends with a newline
    #[must_use]
    pub fn is_line_aligned(&self) -> bool {
        let last = self.last();
        self.ids()
            .filter(|&id| id != last)
            .all(|id| self.block(id).ends_with_newline())
    }

    /// Recompute every cached count and link. Panics on the first mismatch.
    pub fn check_invariants(&self) {
        let mut len = 0;
        let mut nl = 0;
        let mut count = 0;
        let mut prev = BlockId::HEAD;
        let mut id = self.first();
        while id != BlockId::HEAD {
            let node = &self.nodes[id.0];
            assert_eq!(node.prev, prev, "broken prev link at {:?}", id);
            let block = self.block(id);
            assert!(
                block.size() <= block.capacity(),
                "block {:?} size {} exceeds capacity {}",
                id,
                block.size(),
                block.capacity()
            );
            assert_eq!(
                block.newline_count(),
                count_newlines(block.data()),
                "stale newline count in block {:?}",
                id
            );
            assert!(
                !block.is_empty() || self.is_only_block(id),
                "empty block {:?} left in list",
                id
            );
            len += block.size();
            nl += block.newline_count();
            count += 1;
            prev = id;
            id = node.next;
        }
        assert_eq!(self.nodes[BlockId::HEAD.0].prev, prev, "broken head link");
        assert!(count >= 1, "list has no blocks");
        assert_eq!(count, self.blocks, "block count out of sync");
        assert_eq!(len, self.len, "byte total out of sync");
        assert_eq!(nl, self.nl, "newline total out of sync");
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
