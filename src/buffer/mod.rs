//! Text buffer
//!
//! A `Buffer` owns the block list, the change tree and the per-buffer options.
//! Every mutation goes through the methods here so that each one is recorded
//! in history and the cursors of other views stay valid.
//!
//! Cursors are absolute byte offsets. A [`BlockIter`] is derived on demand
//! with [`Buffer::cursor_iter`] and never kept across a mutation.

use crate::block::{BlockIter, BlockList};
use crate::character::Character;
use crate::constants::errors::{
    INVALID_CURSOR, LOAD_FAILED, MSG_NO_FILE_NAME, MSG_READ_ONLY, NO_PATH, OUT_OF_RANGE,
    READ_ONLY, SAVE_FAILED, UNKNOWN_VIEW,
};
use crate::constants::history::{NOTHING_TO_REDO, NOTHING_TO_UNDO};
use crate::constants::ui::NO_NAME;
use crate::error::{ErrorType, Result, RiftError};
use crate::history::{Change, ChangeTree, UndoMerge};
use crate::settings::{BufferOptions, LineEnding};
use std::fmt::{self, Display};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Identifier of a view onto a buffer
pub type ViewId = u64;

/// Saved cursor of a view that is not active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct View {
    id: ViewId,
    offset: usize,
}

/// Shift saved view offsets after `del` bytes at `offset` were replaced by
/// `ins` bytes. Offsets inside the deleted range collapse to its start.
fn fix_views(views: &mut [View], active: Option<ViewId>, offset: usize, del: usize, ins: usize) {
    for view in views.iter_mut().filter(|v| Some(v.id) != active) {
        if view.offset <= offset {
            continue;
        }
        if view.offset < offset + del {
            view.offset = offset;
        } else {
            view.offset = view.offset - del + ins;
        }
    }
}

/// Advance `iter` along its line while the display width stays within `goal`
fn goto_width(iter: &mut BlockIter<'_>, goal: usize, tab_width: usize) {
    let mut width = 0;
    loop {
        let mut tmp = *iter;
        let Some((ch, _)) = tmp.next_char() else {
            break;
        };
        if ch == Character::Newline {
            break;
        }
        let next = width + ch.render_width(width, tab_width);
        if next > goal {
            break;
        }
        width = next;
        *iter = tmp;
    }
}

/// An open document: bytes, history, options and views
#[derive(Debug)]
pub struct Buffer {
    blocks: BlockList,
    history: ChangeTree,
    options: BufferOptions,
    path: Option<PathBuf>,
    /// Cursor of the active view
    cursor: usize,
    /// Display column kept across vertical movement
    preferred_width: Option<usize>,
    views: Vec<View>,
    active: Option<ViewId>,
    next_view_id: ViewId,
}

impl Buffer {
    /// Create an empty buffer with one view
    #[must_use]
    pub fn new(options: BufferOptions) -> Self {
        Self::from_block_list(BlockList::new(), options)
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8], options: BufferOptions) -> Self {
        Self::from_block_list(BlockList::from_bytes(bytes), options)
    }

    /// Wrap an existing block list; the cursor starts at offset 0
    #[must_use]
    pub fn from_block_list(blocks: BlockList, options: BufferOptions) -> Self {
        Buffer {
            blocks,
            history: ChangeTree::new(),
            options,
            path: None,
            cursor: 0,
            preferred_width: None,
            views: vec![View { id: 0, offset: 0 }],
            active: Some(0),
            next_view_id: 1,
        }
    }

    /// Load a file. The bytes are kept verbatim; a CRLF terminator on the
    /// first line selects CRLF as the buffer's line ending.
    pub fn load(path: impl AsRef<Path>, mut options: BufferOptions) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            RiftError::new(
                ErrorType::Io,
                LOAD_FAILED,
                format!("{}: {}", path.display(), e),
            )
        })?;

        if let Some(nl) = memchr::memchr(b'\n', &bytes) {
            options.line_ending = if nl > 0 && bytes[nl - 1] == b'\r' {
                LineEnding::CRLF
            } else {
                LineEnding::LF
            };
        }

        let mut buffer = Self::from_bytes(&bytes, options);
        buffer.path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            bytes = bytes.len(),
            blocks = buffer.blocks.block_count(),
            line_ending = buffer.options.line_ending.as_str(),
            "loaded buffer"
        );
        Ok(buffer)
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Save to the buffer's path
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or_else(|| {
            RiftError::new(ErrorType::Execution, NO_PATH, MSG_NO_FILE_NAME)
        })?;
        self.write_to_file(&path)?;
        self.history.mark_saved();
        Ok(())
    }

    /// Save to `path` and adopt it as the buffer's path
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_to_file(path)?;
        self.path = Some(path.to_path_buf());
        self.history.mark_saved();
        Ok(())
    }

    /// Atomic write through a temporary file in the target directory
    fn write_to_file(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let temp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("file")
        ));

        let write = || -> std::io::Result<()> {
            let file = fs::File::create(&temp_path)?;
            let mut writer = std::io::BufWriter::new(file);
            for chunk in self.blocks.chunks() {
                writer.write_all(chunk)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
            drop(writer);
            fs::rename(&temp_path, path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            RiftError::new(
                ErrorType::Io,
                SAVE_FAILED,
                format!("{}: {}", path.display(), e),
            )
        })?;

        tracing::debug!(path = %path.display(), bytes = self.len(), "saved buffer");
        Ok(())
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    #[must_use]
    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut BufferOptions {
        &mut self.options
    }

    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.options.line_ending
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File name for display, or "[No Name]"
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(NO_NAME)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of newline bytes in the document
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.blocks.line_count()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.blocks.to_vec()
    }

    #[must_use]
    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    #[must_use]
    pub fn history(&self) -> &ChangeTree {
        &self.history
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.history.is_modified()
    }

    /// No file behind the buffer and nothing ever edited
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.path.is_none() && !self.history.has_changes()
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    /// Byte offset of the active view's cursor
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Iterator at the cursor; re-derived on every call
    #[must_use]
    pub fn cursor_iter(&self) -> BlockIter<'_> {
        let mut iter = self.blocks.iter(self.options.decoding);
        iter.goto_offset(self.cursor);
        iter
    }

    /// Place the cursor at `offset`
    pub fn set_cursor(&mut self, offset: usize) -> Result<()> {
        if offset > self.len() {
            return Err(RiftError::new(
                ErrorType::Execution,
                INVALID_CURSOR,
                format!("Cursor position {} out of bounds (len: {})", offset, self.len()),
            ));
        }
        self.moved_to(offset);
        Ok(())
    }

    /// Every movement starts a new undo group and forgets the sticky column
    fn moved_to(&mut self, offset: usize) {
        self.cursor = offset;
        self.preferred_width = None;
        self.history.reset_merge();
    }

    /// Move left by up to `count` characters. Returns characters moved.
    pub fn move_left(&mut self, count: usize) -> usize {
        let mut iter = self.cursor_iter();
        let mut moved = 0;
        while moved < count && iter.prev_char().is_some() {
            moved += 1;
        }
        let offset = iter.get_offset();
        self.moved_to(offset);
        moved
    }

    /// Move right by up to `count` characters. Returns characters moved.
    pub fn move_right(&mut self, count: usize) -> usize {
        let mut iter = self.cursor_iter();
        let mut moved = 0;
        while moved < count && iter.next_char().is_some() {
            moved += 1;
        }
        let offset = iter.get_offset();
        self.moved_to(offset);
        moved
    }

    pub fn move_bol(&mut self) {
        let mut iter = self.cursor_iter();
        iter.bol();
        let offset = iter.get_offset();
        self.moved_to(offset);
    }

    pub fn move_eol(&mut self) {
        let mut iter = self.cursor_iter();
        iter.eol();
        let offset = iter.get_offset();
        self.moved_to(offset);
    }

    pub fn move_bof(&mut self) {
        self.moved_to(0);
    }

    pub fn move_eof(&mut self) {
        let len = self.len();
        self.moved_to(len);
    }

    /// Move up by up to `count` lines, keeping the display column.
    /// Returns lines moved.
    pub fn move_up(&mut self, count: usize) -> usize {
        self.move_vertically(count, true)
    }

    /// Move down by up to `count` lines, keeping the display column.
    /// Returns lines moved.
    pub fn move_down(&mut self, count: usize) -> usize {
        self.move_vertically(count, false)
    }

    fn move_vertically(&mut self, count: usize, up: bool) -> usize {
        let tab_width = self.options.tab_width;
        let mut iter = self.cursor_iter();
        let goal = self
            .preferred_width
            .unwrap_or_else(|| iter.display_column(tab_width).width);

        let mut moved = 0;
        while moved < count {
            let mut tmp = iter;
            tmp.bol();
            let step = if up { tmp.prev_line() } else { tmp.next_line() };
            if step == 0 {
                break;
            }
            iter = tmp;
            moved += 1;
        }
        if moved == 0 {
            return 0;
        }

        goto_width(&mut iter, goal, tab_width);
        let offset = iter.get_offset();
        self.moved_to(offset);
        self.preferred_width = Some(goal);
        moved
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Add a view with its cursor at the start of the document. The view
    /// becomes active when no other view is.
    pub fn open_view(&mut self) -> ViewId {
        let id = self.next_view_id;
        self.next_view_id += 1;
        self.views.push(View { id, offset: 0 });
        if self.active.is_none() {
            self.active = Some(id);
            self.moved_to(0);
        }
        id
    }

    /// Close a view. Returns the number of views left; the owner drops the
    /// buffer when it reaches 0.
    pub fn close_view(&mut self, id: ViewId) -> Result<usize> {
        let index = self.view_index(id)?;
        self.views.remove(index);
        if self.active == Some(id) {
            self.active = None;
            if let Some(next) = self.views.last().copied() {
                self.active = Some(next.id);
                self.moved_to(next.offset);
            }
        }
        Ok(self.views.len())
    }

    /// Make `id` the active view, saving the current cursor in the view
    /// being left
    pub fn set_active_view(&mut self, id: ViewId) -> Result<()> {
        let index = self.view_index(id)?;
        if self.active == Some(id) {
            return Ok(());
        }
        let cursor = self.cursor;
        if let Some(current) = self.active {
            if let Some(view) = self.views.iter_mut().find(|v| v.id == current) {
                view.offset = cursor;
            }
        }
        let offset = self.views[index].offset;
        self.active = Some(id);
        self.moved_to(offset);
        Ok(())
    }

    #[must_use]
    pub fn active_view(&self) -> Option<ViewId> {
        self.active
    }

    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Cursor offset of a view; live for the active one, saved otherwise
    #[must_use]
    pub fn view_cursor(&self, id: ViewId) -> Option<usize> {
        if self.active == Some(id) {
            return Some(self.cursor);
        }
        self.views.iter().find(|v| v.id == id).map(|v| v.offset)
    }

    fn view_index(&self, id: ViewId) -> Result<usize> {
        self.views.iter().position(|v| v.id == id).ok_or_else(|| {
            RiftError::new(
                ErrorType::Execution,
                UNKNOWN_VIEW,
                format!("No view with id {}", id),
            )
        })
    }

    // =========================================================================
    // Mutation primitives
    // =========================================================================

    fn check_writable(&self) -> Result<()> {
        if self.options.read_only {
            return Err(RiftError::new(ErrorType::Execution, READ_ONLY, MSG_READ_ONLY));
        }
        Ok(())
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        if offset.checked_add(len).map_or(true, |end| end > self.len()) {
            return Err(RiftError::new(
                ErrorType::Execution,
                OUT_OF_RANGE,
                format!(
                    "{} bytes at offset {} exceed document length {}",
                    len,
                    offset,
                    self.len()
                ),
            ));
        }
        Ok(())
    }

    fn insert_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_writable()?;
        if bytes.is_empty() {
            return Ok(());
        }
        let offset = self.cursor;
        let pos = self.blocks.pos_at(offset);
        self.blocks.insert(pos, bytes);
        self.history.record_insert(offset, bytes.len());
        fix_views(&mut self.views, self.active, offset, 0, bytes.len());
        self.cursor = offset + bytes.len();
        self.preferred_width = None;
        Ok(())
    }

    fn delete_bytes(&mut self, len: usize, move_after: bool) -> Result<Vec<u8>> {
        self.check_writable()?;
        let offset = self.cursor;
        self.check_range(offset, len)?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let pos = self.blocks.pos_at(offset);
        let deleted = self.blocks.delete(pos, len);
        self.history.record_delete(offset, deleted.clone(), move_after);
        fix_views(&mut self.views, self.active, offset, len, 0);
        self.preferred_width = None;
        Ok(deleted)
    }

    fn replace_bytes(&mut self, del_len: usize, bytes: &[u8]) -> Result<Vec<u8>> {
        self.check_writable()?;
        let offset = self.cursor;
        self.check_range(offset, del_len)?;
        let deleted = self.blocks.delete(self.blocks.pos_at(offset), del_len);
        self.blocks.insert(self.blocks.pos_at(offset), bytes);
        self.history.record_replace(offset, deleted.clone(), bytes.len());
        fix_views(&mut self.views, self.active, offset, del_len, bytes.len());
        self.cursor = offset + bytes.len();
        self.preferred_width = None;
        Ok(deleted)
    }

    /// Run one editing command of the given merge kind
    fn command<R>(&mut self, kind: UndoMerge, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.history.begin_change(kind);
        let result = f(self);
        self.history.end_change();
        result
    }

    // =========================================================================
    // Editing commands
    // =========================================================================

    /// Insert `bytes` at the cursor and move the cursor past them
    pub fn insert(&mut self, bytes: &[u8]) -> Result<()> {
        self.command(UndoMerge::None, |buf| buf.insert_bytes(bytes))
    }

    /// Delete `len` bytes after the cursor. `move_after` leaves the cursor
    /// after the restored bytes when the deletion is undone.
    pub fn delete(&mut self, len: usize, move_after: bool) -> Result<Vec<u8>> {
        self.command(UndoMerge::None, |buf| buf.delete_bytes(len, move_after))
    }

    /// Delete `len` bytes before the cursor
    pub fn backspace_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.command(UndoMerge::None, |buf| buf.backspace_inner(len))
    }

    fn backspace_inner(&mut self, len: usize) -> Result<Vec<u8>> {
        self.check_writable()?;
        if len > self.cursor {
            return Err(RiftError::new(
                ErrorType::Execution,
                OUT_OF_RANGE,
                format!("Cannot delete {} bytes before offset {}", len, self.cursor),
            ));
        }
        self.cursor -= len;
        self.delete_bytes(len, true)
    }

    /// Replace `del_len` bytes after the cursor with `bytes` as one undo step
    pub fn replace(&mut self, del_len: usize, bytes: &[u8]) -> Result<Vec<u8>> {
        self.command(UndoMerge::None, |buf| buf.replace_bytes(del_len, bytes))
    }

    /// Type one character; consecutive typed characters undo together
    pub fn insert_ch(&mut self, ch: char) -> Result<()> {
        let mut buf = [0; 4];
        let encoded = ch.encode_utf8(&mut buf).as_bytes();
        self.command(UndoMerge::Insert, |b| b.insert_bytes(encoded))
    }

    /// Delete the character under the cursor. Returns `false` at the end of
    /// the document.
    pub fn delete_ch(&mut self) -> Result<bool> {
        let Some((_, len)) = self.cursor_iter().get_char() else {
            return Ok(false);
        };
        self.command(UndoMerge::Delete, |buf| buf.delete_bytes(len, false))?;
        Ok(true)
    }

    /// Delete the character before the cursor. Returns `false` at the start
    /// of the document.
    pub fn backspace(&mut self) -> Result<bool> {
        let mut iter = self.cursor_iter();
        let Some((_, len)) = iter.prev_char() else {
            return Ok(false);
        };
        self.command(UndoMerge::Backspace, |buf| buf.backspace_inner(len))?;
        Ok(true)
    }

    /// Copy `len` bytes from the cursor
    pub fn copy(&self, len: usize) -> Result<Vec<u8>> {
        self.check_range(self.cursor, len)?;
        Ok(self.cursor_iter().get_bytes(len))
    }

    /// Remove `len` bytes from the cursor and return them
    pub fn cut(&mut self, len: usize) -> Result<Vec<u8>> {
        self.delete(len, false)
    }

    /// Run `f` as one undo step however many edits it makes
    pub fn change_chain<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.history.begin_chain();
        let result = f(self);
        self.history.end_chain();
        result
    }

    /// The next edit never merges with the previous one
    pub fn start_new_undo_group(&mut self) {
        self.history.reset_merge();
    }

    // =========================================================================
    // Undo / Redo
    // =========================================================================

    /// Revert the last edit. Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.check_writable()?;
        let Some(description) = self.history.undo_description() else {
            tracing::info!("{}", NOTHING_TO_UNDO);
            return Ok(false);
        };
        let done = self.apply_history(false);
        if done {
            tracing::debug!(change = %description, cursor = self.cursor, "undo");
        }
        Ok(done)
    }

    /// Re-apply the most recently undone edit on the newest branch.
    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        self.check_writable()?;
        if !self.history.can_redo() {
            tracing::info!("{}", NOTHING_TO_REDO);
            return Ok(false);
        }
        let done = self.apply_history(true);
        if done {
            tracing::debug!(
                change = %self.history.undo_description().unwrap_or_default(),
                cursor = self.cursor,
                "redo"
            );
        }
        Ok(done)
    }

    /// Undo (`forward == false`) or redo with an applier that edits the
    /// blocks, fixes up views and places the cursor
    fn apply_history(&mut self, forward: bool) -> bool {
        let Buffer {
            blocks,
            history,
            views,
            active,
            ..
        } = &mut *self;
        let mut cursor = None;
        let mut apply = |change: &Change| -> Vec<u8> {
            let removed = blocks.delete(blocks.pos_at(change.offset), change.ins_count);
            blocks.insert(blocks.pos_at(change.offset), &change.deleted);
            fix_views(views, *active, change.offset, change.ins_count, change.deleted.len());
            cursor = Some(if change.move_after && change.is_delete() {
                change.offset + change.del_count()
            } else {
                change.offset
            });
            removed
        };
        let done = if forward {
            history.redo(&mut apply)
        } else {
            history.undo(&mut apply)
        };
        if let Some(offset) = cursor {
            self.cursor = offset;
        }
        self.preferred_width = None;
        done
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(BufferOptions::default())
    }
}

impl Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}
