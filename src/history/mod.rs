//! Undo/Redo history as a tree of changes
//!
//! This module keeps a branching change tree where:
//! - Every editing command becomes one node (or extends the previous one when
//!   it merges, e.g. consecutive typed characters)
//! - A node may hold a chain of changes undone and redone as one step
//! - Recording after an undo adds a sibling branch; nothing is pruned
//! - Redo follows the most recently created branch
//!
//! The tree never touches document bytes itself. `undo` and `redo` hand each
//! change to a caller-supplied closure that performs it and returns the bytes
//! it removed; the change is then flipped in place so the same node replays
//! in the opposite direction next time.

use std::collections::HashMap;

/// Unique sequential identifier of a tree node
pub type ChangeSeq = u64;

// =============================================================================
// Change
// =============================================================================

/// How a record may coalesce with the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoMerge {
    #[default]
    None,
    /// Typed characters
    Insert,
    /// Forward deletes at a fixed offset
    Delete,
    /// Backspaces walking towards the start of the document
    Backspace,
}

/// One structural edit at a byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub offset: usize,
    /// Bytes inserted at `offset`. They are still in the live document, so
    /// only the count is kept.
    pub ins_count: usize,
    /// Bytes removed at `offset`, kept so they can be restored
    pub deleted: Vec<u8>,
    /// Leave the cursor after the restored text when this deletion is undone
    pub move_after: bool,
}

impl Change {
    #[must_use]
    pub fn del_count(&self) -> usize {
        self.deleted.len()
    }

    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.ins_count > 0 && self.deleted.is_empty()
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.ins_count == 0 && !self.deleted.is_empty()
    }

    /// Swap sides after the change has been performed: the restored bytes
    /// are now the inserted ones and `removed` becomes what a replay restores.
    fn flip(&mut self, removed: Vec<u8>) {
        debug_assert_eq!(removed.len(), self.ins_count);
        self.ins_count = self.deleted.len();
        self.deleted = removed;
    }

    /// Describe the change for logs (e.g. "Delete 'ab'")
    #[must_use]
    pub fn description(&self) -> String {
        fn quoted(bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).replace('\n', "\\n")
        }
        match (self.ins_count, self.deleted.len()) {
            (ins, 0) => format!("Insert {} bytes at {}", ins, self.offset),
            (0, del) if del <= 20 => format!("Delete '{}'", quoted(&self.deleted)),
            (0, del) => format!("Delete {} bytes", del),
            (ins, del) => format!("Replace {} bytes with {} bytes", del, ins),
        }
    }
}

// =============================================================================
// Change Node
// =============================================================================

/// A node in the change tree
#[derive(Clone, Debug)]
pub struct ChangeNode {
    pub seq: ChangeSeq,
    pub parent: Option<ChangeSeq>,
    /// Branches in creation order; the last one is followed by redo
    pub children: Vec<ChangeSeq>,
    /// Applied first to last, undone last to first
    pub changes: Vec<Change>,
}

impl ChangeNode {
    fn new(seq: ChangeSeq, parent: Option<ChangeSeq>, changes: Vec<Change>) -> Self {
        Self {
            seq,
            parent,
            children: Vec::new(),
            changes,
        }
    }

    #[must_use]
    pub fn description(&self) -> String {
        match self.changes.as_slice() {
            [] => "Initial state".to_string(),
            [change] => change.description(),
            changes => format!("{} changes", changes.len()),
        }
    }
}

// =============================================================================
// Change Tree
// =============================================================================

/// Branching undo history of one buffer
#[derive(Debug)]
pub struct ChangeTree {
    nodes: HashMap<ChangeSeq, ChangeNode>,
    current: ChangeSeq,
    next_seq: ChangeSeq,
    root_seq: ChangeSeq,
    /// `current` when the document was last persisted
    save_point: ChangeSeq,
    /// Node the last record created or extended; merging only extends it
    last_recorded: Option<ChangeSeq>,
    merge: UndoMerge,
    prev_merge: UndoMerge,
    /// Changes collected by an open chain
    chain: Option<Vec<Change>>,
    chain_depth: usize,
}

impl Default for ChangeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTree {
    /// Create a tree holding only the root (the unedited document)
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(0, ChangeNode::new(0, None, Vec::new()));
        Self {
            nodes,
            current: 0,
            next_seq: 1,
            root_seq: 0,
            save_point: 0,
            last_recorded: None,
            merge: UndoMerge::None,
            prev_merge: UndoMerge::None,
            chain: None,
            chain_depth: 0,
        }
    }

    #[must_use]
    pub fn current(&self) -> ChangeSeq {
        self.current
    }

    #[must_use]
    pub fn root(&self) -> ChangeSeq {
        self.root_seq
    }

    #[must_use]
    pub fn node(&self, seq: ChangeSeq) -> Option<&ChangeNode> {
        self.nodes.get(&seq)
    }

    /// Number of recorded nodes, root excluded
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Anything was ever recorded, even if undone since
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.current != self.root_seq
    }

    pub fn can_redo(&self) -> bool {
        self.nodes
            .get(&self.current)
            .is_some_and(|n| !n.children.is_empty())
    }

    /// Get number of children at current node (for branch info)
    pub fn branch_count(&self) -> usize {
        self.nodes
            .get(&self.current)
            .map_or(0, |n| n.children.len())
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.current != self.save_point
    }

    pub fn mark_saved(&mut self) {
        self.save_point = self.current;
    }

    // -------------------------------------------------------------------------
    // Merge groups
    // -------------------------------------------------------------------------

    /// Start an editing command of the given kind
    pub fn begin_change(&mut self, kind: UndoMerge) {
        self.merge = kind;
    }

    /// Finish the current editing command; the next one may merge with it
    /// when it has the same kind.
    pub fn end_change(&mut self) {
        self.prev_merge = self.merge;
    }

    /// Start a new undo group: the next record never merges
    pub fn reset_merge(&mut self) {
        self.merge = UndoMerge::None;
        self.prev_merge = UndoMerge::None;
    }

    fn merging(&self, kind: UndoMerge) -> bool {
        self.chain.is_none()
            && self.merge == kind
            && self.prev_merge == kind
            && self.last_recorded == Some(self.current)
            && self.current != self.root_seq
            // extending the saved node would hide the edit from is_modified
            && self.current != self.save_point
    }

    /// The single change of the current node, when it has exactly one
    fn current_change_mut(&mut self) -> Option<&mut Change> {
        let node = self.nodes.get_mut(&self.current)?;
        match node.changes.as_mut_slice() {
            [change] => Some(change),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Chains
    // -------------------------------------------------------------------------

    /// Group every change recorded until the matching `end_chain` into one
    /// node. Chains nest; only the outermost one creates the node.
    pub fn begin_chain(&mut self) {
        self.chain_depth += 1;
        if self.chain.is_none() {
            self.chain = Some(Vec::new());
        }
    }

    pub fn end_chain(&mut self) {
        debug_assert!(self.chain_depth > 0, "end_chain without begin_chain");
        self.chain_depth = self.chain_depth.saturating_sub(1);
        if self.chain_depth > 0 {
            return;
        }
        if let Some(changes) = self.chain.take() {
            if !changes.is_empty() {
                self.add_node(changes);
            }
        }
    }

    #[must_use]
    pub fn in_chain(&self) -> bool {
        self.chain.is_some()
    }

    // -------------------------------------------------------------------------
    // Recording
    // -------------------------------------------------------------------------

    fn add_node(&mut self, changes: Vec<Change>) -> ChangeSeq {
        let seq = self.next_seq;
        self.next_seq += 1;

        let node = ChangeNode::new(seq, Some(self.current), changes);
        if let Some(parent) = self.nodes.get_mut(&self.current) {
            parent.children.push(seq);
        }
        self.nodes.insert(seq, node);
        self.current = seq;
        self.last_recorded = Some(seq);
        seq
    }

    fn add_change(&mut self, change: Change) {
        match self.chain.as_mut() {
            Some(pending) => pending.push(change),
            None => {
                self.add_node(vec![change]);
            }
        }
    }

    /// `len` bytes were inserted at `offset`
    pub fn record_insert(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        if self.merging(UndoMerge::Insert) {
            if let Some(change) = self.current_change_mut() {
                if change.is_insert() && change.offset + change.ins_count == offset {
                    change.ins_count += len;
                    return;
                }
            }
        }
        self.add_change(Change {
            offset,
            ins_count: len,
            deleted: Vec::new(),
            move_after: false,
        });
    }

    /// `deleted` was removed at `offset`
    pub fn record_delete(&mut self, offset: usize, deleted: Vec<u8>, move_after: bool) {
        if deleted.is_empty() {
            return;
        }
        if self.merging(UndoMerge::Delete) {
            if let Some(change) = self.current_change_mut() {
                if change.is_delete() && change.offset == offset {
                    change.deleted.extend_from_slice(&deleted);
                    return;
                }
            }
        }
        if self.merging(UndoMerge::Backspace) {
            if let Some(change) = self.current_change_mut() {
                if change.is_delete() && offset + deleted.len() == change.offset {
                    let mut joined = deleted;
                    joined.extend_from_slice(&change.deleted);
                    change.deleted = joined;
                    change.offset = offset;
                    return;
                }
            }
        }
        self.add_change(Change {
            offset,
            ins_count: 0,
            deleted,
            move_after,
        });
    }

    /// `deleted` was replaced by `ins_count` new bytes at `offset`
    pub fn record_replace(&mut self, offset: usize, deleted: Vec<u8>, ins_count: usize) {
        match (deleted.is_empty(), ins_count) {
            (true, 0) => {}
            (true, len) => self.record_insert(offset, len),
            (false, 0) => self.record_delete(offset, deleted, false),
            (false, _) => self.add_change(Change {
                offset,
                ins_count,
                deleted,
                move_after: false,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Undo / Redo
    // -------------------------------------------------------------------------

    /// Revert the current node and move to its parent.
    ///
    /// `apply` must remove `change.ins_count` bytes at `change.offset`, insert
    /// `change.deleted` there, and return the removed bytes. Returns `false`
    /// at the root.
    pub fn undo<F>(&mut self, mut apply: F) -> bool
    where
        F: FnMut(&Change) -> Vec<u8>,
    {
        debug_assert!(self.chain.is_none(), "undo inside an open change chain");
        self.reset_merge();
        let Some(node) = self.nodes.get_mut(&self.current) else {
            return false;
        };
        let Some(parent) = node.parent else {
            return false;
        };
        for change in node.changes.iter_mut().rev() {
            let removed = apply(change);
            change.flip(removed);
        }
        self.current = parent;
        true
    }

    /// Re-apply the newest child of the current node and move to it.
    /// `apply` has the same contract as for [`undo`](Self::undo). Returns
    /// `false` when there is nothing to redo.
    pub fn redo<F>(&mut self, mut apply: F) -> bool
    where
        F: FnMut(&Change) -> Vec<u8>,
    {
        debug_assert!(self.chain.is_none(), "redo inside an open change chain");
        self.reset_merge();
        let Some(&child) = self.nodes.get(&self.current).and_then(|n| n.children.last()) else {
            return false;
        };
        let Some(node) = self.nodes.get_mut(&child) else {
            return false;
        };
        for change in node.changes.iter_mut() {
            let removed = apply(change);
            change.flip(removed);
        }
        self.current = child;
        true
    }

    /// Description of the edit the next undo would revert
    #[must_use]
    pub fn undo_description(&self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        self.nodes.get(&self.current).map(ChangeNode::description)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
