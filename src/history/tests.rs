use super::*;
use proptest::prelude::*;

/// A plain byte vector driven through a change tree the way a buffer would
struct Doc {
    bytes: Vec<u8>,
    tree: ChangeTree,
}

fn replay(bytes: &mut Vec<u8>, change: &Change) -> Vec<u8> {
    let end = change.offset + change.ins_count;
    bytes
        .splice(change.offset..end, change.deleted.iter().copied())
        .collect()
}

impl Doc {
    fn new(text: &str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
            tree: ChangeTree::new(),
        }
    }

    fn text(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap()
    }

    fn insert(&mut self, offset: usize, text: &str) {
        let tail = self.bytes.split_off(offset);
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.extend(tail);
        self.tree.record_insert(offset, text.len());
    }

    fn delete(&mut self, offset: usize, len: usize, move_after: bool) {
        let deleted: Vec<u8> = self.bytes.drain(offset..offset + len).collect();
        self.tree.record_delete(offset, deleted, move_after);
    }

    fn replace(&mut self, offset: usize, len: usize, text: &str) {
        let deleted: Vec<u8> = self
            .bytes
            .splice(offset..offset + len, text.bytes())
            .collect();
        self.tree.record_replace(offset, deleted, text.len());
    }

    fn type_char(&mut self, offset: usize, ch: &str) {
        self.tree.begin_change(UndoMerge::Insert);
        self.insert(offset, ch);
        self.tree.end_change();
    }

    fn delete_char(&mut self, offset: usize) {
        self.tree.begin_change(UndoMerge::Delete);
        self.delete(offset, 1, false);
        self.tree.end_change();
    }

    fn backspace(&mut self, cursor: usize) {
        self.tree.begin_change(UndoMerge::Backspace);
        self.delete(cursor - 1, 1, true);
        self.tree.end_change();
    }

    fn undo(&mut self) -> bool {
        let bytes = &mut self.bytes;
        self.tree.undo(|change| replay(bytes, change))
    }

    fn redo(&mut self) -> bool {
        let bytes = &mut self.bytes;
        self.tree.redo(|change| replay(bytes, change))
    }
}

// =============================================================================
// Basic Tree Tests
// =============================================================================

#[test]
fn test_new_tree() {
    let tree = ChangeTree::new();
    assert!(!tree.can_undo());
    assert!(!tree.can_redo());
    assert!(tree.is_empty());
    assert!(!tree.has_changes());
    assert!(!tree.is_modified());
    assert_eq!(tree.current(), tree.root());
    assert_eq!(tree.branch_count(), 0);
}

#[test]
fn test_undo_redo_at_boundaries() {
    let mut doc = Doc::new("abc");
    assert!(!doc.undo());
    assert!(!doc.redo());
    assert_eq!(doc.text(), "abc");
}

#[test]
fn test_insert_undo_redo() {
    let mut doc = Doc::new("world");
    doc.insert(0, "hello ");
    assert_eq!(doc.text(), "hello world");
    assert!(doc.tree.can_undo());

    assert!(doc.undo());
    assert_eq!(doc.text(), "world");
    assert!(doc.tree.can_redo());

    assert!(doc.redo());
    assert_eq!(doc.text(), "hello world");
    assert!(!doc.tree.can_redo());
}

#[test]
fn test_delete_undo_redo() {
    let mut doc = Doc::new("abcdef");
    doc.delete(1, 3, false);
    assert_eq!(doc.text(), "aef");

    assert!(doc.undo());
    assert_eq!(doc.text(), "abcdef");
    assert!(doc.redo());
    assert_eq!(doc.text(), "aef");
}

#[test]
fn test_replace_is_one_step() {
    let mut doc = Doc::new("hello world");
    doc.replace(6, 5, "there");
    assert_eq!(doc.text(), "hello there");
    assert_eq!(doc.tree.len(), 1);

    assert!(doc.undo());
    assert_eq!(doc.text(), "hello world");
    assert!(doc.redo());
    assert_eq!(doc.text(), "hello there");
}

#[test]
fn test_replace_degenerates_to_insert_or_delete() {
    let mut doc = Doc::new("abc");
    doc.replace(1, 0, "x");
    doc.replace(0, 1, "");
    doc.replace(0, 0, "");
    assert_eq!(doc.text(), "xbc");
    assert_eq!(doc.tree.len(), 2);

    let node = doc.tree.node(doc.tree.current()).unwrap();
    assert!(node.changes[0].is_delete());
}

#[test]
fn test_empty_records_are_ignored() {
    let mut tree = ChangeTree::new();
    tree.record_insert(0, 0);
    tree.record_delete(0, Vec::new(), false);
    assert!(tree.is_empty());
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_typed_characters_merge() {
    let mut doc = Doc::new("");
    for (i, ch) in ["h", "e", "l", "l", "o"].iter().enumerate() {
        doc.type_char(i, ch);
    }
    assert_eq!(doc.text(), "hello");
    assert_eq!(doc.tree.len(), 1);

    assert!(doc.undo());
    assert_eq!(doc.text(), "");
    assert!(!doc.tree.can_undo());
}

#[test]
fn test_unclassified_edits_do_not_merge() {
    let mut doc = Doc::new("");
    doc.insert(0, "a");
    doc.insert(1, "b");
    doc.insert(2, "c");
    assert_eq!(doc.tree.len(), 3);
}

#[test]
fn test_reset_merge_starts_new_group() {
    let mut doc = Doc::new("");
    doc.type_char(0, "a");
    doc.type_char(1, "b");
    doc.tree.reset_merge();
    doc.type_char(2, "c");
    doc.type_char(3, "d");
    assert_eq!(doc.tree.len(), 2);

    assert!(doc.undo());
    assert_eq!(doc.text(), "ab");
}

#[test]
fn test_discontiguous_inserts_do_not_merge() {
    let mut doc = Doc::new("xyz");
    doc.type_char(0, "a");
    doc.type_char(3, "b");
    assert_eq!(doc.text(), "axybz");
    assert_eq!(doc.tree.len(), 2);
}

#[test]
fn test_forward_deletes_merge() {
    let mut doc = Doc::new("abcdef");
    doc.delete_char(1);
    doc.delete_char(1);
    doc.delete_char(1);
    assert_eq!(doc.text(), "aef");
    assert_eq!(doc.tree.len(), 1);

    let node = doc.tree.node(doc.tree.current()).unwrap();
    assert_eq!(node.changes[0].deleted, b"bcd");
    assert_eq!(node.changes[0].offset, 1);

    assert!(doc.undo());
    assert_eq!(doc.text(), "abcdef");
}

#[test]
fn test_backspaces_merge() {
    let mut doc = Doc::new("abcdef");
    doc.backspace(4);
    doc.backspace(3);
    doc.backspace(2);
    assert_eq!(doc.text(), "aef");
    assert_eq!(doc.tree.len(), 1);

    let node = doc.tree.node(doc.tree.current()).unwrap();
    assert_eq!(node.changes[0].deleted, b"bcd");
    assert_eq!(node.changes[0].offset, 1);
    assert!(node.changes[0].move_after);

    assert!(doc.undo());
    assert_eq!(doc.text(), "abcdef");
}

#[test]
fn test_different_kinds_do_not_merge() {
    let mut doc = Doc::new("abcdef");
    doc.delete_char(2);
    doc.backspace(2);
    assert_eq!(doc.text(), "adef");
    assert_eq!(doc.tree.len(), 2);
}

#[test]
fn test_no_merge_after_undo() {
    let mut doc = Doc::new("");
    doc.type_char(0, "a");
    doc.type_char(1, "b");
    doc.type_char(2, "c");
    assert!(doc.undo());
    doc.type_char(0, "x");
    doc.type_char(1, "y");
    assert_eq!(doc.text(), "xy");
    assert_eq!(doc.tree.len(), 2);
}

#[test]
fn test_no_merge_into_saved_node() {
    let mut doc = Doc::new("");
    doc.type_char(0, "a");
    doc.tree.mark_saved();
    doc.type_char(1, "b");
    assert_eq!(doc.tree.len(), 2);
    assert!(doc.tree.is_modified());
}

// =============================================================================
// Branch Tests
// =============================================================================

#[test]
fn test_redo_follows_newest_branch() {
    let mut doc = Doc::new("");
    doc.insert(0, "a");
    assert!(doc.undo());
    doc.insert(0, "b");
    assert!(doc.undo());
    assert_eq!(doc.text(), "");
    assert_eq!(doc.tree.branch_count(), 2);

    assert!(doc.redo());
    assert_eq!(doc.text(), "b");
    assert!(!doc.redo());
}

#[test]
fn test_branches_are_kept() {
    let mut doc = Doc::new("");
    doc.insert(0, "a");
    doc.undo();
    doc.insert(0, "b");
    doc.undo();
    doc.insert(0, "c");
    assert_eq!(doc.tree.len(), 3);

    let root = doc.tree.node(doc.tree.root()).unwrap();
    assert_eq!(root.children.len(), 3);
}

// =============================================================================
// Chain Tests
// =============================================================================

#[test]
fn test_chain_is_one_step() {
    let mut doc = Doc::new("hello");
    doc.tree.begin_chain();
    doc.insert(0, "x");
    doc.insert(6, "y");
    doc.tree.end_chain();
    assert_eq!(doc.text(), "xhelloy");
    assert_eq!(doc.tree.len(), 1);

    assert!(doc.undo());
    assert_eq!(doc.text(), "hello");
    assert!(doc.redo());
    assert_eq!(doc.text(), "xhelloy");
}

#[test]
fn test_nested_chain() {
    let mut doc = Doc::new("ab");
    doc.tree.begin_chain();
    doc.tree.begin_chain();
    doc.delete(0, 1, false);
    doc.tree.end_chain();
    assert!(doc.tree.is_empty());
    assert!(doc.tree.in_chain());
    doc.insert(1, "c");
    doc.tree.end_chain();

    assert_eq!(doc.text(), "bc");
    assert_eq!(doc.tree.len(), 1);
    let node = doc.tree.node(doc.tree.current()).unwrap();
    assert_eq!(node.changes.len(), 2);

    assert!(doc.undo());
    assert_eq!(doc.text(), "ab");
}

#[test]
fn test_empty_chain_records_nothing() {
    let mut tree = ChangeTree::new();
    tree.begin_chain();
    tree.end_chain();
    assert!(tree.is_empty());
    assert!(!tree.in_chain());
}

#[test]
fn test_chain_disables_merging() {
    let mut doc = Doc::new("");
    doc.tree.begin_chain();
    doc.type_char(0, "a");
    doc.type_char(1, "b");
    doc.tree.end_chain();
    let node = doc.tree.node(doc.tree.current()).unwrap();
    assert_eq!(node.changes.len(), 2);
}

// =============================================================================
// Modified Flag Tests
// =============================================================================

#[test]
fn test_modified_tracks_save_point() {
    let mut doc = Doc::new("");
    doc.insert(0, "a");
    assert!(doc.tree.is_modified());

    doc.tree.mark_saved();
    assert!(!doc.tree.is_modified());

    doc.undo();
    assert!(doc.tree.is_modified());
    assert!(doc.tree.has_changes());

    doc.redo();
    assert!(!doc.tree.is_modified());
}

// =============================================================================
// Description Tests
// =============================================================================

#[test]
fn test_descriptions() {
    let insert = Change {
        offset: 4,
        ins_count: 3,
        deleted: Vec::new(),
        move_after: false,
    };
    assert_eq!(insert.description(), "Insert 3 bytes at 4");

    let delete = Change {
        offset: 0,
        ins_count: 0,
        deleted: b"a\nb".to_vec(),
        move_after: false,
    };
    assert_eq!(delete.description(), "Delete 'a\\nb'");
    assert_eq!(delete.del_count(), 3);

    let mut doc = Doc::new("abc");
    assert_eq!(doc.tree.undo_description(), None);
    doc.insert(0, "xyz");
    assert_eq!(
        doc.tree.undo_description().as_deref(),
        Some("Insert 3 bytes at 0")
    );
    doc.undo();
    assert_eq!(doc.tree.undo_description(), None);
    doc.redo();
    assert_eq!(
        doc.tree.undo_description().as_deref(),
        Some("Insert 3 bytes at 0")
    );
}

// =============================================================================
// Property Tests
// =============================================================================

#[derive(Debug, Clone)]
enum Operation {
    Type { offset: usize },
    Delete { offset: usize, len: usize },
    Backspace { offset: usize },
    Reset,
}

fn operation_strategy() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(
        prop_oneof![
            3 => (0usize..40).prop_map(|offset| Operation::Type { offset }),
            1 => (0usize..40, 1usize..5).prop_map(|(offset, len)| Operation::Delete { offset, len }),
            2 => (0usize..40).prop_map(|offset| Operation::Backspace { offset }),
            1 => Just(Operation::Reset),
        ],
        1..50,
    )
}

proptest! {
    #[test]
    fn prop_undo_all_then_redo_all(ops in operation_strategy()) {
        let original = "the quick brown fox";
        let mut doc = Doc::new(original);

        for op in ops {
            let len = doc.bytes.len();
            match op {
                Operation::Type { offset } => doc.type_char(offset.min(len), "x"),
                Operation::Delete { offset, len: count } => {
                    if offset < len {
                        doc.tree.begin_change(UndoMerge::Delete);
                        doc.delete(offset, count.min(len - offset), false);
                        doc.tree.end_change();
                    }
                }
                Operation::Backspace { offset } => {
                    let cursor = offset.min(len);
                    if cursor > 0 {
                        doc.backspace(cursor);
                    }
                }
                Operation::Reset => doc.tree.reset_merge(),
            }
        }

        let edited = doc.bytes.clone();
        while doc.undo() {}
        prop_assert_eq!(doc.text(), original);
        prop_assert!(!doc.tree.is_modified());

        while doc.redo() {}
        prop_assert_eq!(&doc.bytes, &edited);
    }
}
