use super::*;
use proptest::prelude::*;

fn lines(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| format!("line {:02}\n", i).into_bytes())
        .collect()
}

fn chunk_vec(list: &BlockList) -> Vec<Vec<u8>> {
    list.chunks().map(<[u8]>::to_vec).collect()
}

#[test]
fn test_new_list_has_one_empty_block() {
    let list = BlockList::new();
    assert_eq!(list.len(), 0);
    assert!(list.is_empty());
    assert_eq!(list.block_count(), 1);
    assert_eq!(list.line_count(), 0);
    assert_eq!(list.first(), list.last());
    assert!(list.block(list.first()).is_empty());
    list.check_invariants();
}

#[test]
fn test_capacity_rounding() {
    assert_eq!(Block::with_capacity(0).capacity(), 64);
    assert_eq!(Block::with_capacity(1).capacity(), 64);
    assert_eq!(Block::with_capacity(65).capacity(), 128);
    let block = Block::from_slice(&[b'x'; 64]);
    assert_eq!(block.capacity(), 64);
    assert_eq!(block.size(), 64);
}

#[test]
fn test_line_chunks_prefers_whole_lines() {
    let data = b"a\nbb\nccc\n";
    let ranges = line_chunks(data, 4);
    assert_eq!(ranges, vec![0..2, 2..5, 5..9]);
}

#[test]
fn test_line_chunks_keeps_long_line_together() {
    let data = b"aaaaaaaaaa\nb";
    let ranges = line_chunks(data, 4);
    assert_eq!(ranges, vec![0..11, 11..12]);
}

#[test]
fn test_from_bytes_counts_lines() {
    let list = BlockList::from_bytes_with_size(b"a\nbb\nccc\n", 4);
    assert_eq!(list.block_count(), 3);
    assert_eq!(list.line_count(), 3);
    assert_eq!(list.len(), 9);
    assert!(list.is_line_aligned());
    assert_eq!(list.to_vec(), b"a\nbb\nccc\n");
    list.check_invariants();
}

#[test]
fn test_from_bytes_empty_is_new() {
    let list = BlockList::from_bytes(b"");
    assert_eq!(list.block_count(), 1);
    assert_eq!(list.len(), 0);
    list.check_invariants();
}

#[test]
fn test_from_chunks_keeps_layout() {
    let list = BlockList::from_chunks(["ab", "", "c\nd"]);
    assert_eq!(chunk_vec(&list), vec![b"ab".to_vec(), b"c\nd".to_vec()]);
    assert_eq!(list.line_count(), 1);
    assert!(!list.is_line_aligned());
    list.check_invariants();

    let empty = BlockList::from_chunks(Vec::<&[u8]>::new());
    assert_eq!(empty.block_count(), 1);
    empty.check_invariants();
}

#[test]
fn test_insert_grows_in_place() {
    let mut list = BlockList::new();
    let pos = list.pos_at(0);
    assert_eq!(list.insert(pos, b"hello\n"), 1);
    let pos = list.pos_at(5);
    assert_eq!(list.insert(pos, b" world"), 0);
    assert_eq!(list.to_vec(), b"hello world\n");
    assert_eq!(list.block_count(), 1);
    assert_eq!(list.line_count(), 1);
    list.check_invariants();
}

#[test]
fn test_insert_splits_into_whole_lines() {
    let mut list = BlockList::new().with_edit_size(64);
    let text = lines(20);
    let pos = list.pos_at(0);
    assert_eq!(list.insert(pos, &text), 20);

    assert_eq!(list.block_count(), 3);
    assert_eq!(list.to_vec(), text);
    assert!(list.is_line_aligned());
    for chunk in list.chunks() {
        assert!(chunk.len() <= 64);
    }
    list.check_invariants();
}

#[test]
fn test_single_long_line_is_not_split() {
    let mut list = BlockList::new().with_edit_size(64);
    let pos = list.pos_at(0);
    list.insert(pos, &[b'a'; 200]);
    assert_eq!(list.block_count(), 1);
    assert!(list.block(list.first()).capacity() >= 200);
    list.check_invariants();
}

#[test]
fn test_insert_at_block_end_goes_to_next_block() {
    let mut list = BlockList::from_bytes_with_size(b"a\nb\n", 2);
    let mut iter = list.iter(Decoding::Bytes);
    iter.goto_offset(2);
    let pos = iter.pos();
    assert_eq!(pos.offset(), 2);

    list.insert(pos, b"x");
    assert_eq!(chunk_vec(&list), vec![b"a\n".to_vec(), b"xb\n".to_vec()]);
    list.check_invariants();
}

#[test]
fn test_delete_joins_broken_line() {
    let mut list = BlockList::from_bytes_with_size(b"aaa\nbbb\nccc\n", 4);
    assert_eq!(list.block_count(), 3);

    let pos = list.pos_at(3);
    assert_eq!(list.delete(pos, 1), b"\n");
    assert_eq!(chunk_vec(&list), vec![b"aaabbb\n".to_vec(), b"ccc\n".to_vec()]);
    assert_eq!(list.line_count(), 2);
    assert!(list.is_line_aligned());
    list.check_invariants();
}

#[test]
fn test_delete_whole_block_removes_it() {
    let mut list = BlockList::from_bytes_with_size(b"aaa\nbbb\nccc\n", 4);
    let pos = list.pos_at(4);
    assert_eq!(list.delete(pos, 4), b"bbb\n");
    assert_eq!(chunk_vec(&list), vec![b"aaa\n".to_vec(), b"ccc\n".to_vec()]);
    list.check_invariants();
}

#[test]
fn test_delete_merges_small_blocks() {
    let mut list = BlockList::from_bytes_with_size(b"ab\nc\n", 3);
    assert_eq!(list.block_count(), 2);
    let pos = list.pos_at(0);
    list.delete(pos, 1);
    assert_eq!(chunk_vec(&list), vec![b"b\nc\n".to_vec()]);
    list.check_invariants();
}

#[test]
fn test_delete_spanning_blocks() {
    let mut list = BlockList::from_bytes_with_size(b"aaa\nbbb\nccc\nddd\n", 4);
    let pos = list.pos_at(2);
    assert_eq!(list.delete(pos, 8), b"a\nbbb\ncc");
    assert_eq!(list.to_vec(), b"aac\nddd\n");
    assert!(list.is_line_aligned());
    list.check_invariants();
}

#[test]
fn test_delete_everything_leaves_one_empty_block() {
    let mut list = BlockList::from_bytes_with_size(b"aa\nbb\n", 3);
    assert_eq!(list.block_count(), 2);
    let pos = list.pos_at(0);
    assert_eq!(list.delete(pos, 6), b"aa\nbb\n");
    assert_eq!(list.block_count(), 1);
    assert_eq!(list.len(), 0);
    assert_eq!(list.line_count(), 0);
    list.check_invariants();
}

#[test]
#[should_panic(expected = "past the end")]
fn test_delete_past_end_panics() {
    let mut list = BlockList::from_bytes(b"abc");
    let pos = list.pos_at(1);
    list.delete(pos, 5);
}

#[test]
#[should_panic(expected = "stale block position")]
fn test_stale_position_panics() {
    let mut list = BlockList::from_bytes(b"abc");
    let pos = list.pos_at(0);
    list.insert(pos, b"x");
    list.insert(pos, b"y");
}

#[test]
fn test_generation_bumps_on_mutation() {
    let mut list = BlockList::from_bytes(b"abc");
    let before = list.generation();
    let pos = list.pos_at(3);
    list.insert(pos, b"d");
    assert!(list.generation() > before);
}

#[test]
fn test_freed_slots_are_reused() {
    let mut list = BlockList::from_bytes_with_size(b"aaa\nbbb\nccc\n", 4);
    let pos = list.pos_at(4);
    list.delete(pos, 4);
    let slots = list.nodes.len();

    let pos = list.pos_at(4);
    list.insert(pos, &lines(100));
    assert_eq!(list.block_count(), 3);
    assert_eq!(list.nodes.len(), slots);
    list.check_invariants();
}

#[derive(Debug, Clone)]
enum Operation {
    Insert { offset: usize, text: Vec<u8> },
    Delete { offset: usize, len: usize },
}

fn operation_strategy() -> impl Strategy<Value = Vec<Operation>> {
    let text = prop::collection::vec(prop::sample::select(vec![b'a', b'b', b'\n']), 1..40);
    prop::collection::vec(
        prop_oneof![
            3 => (0usize..400, text).prop_map(|(offset, text)| Operation::Insert { offset, text }),
            2 => (0usize..400, 1usize..60).prop_map(|(offset, len)| Operation::Delete { offset, len }),
        ],
        1..60,
    )
}

proptest! {
    #[test]
    fn prop_block_list_matches_model(ops in operation_strategy()) {
        let mut list = BlockList::new().with_edit_size(32);
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Operation::Insert { offset, text } => {
                    let offset = offset.min(model.len());
                    let pos = list.pos_at(offset);
                    list.insert(pos, &text);
                    model.splice(offset..offset, text);
                }
                Operation::Delete { offset, len } => {
                    if offset >= model.len() {
                        continue;
                    }
                    let len = len.min(model.len() - offset);
                    let pos = list.pos_at(offset);
                    let removed = list.delete(pos, len);
                    let expected: Vec<u8> = model.drain(offset..offset + len).collect();
                    prop_assert_eq!(removed, expected);
                }
            }
            list.check_invariants();
            prop_assert!(list.is_line_aligned());
        }

        prop_assert_eq!(list.to_vec(), model.clone());
        prop_assert_eq!(list.line_count(), model.iter().filter(|&&b| b == b'\n').count());
    }
}
