use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use rift_text::block::{BlockList, Decoding};

fn mixed_text(lines: usize) -> Vec<u8> {
    (0..lines)
        .flat_map(|i| format!("{i:05}\tcafé → naïve 日本語 line\n").into_bytes())
        .collect()
}

fn char_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("char_iteration");
    let text = mixed_text(10_000);
    let list = BlockList::from_bytes(&text);
    let ascii: Vec<u8> = text.iter().map(|b| if *b >= 0x80 { b'x' } else { *b }).collect();
    let ascii_list = BlockList::from_bytes(&ascii);

    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("next_char_utf8", |b| {
        b.iter(|| {
            let mut iter = list.iter(Decoding::Utf8);
            let mut count = 0usize;
            while iter.next_char().is_some() {
                count += 1;
            }
            black_box(count)
        })
    });

    group.bench_function("next_char_ascii", |b| {
        b.iter(|| black_box(ascii_list.iter(Decoding::Utf8).chars().count()))
    });

    group.bench_function("prev_char_utf8", |b| {
        b.iter(|| {
            let mut iter = list.iter(Decoding::Utf8);
            iter.goto_offset(list.len());
            let mut count = 0usize;
            while iter.prev_char().is_some() {
                count += 1;
            }
            black_box(count)
        })
    });

    // Chunks of 7 bytes put many characters across block boundaries
    let split = BlockList::from_chunks(text.chunks(7));
    group.bench_function("next_char_split_blocks", |b| {
        b.iter(|| black_box(split.iter(Decoding::Utf8).chars().count()))
    });

    group.finish();
}

fn line_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_navigation");
    let text = mixed_text(50_000);
    let list = BlockList::from_bytes(&text);

    group.bench_function("goto_line_end", |b| {
        b.iter(|| {
            let mut iter = list.iter(Decoding::Utf8);
            black_box(iter.goto_line(black_box(49_999)))
        })
    });

    group.bench_function("goto_offset_middle", |b| {
        b.iter(|| {
            let mut iter = list.iter(Decoding::Utf8);
            iter.goto_offset(black_box(text.len() / 2));
            black_box(iter.line_number())
        })
    });

    group.bench_function("next_line_walk", |b| {
        b.iter(|| {
            let mut iter = list.iter(Decoding::Utf8);
            let mut lines = 0usize;
            while iter.next_line() > 0 {
                lines += 1;
            }
            black_box(lines)
        })
    });

    group.bench_function("fill_line_ref_all", |b| {
        b.iter(|| {
            let mut iter = list.iter(Decoding::Utf8);
            let mut bytes = 0usize;
            loop {
                bytes += iter.fill_line_ref().len();
                if iter.next_line() == 0 {
                    break;
                }
            }
            black_box(bytes)
        })
    });

    group.finish();
}

criterion_group!(benches, char_iteration, line_navigation);
criterion_main!(benches);
