//! Benchmarks for order book operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use orderbook_feed::orderbook::{OrderBook, PriceLevel, Side, TopOfBookView};
use orderbook_feed::parser::{self, BookDelta, BookSnapshot, FeedEvent};
use rust_decimal::Decimal;
use std::str::FromStr;

fn create_snapshot(levels: usize) -> FeedEvent {
    let size = Decimal::from_str("1.5").unwrap();
    let bids: Vec<PriceLevel> = (0..levels)
        .map(|i| PriceLevel::new(Decimal::from(50000 - i as i64), size))
        .collect();

    let asks: Vec<PriceLevel> = (0..levels)
        .map(|i| PriceLevel::new(Decimal::from(50001 + i as i64), size))
        .collect();

    FeedEvent::Snapshot(BookSnapshot {
        seq_num: 1000,
        bids,
        asks,
        timestamp: None,
    })
}

fn create_delta(prev_seq_num: u64) -> BookDelta {
    BookDelta {
        seq_num: prev_seq_num + 1,
        prev_seq_num,
        bids: vec![PriceLevel::new(
            Decimal::from(49999),
            Decimal::from_str("2.0").unwrap(),
        )],
        asks: vec![PriceLevel::new(
            Decimal::from(50001),
            Decimal::from_str("2.5").unwrap(),
        )],
        timestamp: None,
    }
}

fn benchmark_snapshot(c: &mut Criterion) {
    let snapshot = create_snapshot(100);

    c.bench_function("apply_snapshot_100_levels", |b| {
        b.iter(|| {
            let mut book = OrderBook::new("update:BTCPFC");
            book.apply(black_box(&snapshot));
        })
    });
}

fn benchmark_apply_delta(c: &mut Criterion) {
    let mut book = OrderBook::new("update:BTCPFC");
    book.apply(&create_snapshot(100));
    let mut seq = 1000;

    c.bench_function("apply_delta", |b| {
        b.iter(|| {
            let delta = create_delta(seq);
            seq += 1;
            book.on_delta(black_box(&delta));
        })
    });
}

fn benchmark_view(c: &mut Criterion) {
    let mut book = OrderBook::new("update:BTCPFC");
    book.apply(&create_snapshot(1000));

    c.bench_function("best_levels_8", |b| {
        b.iter(|| {
            black_box(TopOfBookView::best_levels(&book, Side::Bid, 8));
            black_box(TopOfBookView::best_levels(&book, Side::Ask, 8));
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let raw = r#"{"topic":"update:BTCPFC","data":{"type":"delta","bids":[["49999.5","1.25"],["49998","0"]],"asks":[["50001","2.5"]],"seqNum":1001,"prevSeqNum":1000}}"#;

    c.bench_function("decode_delta", |b| {
        b.iter(|| {
            black_box(parser::decode(black_box(raw)).unwrap());
        })
    });
}

criterion_group!(
    benches,
    benchmark_snapshot,
    benchmark_apply_delta,
    benchmark_view,
    benchmark_decode
);
criterion_main!(benches);
