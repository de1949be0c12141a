use criterion::{Criterion, criterion_group, criterion_main};
use order_book_engine::orderbook::OrderBook;
use order_book_engine::orders::{OrderFactory, Side};

fn setup_order_book(depth: u64, orders_per_level: u64) -> (OrderBook, OrderFactory) {
    let mut ob = OrderBook::new();
    let mut factory = OrderFactory::new();
    for price in 1..=depth {
        for _ in 0..orders_per_level {
            let ask = factory
                .create_limit(Side::Sell, 1, (price + depth) as f64)
                .unwrap();
            ob.add_order(ask).unwrap();
            let bid = factory.create_limit(Side::Buy, 1, price as f64).unwrap();
            ob.add_order(bid).unwrap();
        }
    }
    (ob, factory)
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;

    c.bench_function("sweeping limit buy crosses many levels", |b| {
        b.iter_batched(
            || setup_order_book(depth, orders_per_level),
            |(mut ob, mut factory)| {
                let sweep = factory
                    .create_limit(Side::Buy, depth * orders_per_level, (2 * depth) as f64)
                    .unwrap();
                ob.add_order(sweep).unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("non-crossing limit order rests immediately", |b| {
        let (mut ob, mut factory) = setup_order_book(depth, orders_per_level);
        b.iter(|| {
            let resting = factory.create_limit(Side::Buy, 1, 1.0).unwrap();
            ob.add_order(resting).unwrap();
        })
    });
}

criterion_group!(benches, bench_match_order);
criterion_main!(benches);
