use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use sessioncart_rs::models::{Cart, CartItem, ConcurrencyPolicy, SessionKey};
use sessioncart_rs::repositories::InMemorySessionStore;
use sessioncart_rs::services::CartService;

fn cart_with_lines(lines: usize) -> Cart {
    Cart::from_items(
        (0..lines)
            .map(|i| CartItem::new(i as i32 % 20, (i % 5 + 1) as u32))
            .collect(),
    )
}

fn bench_cart_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_codec");

    for lines in [1, 10, 100].iter() {
        let cart = cart_with_lines(*lines);
        let encoded = cart.encode().unwrap();

        group.bench_with_input(BenchmarkId::new("encode", lines), &cart, |b, cart| {
            b.iter(|| black_box(cart.encode().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode", lines), &encoded, |b, bytes| {
            b.iter(|| black_box(Cart::decode(bytes).unwrap()))
        });
    }
    group.finish();
}

fn bench_add_item(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("cart_add_item");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));

    for policy in [
        ConcurrencyPolicy::LastWriteWins,
        ConcurrencyPolicy::PerKeySerialized,
    ] {
        group.bench_function(BenchmarkId::new("policy", policy), |b| {
            b.to_async(&rt).iter_batched(
                || {
                    let service = CartService::new(
                        Arc::new(InMemorySessionStore::new()),
                        policy,
                        Duration::from_secs(600),
                    );
                    (service, SessionKey::generate())
                },
                |(service, key)| async move {
                    for product_id in 0..10 {
                        service
                            .add_item(&key, CartItem::new(product_id, 1))
                            .await
                            .unwrap();
                    }
                    black_box(service.get_cart(&key).await.unwrap())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_concurrent_sessions(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("cart_concurrent_sessions");

    for sessions in [1usize, 16, 64].iter() {
        group.bench_with_input(
            BenchmarkId::new("sessions", sessions),
            sessions,
            |b, &sessions| {
                b.to_async(&rt).iter(|| async move {
                    let service = Arc::new(CartService::new(
                        Arc::new(InMemorySessionStore::new()),
                        ConcurrencyPolicy::PerKeySerialized,
                        Duration::from_secs(600),
                    ));

                    let handles: Vec<_> = (0..sessions)
                        .map(|_| {
                            let service = service.clone();
                            tokio::spawn(async move {
                                let key = SessionKey::generate();
                                for product_id in 0..5 {
                                    service
                                        .add_item(&key, CartItem::new(product_id, 1))
                                        .await
                                        .unwrap();
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.await.unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cart_codec,
    bench_add_item,
    bench_concurrent_sessions
);
criterion_main!(benches);
