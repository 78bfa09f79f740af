use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pipeboard_core::{CardId, OrganizationId, PipelineId};
use pipeboard_events::{DeliveryError, EventBus, InMemoryEventBus, PipelineEvent, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn subscribe_counters(
    bus: &InMemoryEventBus<PipelineEvent>,
    org: OrganizationId,
    n: usize,
    counter: &Arc<AtomicU64>,
) -> Vec<Subscription> {
    (0..n)
        .map(|_| {
            let counter = counter.clone();
            bus.subscribe(
                org,
                Box::new(move |_e: &PipelineEvent| -> Result<(), DeliveryError> {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }),
            )
        })
        .collect()
}

/// Publish cost as the number of viewers of one organization grows.
fn bench_fanout_by_subscriber_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout_by_subscriber_count");

    for subscribers in [1usize, 10, 100, 1000] {
        let bus = InMemoryEventBus::<PipelineEvent>::new();
        let org = OrganizationId::new();
        let counter = Arc::new(AtomicU64::new(0));
        let _subs = subscribe_counters(&bus, org, subscribers, &counter);
        let event = PipelineEvent::card_deleted(org, PipelineId::new(), CardId::new());

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| bus.publish(black_box(event.clone())).unwrap());
        });
    }

    group.finish();
}

/// Publishing to a quiet organization while many others are busy.
fn bench_publish_isolated_topic(c: &mut Criterion) {
    let bus = InMemoryEventBus::<PipelineEvent>::new();
    let counter = Arc::new(AtomicU64::new(0));
    let _subs: Vec<Subscription> = (0..500)
        .flat_map(|_| subscribe_counters(&bus, OrganizationId::new(), 4, &counter))
        .collect();
    let quiet = OrganizationId::new();
    let event = PipelineEvent::card_deleted(quiet, PipelineId::new(), CardId::new());

    c.bench_function("publish_to_topic_without_subscribers", |b| {
        b.iter(|| bus.publish(black_box(event.clone())).unwrap());
    });
}

/// Churn: open and close a viewer per iteration.
fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let bus = InMemoryEventBus::<PipelineEvent>::new();
    let org = OrganizationId::new();
    let counter = Arc::new(AtomicU64::new(0));

    c.bench_function("subscribe_then_unsubscribe", |b| {
        b.iter(|| {
            let subs = subscribe_counters(&bus, org, 1, &counter);
            drop(black_box(subs));
        });
    });
}

criterion_group!(
    benches,
    bench_fanout_by_subscriber_count,
    bench_publish_isolated_topic,
    bench_subscribe_unsubscribe
);
criterion_main!(benches);
