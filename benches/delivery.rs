use criterion::{BatchSize, Criterion, Throughput};
use libmqtt::codec::{Publish, QoS};
use libmqtt::config::EngineConfig;
use libmqtt::delivery::{AckKind, DeliveryEngine};
use libmqtt::time::Timestamp;

pub fn bench_qos1_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("delivery_qos1");
    group.throughput(Throughput::Elements(50));
    group.bench_function("enqueue_and_ack_50", |b| {
        b.iter_batched_ref(
            || DeliveryEngine::in_memory(EngineConfig::default()),
            |engine| {
                let now = Timestamp::from_millis(0);
                for _ in 0..50 {
                    let publish = Publish::new("bench/topic", b"payload".to_vec(), QoS::AtLeastOnce);
                    for frame in engine.enqueue(publish, now).expect("Failed to enqueue") {
                        if let Some(id) = frame.packet_id() {
                            engine.acknowledge(id, AckKind::PubAck, now);
                        }
                    }
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
