use criterion::{Criterion, Throughput};
use libmqtt::codec::{Ack, Frame, Publish, QoS, Version};
use libmqtt::reader::StreamReader;

fn stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    for id in 1..=200u16 {
        let mut publish = Publish::new("bench/topic", vec![0x17; 96], QoS::AtLeastOnce);
        publish.packet_id = id;
        bytes.extend(Frame::Publish(publish).encode(Version::V311).expect("Failed to encode"));
        bytes.extend(Frame::PubAck(Ack::new(id)).encode(Version::V311).expect("Failed to encode"));
    }
    bytes
}

pub fn bench_feed_chunked(c: &mut Criterion) {
    let bytes = stream();
    let mut group = c.benchmark_group("reader_feed");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for chunk in [1usize, 64, 1_460] {
        group.bench_function(format!("chunk_{chunk}"), |b| {
            b.iter(|| {
                let mut reader = StreamReader::new(Version::V311);
                let mut frames = 0;
                for part in bytes.chunks(chunk) {
                    reader
                        .feed_with(part, |_| frames += 1)
                        .expect("Failed to frame");
                }
                assert_eq!(frames, 400);
            })
        });
    }
    group.finish();
}
