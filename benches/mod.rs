use criterion::{criterion_group, criterion_main};

mod delivery;
mod reader;

criterion_group!(
    benches,
    codec::bench_encode_publish,
    codec::bench_decode_publish,
    reader::bench_feed_chunked,
    delivery::bench_qos1_round_trip,
);
criterion_main!(benches);
