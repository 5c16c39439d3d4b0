#![allow(unused)]
extern crate smproxy;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use smproxy::{
    stream::{Argument, Stream},
    ObjectId,
};
use std::hint::black_box;

/// A stream resembling one update of a large pipeline: object creation followed by
/// several scalar and vector property pushes per object.
fn pipeline_stream(objects: u32) -> Stream {
    let mut stream = Stream::new();
    for raw in 1..=objects {
        let id = ObjectId::new(raw);
        stream
            .new_object("vtkSphereSource", id)
            .invoke(id, "SetRadius", [Argument::Double(0.5)])
            .invoke(
                id,
                "SetCenter",
                [
                    Argument::Double(0.0),
                    Argument::Double(1.0),
                    Argument::Double(2.0),
                ],
            )
            .invoke(id, "SetThetaResolution", [Argument::Int(32)])
            .invoke(id, "SetFileName", [Argument::from("sphere.vtp")])
            .invoke(id, "Update", []);
    }
    stream
}

/// Benchmark encoding and decoding of command streams
fn bench_stream_codec(c: &mut Criterion) {
    let stream = pipeline_stream(1_000);
    let encoded = stream.encode().unwrap();

    println!(
        "Benchmarking stream: {} messages, {} bytes",
        stream.len(),
        encoded.len()
    );

    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| {
            let bytes = black_box(&stream).encode().unwrap();
            black_box(bytes)
        });
    });
    group.bench_function("decode", |b| {
        b.iter(|| {
            let decoded = Stream::decode(black_box(&encoded)).unwrap();
            black_box(decoded)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_stream_codec);
criterion_main!(benches);
