use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rohcheck_core::{
    capture::MemorySource,
    codec::cross_wired_pairs,
    compare::compare,
    orchestrator::DualFlowOrchestrator,
    report::{ReportEmitter, ReportFormat},
    types::{CidMode, Frame, LinkType},
};
use std::io::sink;

fn ethernet_frame(id: u16, size: usize) -> Frame {
    let mut data = vec![0u8; 14 + size];
    data[12] = 0x08;
    let ip = &mut data[14..];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&(size as u16).to_be_bytes());
    ip[4..6].copy_from_slice(&id.to_be_bytes());
    ip[12..16].copy_from_slice(&[192, 168, 0, 1]);
    ip[16..20].copy_from_slice(&[192, 168, 0, (id % 8) as u8]);
    Frame::new(LinkType::Ethernet, Bytes::from(data))
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("dual_flow_run");

    for cid_mode in [CidMode::Small, CidMode::Large] {
        let frames: Vec<_> = (0..256).map(|id| ethernet_frame(id, 512)).collect();
        let bytes: usize = frames.iter().map(|f| f.data.len()).sum();

        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(cid_mode),
            &frames,
            |b, frames| {
                b.iter(|| {
                    let pairs = cross_wired_pairs(cid_mode, 15).unwrap();
                    let mut source = MemorySource::new(LinkType::Ethernet, frames.clone());
                    let mut report = ReportEmitter::new(sink(), ReportFormat::Xml);
                    DualFlowOrchestrator::new(pairs, cid_mode)
                        .run(&mut source, &mut report)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    for size in [64, 512, 1500] {
        let left = vec![0x42u8; size];
        let mut right = left.clone();
        right[size / 2] ^= 0xFF;

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| compare(black_box(&left), black_box(&right)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run, bench_compare);
criterion_main!(benches);
