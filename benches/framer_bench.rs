// SPDX-License-Identifier: Apache-2.0

use std::io::Cursor;

use criterion::Criterion;
use criterion::Throughput;
use criterion::{criterion_group, criterion_main};
use rotel_tailer::LineFramer;

fn log_payload(lines: usize, line_len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(lines * (line_len + 1));
    for i in 0..lines {
        let line = format!("{:0width$}", i, width = line_len);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
    }
    data
}

fn framer_throughput(c: &mut Criterion) {
    let input = [
        ("short_lines", log_payload(10_000, 40)),
        ("long_lines", log_payload(1_000, 2_000)),
    ];
    let buffer_sizes = [256usize, 4096, 65536];

    let mut group = c.benchmark_group("framer_throughput");
    for (name, data) in input.iter() {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for buffer_size in buffer_sizes {
            group.bench_with_input(
                format!("framer {} buffer={}", name, buffer_size),
                data,
                |b, data| {
                    let mut framer = LineFramer::new(buffer_size);
                    b.iter(|| {
                        let mut reader = Cursor::new(data.as_slice());
                        let mut count = 0usize;
                        let end = framer
                            .read_lines(&mut reader, 0, || true, |line, _| {
                                count += criterion::black_box(line).len();
                            })
                            .unwrap();
                        criterion::black_box((end, count))
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, framer_throughput);
criterion_main!(benches);
