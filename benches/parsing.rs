use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use mimescan::{Cancellation, StructureParser};

fn synthetic_message(parts: usize, lines_per_part: usize) -> Vec<u8> {
    let mut msg = b"From: bench@example.com\r\n\
Subject: benchmark\r\n\
Content-Type: multipart/mixed; boundary=\"bench-boundary\"\r\n\
\r\n\
preamble\r\n"
        .to_vec();
    for i in 0..parts {
        msg.extend_from_slice(b"--bench-boundary\r\nContent-Type: text/plain\r\n\r\n");
        for j in 0..lines_per_part {
            msg.extend_from_slice(format!("part {i} line {j} lorem ipsum dolor sit amet\r\n").as_bytes());
        }
    }
    msg.extend_from_slice(b"--bench-boundary--\r\n");
    msg
}

fn bench_scan_multipart(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let message = synthetic_message(200, 500);
    let parser = StructureParser::default();

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("multipart_200_parts", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut src: &[u8] = &message;
                parser
                    .parse(&mut src, &Cancellation::never())
                    .await
                    .unwrap()
            })
        })
    });
    group.finish();
}

fn bench_scan_single_part(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut message = b"Subject: big\r\nContent-Type: text/plain\r\n\r\n".to_vec();
    for i in 0..100_000 {
        message.extend_from_slice(format!("body line {i}\r\n").as_bytes());
    }
    let parser = StructureParser::default();

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("single_part_100k_lines", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut src: &[u8] = &message;
                parser
                    .parse(&mut src, &Cancellation::never())
                    .await
                    .unwrap()
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_scan_multipart, bench_scan_single_part);
criterion_main!(benches);
