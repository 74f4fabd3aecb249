use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gferasure::{CodeFamily, CodecConfig, ErasureCodeBuilder, GaloisField, Technique, WriteOp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const BLOCK: usize = 64 * 1024;

fn random_blocks(count: usize, size: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    (0..count)
        .map(|_| {
            let mut buf = vec![0u8; size];
            rng.fill(&mut buf[..]);
            buf
        })
        .collect()
}

/// Region multiply throughput for each region width
fn bench_region_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_multiply");
    group.throughput(Throughput::Bytes(BLOCK as u64));

    let src = random_blocks(1, BLOCK).remove(0);
    for w in [8u32, 16, 32] {
        let gf = GaloisField::new(w).unwrap();
        let multby = 0x1234_5678 & gf.max_element();
        group.bench_with_input(BenchmarkId::from_parameter(w), &gf, |b, gf| {
            let mut dest = vec![0u8; BLOCK];
            b.iter(|| {
                gf.region_multiply(black_box(&src), multby, &mut dest, WriteOp::Add)
                    .unwrap()
            });
        });
    }
    group.finish();
}

/// Encode throughput per family at k = 6, m = 2
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let k = 6;
    let data = random_blocks(k, BLOCK);
    group.throughput(Throughput::Bytes((k * BLOCK) as u64));

    let cases = [
        (CodeFamily::ReedSolVandermonde, 8, Technique::Matrix),
        (CodeFamily::CauchyGood, 8, Technique::Matrix),
        (CodeFamily::R6, 8, Technique::Matrix),
        (CodeFamily::CauchyGood, 8, Technique::Bitmatrix { packetsize: 1024 }),
        (CodeFamily::Liberation, 7, Technique::Bitmatrix { packetsize: 1024 }),
        (CodeFamily::Liber8tion, 8, Technique::Bitmatrix { packetsize: 1024 }),
        (CodeFamily::BlaumRoth, 6, Technique::Bitmatrix { packetsize: 1024 }),
    ];

    for (family, w, technique) in cases {
        let code = ErasureCodeBuilder::new(k, 2)
            .family(family)
            .w(w)
            .technique(technique)
            .config(CodecConfig::sequential())
            .build()
            .unwrap();
        // Trim so the block divides evenly into w * packetsize stripes
        let stripe = match technique {
            Technique::Matrix => 4,
            Technique::Bitmatrix { packetsize } => w as usize * packetsize,
        };
        let size = BLOCK / stripe * stripe;
        let inputs: Vec<&[u8]> = data.iter().map(|d| &d[..size]).collect();
        let label = format!("{}/{:?}", family, technique);

        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            let mut coding = vec![vec![0u8; size]; 2];
            b.iter(|| code.encode(black_box(&inputs), &mut coding).unwrap());
        });
    }
    group.finish();
}

/// Decode of two lost data devices, sequential against the thread pool
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_two_data");
    let (k, m) = (10, 4);
    let data = random_blocks(k, BLOCK);
    group.throughput(Throughput::Bytes((k * BLOCK) as u64));

    for (name, config) in [
        ("sequential", CodecConfig::sequential()),
        ("parallel", CodecConfig::default()),
    ] {
        let code = ErasureCodeBuilder::new(k, m)
            .family(CodeFamily::ReedSolVandermonde)
            .config(config)
            .build()
            .unwrap();
        let mut coding = vec![vec![0u8; BLOCK]; m];
        code.encode(&data, &mut coding).unwrap();

        group.bench_function(name, |b| {
            let mut damaged = data.clone();
            let mut damaged_coding = coding.clone();
            b.iter(|| {
                code.decode(black_box(&[1usize, 6][..]), &mut damaged, &mut damaged_coding)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_region_multiply, bench_encode, bench_decode);
criterion_main!(benches);
