//! XOR-only decoding, checked through the operation counters
//!
//! The counters are process-wide, so this binary holds a single test.

use gferasure::{stats, CodeFamily, CodecConfig, ErasureCodeBuilder};

#[test]
fn test_liberation_single_erasure_uses_only_xor() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (k, w, packetsize) = (4usize, 4u32, 8usize);
    let code = ErasureCodeBuilder::new(k, 2)
        .family(CodeFamily::Liberation)
        .w(w)
        .packetsize(packetsize)
        .config(CodecConfig::sequential())
        .build()
        .unwrap();

    let size = 4 * w as usize * packetsize;
    let data: Vec<Vec<u8>> = (0..k)
        .map(|d| (0..size).map(|i| (i * 31 + d * 7) as u8).collect())
        .collect();
    let mut coding = vec![vec![0u8; size]; 2];

    stats::take();
    code.encode(&data, &mut coding).unwrap();
    let encoded = stats::take();
    assert_eq!(encoded.gf_bytes, 0);
    // Every output packet row starts with one copy; the rest of the
    // 2kw + k - 1 ones are XORs
    let stripes = (size / (w as usize * packetsize)) as u64;
    let packet = packetsize as u64;
    let ones = (2 * k * w as usize + k - 1) as u64;
    let rows = 2 * w as u64;
    assert_eq!(encoded.copy_bytes, rows * packet * stripes);
    assert_eq!(encoded.xor_bytes, (ones - rows) * packet * stripes);

    let mut damaged = data.clone();
    damaged[2].fill(0);
    code.decode(&[2], &mut damaged, &mut coding).unwrap();
    let decoded = stats::take();

    assert_eq!(damaged, data);
    assert_eq!(decoded.gf_bytes, 0);
    // P parity plus the three survivors: one copy and three XORs per packet row
    assert_eq!(decoded.copy_bytes, size as u64);
    assert_eq!(decoded.xor_bytes, 3 * size as u64);

    // take() left the counters at zero
    assert_eq!(stats::snapshot().total(), 0);
}
