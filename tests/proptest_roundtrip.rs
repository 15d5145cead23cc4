use proptest::prelude::*;
use u3d_bitstream::coder::context::MAX_TOTAL_FREQUENCY;
use u3d_bitstream::{
    BlockReader, BlockWriter, ContextRegistry, DataBlock, RegistryOptions, MAX_RANGE, STATIC_FULL,
};

/// One write call and the matching read.
#[derive(Debug, Clone)]
enum Op {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(u32),
    Compressed(u32, u32),
    CompressedU8(u32, u8),
    Static(u32, u32),
    Align,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::U8),
        any::<u16>().prop_map(Op::U16),
        any::<u32>().prop_map(Op::U32),
        any::<u32>().prop_map(Op::F32),
        // Few contexts and small values so tables actually learn.
        (1u32..6, 0u32..20).prop_map(|(c, v)| Op::Compressed(c, v)),
        (1u32..6, any::<u32>()).prop_map(|(c, v)| Op::Compressed(c, v)),
        (prop_oneof![Just(0u32), Just(MAX_RANGE), 6u32..10], any::<u8>())
            .prop_map(|(c, v)| Op::CompressedU8(c, v)),
        // Static tables code 0..n directly and escape anything past that.
        (0u32..64).prop_flat_map(|n| (Just(n), 0..n + 3)).prop_map(|(n, v)| Op::Static(n, v)),
        Just(Op::Align),
    ]
}

fn encode(ops: &[Op], options: RegistryOptions) -> DataBlock {
    let mut contexts = ContextRegistry::with_options(options).unwrap();
    let mut w = BlockWriter::new(&mut contexts);
    for op in ops {
        match *op {
            Op::U8(v) => w.write_u8(v).unwrap(),
            Op::U16(v) => w.write_u16(v).unwrap(),
            Op::U32(v) => w.write_u32(v).unwrap(),
            Op::F32(bits) => w.write_f32(f32::from_bits(bits)).unwrap(),
            Op::Compressed(c, v) => w.write_compressed_u32(c, v).unwrap(),
            Op::CompressedU8(c, v) => w.write_compressed_u8(c, v).unwrap(),
            Op::Static(n, v) => w.write_compressed_u32(STATIC_FULL + n, v).unwrap(),
            Op::Align => w.align_to_word(),
        }
    }
    w.finish(0xFFFF_FF3B)
}

proptest! {
    #[test]
    fn prop_round_trip(ops in prop::collection::vec(op_strategy(), 0..300)) {
        let options = RegistryOptions::default();
        let block = encode(&ops, options);
        prop_assert_eq!(block.data.len(), DataBlock::words_for(block.data_size));

        let mut contexts = ContextRegistry::with_options(options).unwrap();
        let mut r = BlockReader::new(&block.data, &mut contexts);
        for op in &ops {
            match *op {
                Op::U8(v) => prop_assert_eq!(r.read_u8().unwrap(), v),
                Op::U16(v) => prop_assert_eq!(r.read_u16().unwrap(), v),
                Op::U32(v) => prop_assert_eq!(r.read_u32().unwrap(), v),
                Op::F32(bits) => prop_assert_eq!(r.read_f32().unwrap().to_bits(), bits),
                Op::Compressed(c, v) => prop_assert_eq!(r.read_compressed_u32(c).unwrap(), v),
                Op::CompressedU8(c, v) => prop_assert_eq!(r.read_compressed_u8(c).unwrap(), v),
                Op::Static(n, v) => {
                    prop_assert_eq!(r.read_compressed_u32(STATIC_FULL + n).unwrap(), v)
                }
                Op::Align => r.align_to_word().unwrap(),
            }
        }
        prop_assert!(r.finish().unwrap() <= u64::from(block.data_size) * 8);
    }

    #[test]
    fn prop_round_trip_with_tight_rescale(
        values in prop::collection::vec((1u32..4, 0u32..40), 0..600),
        threshold in prop_oneof![8u32..100, Just(MAX_TOTAL_FREQUENCY - 1)],
    ) {
        let options = RegistryOptions { rescale_threshold: threshold };
        let ops: Vec<Op> = values.iter().map(|&(c, v)| Op::Compressed(c, v)).collect();
        let block = encode(&ops, options);

        let mut contexts = ContextRegistry::with_options(options).unwrap();
        let mut r = BlockReader::new(&block.data, &mut contexts);
        for &(c, v) in &values {
            prop_assert_eq!(r.read_compressed_u32(c).unwrap(), v);
        }
    }

    #[test]
    fn prop_round_trip_wide_alphabet(values in prop::collection::vec(0u32..50_000, 0..3000)) {
        let ops: Vec<Op> = values.iter().map(|&v| Op::Compressed(1, v)).collect();
        let block = encode(&ops, RegistryOptions::default());

        let mut contexts = ContextRegistry::new();
        let mut r = BlockReader::new(&block.data, &mut contexts);
        for &v in &values {
            prop_assert_eq!(r.read_compressed_u32(1).unwrap(), v);
        }
    }

    #[test]
    fn prop_deterministic(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let options = RegistryOptions::default();
        prop_assert_eq!(encode(&ops, options).to_bytes(), encode(&ops, options).to_bytes());
    }
}
