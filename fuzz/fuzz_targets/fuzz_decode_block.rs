#![no_main]
use libfuzzer_sys::fuzz_target;
use u3d_bitstream::{BlockReader, ContextRegistry, STATIC_FULL};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Byte 0: starting read kind, byte 1: static table size
    let selector = u32::from(data[0]);
    let static_size = u32::from(data[1]);

    let words: Vec<u32> = data[2..]
        .chunks(4)
        .map(|c| {
            let mut word = [0u8; 4];
            word[..c.len()].copy_from_slice(c);
            u32::from_le_bytes(word)
        })
        .collect();

    let mut contexts = ContextRegistry::new();
    let mut reader = BlockReader::new(&words, &mut contexts);
    // Some reads settle no bits at all, so bound the loop.
    for i in 0..4096u32 {
        let result = match (selector + i) % 5 {
            0 => reader.read_u8().map(u32::from),
            1 => reader.read_compressed_u32(1 + i % 7),
            2 => reader.read_compressed_u32(STATIC_FULL + static_size),
            3 => reader.read_compressed_u16(9).map(u32::from),
            _ => reader.read_string().map(|s| s.len() as u32),
        };
        if result.is_err() {
            break;
        }
    }
});
