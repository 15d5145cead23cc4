#![no_main]
use libfuzzer_sys::fuzz_target;
use u3d_bitstream::parse_blocks;

fuzz_target!(|data: &[u8]| {
    for block in parse_blocks(data) {
        match block {
            Ok(block) => assert_eq!(block.to_bytes().len(), block.encoded_len()),
            Err(_) => break,
        }
    }
});
