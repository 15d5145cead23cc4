//! Constant lookup tables shared by the bit stream and the interval coder.

/// Bit-reversed value of every nibble.
pub const NIBBLE_REVERSE: [u16; 16] = [
    0x0, 0x8, 0x4, 0xC, 0x2, 0xA, 0x6, 0xE, 0x1, 0x9, 0x5, 0xD, 0x3, 0xB, 0x7, 0xF,
];

/// Number of leading bits on which `low` and `high` agree, indexed by the top
/// nibble of `low ^ high`.
pub const LEADING_AGREE: [u32; 16] = [4, 3, 2, 2, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0];

/// Mask keeping the bits that survive a left shift by the index, within 16 bits.
pub const FAST_NOT_MASK: [u32; 5] = [0xFFFF, 0x7FFF, 0x3FFF, 0x1FFF, 0x0FFF];

/// Reverse the low 15 bits of `value` using the nibble table.
///
/// The stream packs bits LSB-first, so a 15-bit window pulled straight out of a
/// word has its first bit at position 0. Reversing the 16-bit quantity swaps
/// the nibble order and reverses each nibble; the final shift drops the unused
/// sixteenth bit.
#[inline]
pub const fn reverse_15(value: u16) -> u16 {
    let v = value & 0x7FFF;
    let reversed = (NIBBLE_REVERSE[(v & 0xF) as usize] << 12)
        | (NIBBLE_REVERSE[((v >> 4) & 0xF) as usize] << 8)
        | (NIBBLE_REVERSE[((v >> 8) & 0xF) as usize] << 4)
        | NIBBLE_REVERSE[((v >> 12) & 0xF) as usize];
    reversed >> 1
}

/// Reverse the bits of a byte.
#[inline]
pub const fn swap_bits8(value: u8) -> u8 {
    ((NIBBLE_REVERSE[(value & 0xF) as usize] << 4) | NIBBLE_REVERSE[(value >> 4) as usize]) as u8
}
