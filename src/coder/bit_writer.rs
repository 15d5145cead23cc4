//! Bit writer producing the data words of a U3D block.
//!
//! The exact inverse of [`BitStream`](super::BitStream): bits go in LSB first
//! inside each 32-bit word.

/// Growable word buffer with a bit cursor.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    words: Vec<u32>,
    /// Number of bits written so far
    bit_pos: u64,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single bit (only the lowest bit of `bit` is used).
    #[inline]
    pub fn write_bit(&mut self, bit: u32) {
        let index = (self.bit_pos >> 5) as usize;
        if index == self.words.len() {
            self.words.push(0);
        }
        self.words[index] |= (bit & 1) << (self.bit_pos & 31);
        self.bit_pos += 1;
    }

    /// Append the low `count` bits of `value`, most significant first.
    #[inline]
    pub fn write_bits_msb_first(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        for shift in (0..count).rev() {
            self.write_bit(value >> shift);
        }
    }

    /// Pad with zero bits up to the next 32-bit boundary.
    pub fn align_to_word(&mut self) {
        self.bit_pos = (self.bit_pos + 31) & !31;
        let needed = (self.bit_pos >> 5) as usize;
        self.words.resize(needed, 0);
    }

    /// Number of bits written.
    #[inline]
    pub fn bit_position(&self) -> u64 {
        self.bit_pos
    }

    /// Number of bytes touched by the written bits.
    pub fn byte_len(&self) -> u32 {
        ((self.bit_pos + 7) >> 3) as u32
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::BitStream;

    #[test]
    fn test_write_bits_lsb_first() {
        let mut writer = BitWriter::new();
        writer.write_bit(1);
        writer.write_bit(0);
        writer.write_bit(1);
        assert_eq!(writer.words, vec![0b101]);
        assert_eq!(writer.bit_position(), 3);
        assert_eq!(writer.byte_len(), 1);
    }

    #[test]
    fn test_spills_into_next_word() {
        let mut writer = BitWriter::new();
        writer.write_bits_msb_first(0, 31);
        writer.write_bits_msb_first(0b11, 2);
        assert_eq!(writer.words, vec![0x8000_0000, 0x0000_0001]);
        assert_eq!(writer.byte_len(), 5);
    }

    #[test]
    fn test_align_to_word() {
        let mut writer = BitWriter::new();
        writer.align_to_word();
        assert_eq!(writer.bit_position(), 0);
        assert!(writer.words.is_empty());

        writer.write_bit(1);
        writer.align_to_word();
        assert_eq!(writer.bit_position(), 32);
        writer.write_bit(1);
        assert_eq!(writer.into_words(), vec![1, 1]);
    }

    #[test]
    fn test_reads_back_through_bit_stream() {
        let mut writer = BitWriter::new();
        writer.write_bits_msb_first(0x5A5A, 16);
        writer.write_bits_msb_first(0x1234, 15);
        writer.write_bits_msb_first(0x7FFF, 15);
        let words = writer.into_words();

        let mut stream = BitStream::new(&words);
        let mut first = 0u32;
        for _ in 0..16 {
            first = (first << 1) | stream.read_bit().unwrap();
        }
        assert_eq!(first, 0x5A5A);
        assert_eq!(stream.read_15_bits().unwrap(), 0x1234);
        assert_eq!(stream.read_15_bits().unwrap(), 0x7FFF);
    }
}
