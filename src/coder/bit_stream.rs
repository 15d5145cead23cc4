//! Bit reader over the data words of a U3D block.
//!
//! Bits are packed LSB first inside each little-endian 32-bit word.

use super::tables::reverse_15;
use crate::error::{Result, U3dError};

/// Read cursor over a packed `u32` word array.
///
/// Keeps the word under the cursor and the one after it cached so that
/// 15-bit reads straddling a word boundary never touch the slice twice.
/// Cached words read as `0` past the end of the array.
pub struct BitStream<'a> {
    words: &'a [u32],
    word_index: usize,
    /// Bit offset inside `current_word` (0-31)
    bit_offset: u32,
    current_word: u32,
    next_word: u32,
}

impl<'a> BitStream<'a> {
    /// Create a new bit stream positioned at bit 0.
    pub fn new(words: &'a [u32]) -> Self {
        let mut stream = Self {
            words,
            word_index: 0,
            bit_offset: 0,
            current_word: 0,
            next_word: 0,
        };
        stream.refresh_cache();
        stream
    }

    /// Attach a new word array and rewind to bit 0.
    pub fn load(&mut self, words: &'a [u32]) {
        self.words = words;
        self.word_index = 0;
        self.bit_offset = 0;
        self.refresh_cache();
    }

    fn refresh_cache(&mut self) {
        self.current_word = self.words.get(self.word_index).copied().unwrap_or(0);
        self.next_word = self.words.get(self.word_index + 1).copied().unwrap_or(0);
    }

    /// Move to the next word, shifting the cache by one.
    #[inline]
    fn roll_word(&mut self) {
        self.word_index += 1;
        self.current_word = self.next_word;
        self.next_word = self.words.get(self.word_index + 1).copied().unwrap_or(0);
    }

    #[inline]
    fn ensure_readable(&self) -> Result<()> {
        let position = self.bit_position();
        if position >= self.len_bits() {
            return Err(U3dError::StreamExhausted {
                position,
                length: self.len_bits(),
            });
        }
        Ok(())
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<u32> {
        self.ensure_readable()?;
        Ok(self.read_bit_padded())
    }

    /// Read 15 bits, returned with the first stream bit as the MSB.
    ///
    /// Only the first bit has to lie inside the stream; the rest of the window
    /// is zero-filled past the end.
    #[inline]
    pub fn read_15_bits(&mut self) -> Result<u16> {
        self.ensure_readable()?;
        Ok(self.read_15_bits_padded())
    }

    /// Bit read used by the decoder's probe: never fails, zeros past the end.
    #[inline]
    pub(crate) fn read_bit_padded(&mut self) -> u32 {
        let bit = (self.current_word >> self.bit_offset) & 1;
        self.bit_offset += 1;
        if self.bit_offset == 32 {
            self.bit_offset = 0;
            self.roll_word();
        }
        bit
    }

    #[inline]
    pub(crate) fn read_15_bits_padded(&mut self) -> u16 {
        let mut window = self.current_word >> self.bit_offset;
        if self.bit_offset > 17 {
            window |= self.next_word << (32 - self.bit_offset);
        }
        self.bit_offset += 15;
        if self.bit_offset >= 32 {
            self.bit_offset -= 32;
            self.roll_word();
        }
        reverse_15((window & 0x7FFF) as u16)
    }

    /// Current bit position.
    #[inline]
    pub fn bit_position(&self) -> u64 {
        ((self.word_index as u64) << 5) + u64::from(self.bit_offset)
    }

    /// Reposition to an absolute bit. Seeking past the end is allowed; the
    /// next read reports the exhaustion.
    pub fn seek_to_bit(&mut self, position: u64) {
        self.word_index = (position >> 5) as usize;
        self.bit_offset = (position & 31) as u32;
        self.refresh_cache();
    }

    /// Total number of bits in the stream.
    #[inline]
    pub fn len_bits(&self) -> u64 {
        (self.words.len() as u64) << 5
    }

    /// Remaining bits from the cursor to the end.
    pub fn remaining_bits(&self) -> u64 {
        self.len_bits().saturating_sub(self.bit_position())
    }

    /// Skip to the next 32-bit boundary.
    pub fn align_to_word(&mut self) {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.roll_word();
        }
    }
}
