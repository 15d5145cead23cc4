//! Decoding side of a block session.

use super::bit_stream::BitStream;
use super::context::{classify, ContextClass, ContextRegistry, Symbol, RAW_CONTEXT};
use super::interval::IntervalState;
use super::tables::swap_bits8;
use crate::block::DataBlock;
use crate::error::{Result, U3dError};

/// Reads values out of the data words of one block.
///
/// Owns the bit cursor and the interval state for the block, and borrows the
/// registry so adaptive contexts carry over into the next block.
///
/// # Example
///
/// ```rust
/// use u3d_bitstream::{BlockReader, BlockWriter, ContextRegistry};
///
/// let mut contexts = ContextRegistry::new();
/// let mut writer = BlockWriter::new(&mut contexts);
/// writer.write_u32(0xDEAD_BEEF).unwrap();
/// writer.write_compressed_u32(1, 42).unwrap();
/// let block = writer.finish(0xFFFF_FF3B);
///
/// let mut contexts = ContextRegistry::new();
/// let mut reader = BlockReader::new(&block.data, &mut contexts);
/// assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
/// assert_eq!(reader.read_compressed_u32(1).unwrap(), 42);
/// ```
pub struct BlockReader<'a, 'm> {
    stream: BitStream<'a>,
    interval: IntervalState,
    contexts: &'m mut ContextRegistry,
}

impl<'a, 'm> BlockReader<'a, 'm> {
    pub fn new(words: &'a [u32], contexts: &'m mut ContextRegistry) -> Self {
        tracing::debug!(words = words.len(), "starting block read session");
        Self {
            stream: BitStream::new(words),
            interval: IntervalState::new(),
            contexts,
        }
    }

    /// Current cursor position in bits.
    pub fn bit_position(&self) -> u64 {
        self.stream.bit_position()
    }

    pub fn interval(&self) -> &IntervalState {
        &self.interval
    }

    pub fn contexts(&self) -> &ContextRegistry {
        self.contexts
    }

    /// Peek the 16-bit code word at `position` without moving the cursor.
    ///
    /// The bit under the cursor is the top bit; the pending underflow bits
    /// that follow it were dropped from the encoder's interval, so they are
    /// skipped before the remaining fifteen.
    fn probe_code(&mut self, position: u64) -> u32 {
        let top = self.stream.read_bit_padded();
        self.stream
            .seek_to_bit(position + 1 + u64::from(self.interval.underflow()));
        let rest = self.stream.read_15_bits_padded();
        self.stream.seek_to_bit(position);
        (top << 15) | u32::from(rest)
    }

    /// Decode one symbol from `context`.
    pub fn decode_symbol(&mut self, context: u32) -> Result<Symbol> {
        // Tentative phase: look at the code word, leave the cursor where it was.
        let position = self.stream.bit_position();
        let code = self.probe_code(position);

        let total = self.contexts.total_frequency(context);
        let cumulative = self.interval.cumulative_for_code(code, total)?;
        let symbol = self
            .contexts
            .symbol_for_cumulative(context, cumulative)
            .ok_or(U3dError::InvariantViolation {
                low: self.interval.low(),
                high: self.interval.high(),
                detail: "cumulative frequency beyond table",
            })?;
        let symbol_cumulative = self.contexts.cumulative_frequency(context, symbol);
        let frequency = self.contexts.frequency(context, symbol);
        self.interval.narrow(symbol_cumulative, frequency, total)?;
        self.contexts.add_symbol(context, symbol)?;

        // Commit phase: advance by exactly the bits the symbol settled.
        let settled = self.interval.shift_settled();
        let consumed = if settled > 0 {
            settled + self.interval.take_underflow()
        } else {
            0
        };
        self.interval.shift_underflow();
        self.advance(position + u64::from(consumed))?;
        Ok(symbol)
    }

    fn advance(&mut self, position: u64) -> Result<()> {
        let length = self.stream.len_bits();
        if position > length {
            return Err(U3dError::StreamExhausted { position, length });
        }
        self.stream.seek_to_bit(position);
        Ok(())
    }

    /// Read one byte through the uniform byte context.
    pub fn read_u8(&mut self) -> Result<u8> {
        match self.decode_symbol(RAW_CONTEXT)? {
            Symbol::Value(v) => Ok(swap_bits8(v as u8)),
            Symbol::Escape => Err(U3dError::InvariantViolation {
                low: self.interval.low(),
                high: self.interval.high(),
                detail: "escape decoded from byte context",
            }),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let low = self.read_u8()?;
        let high = self.read_u8()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let low = self.read_u16()?;
        let high = self.read_u16()?;
        Ok(u32::from(low) | (u32::from(high) << 16))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let low = self.read_u32()?;
        let high = self.read_u32()?;
        Ok(u64::from(low) | (u64::from(high) << 32))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// IEEE-754 bit pattern, no numeric conversion.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Decode a compressed value whose raw fallback is `read_raw`.
    fn read_compressed<T: Copy>(
        &mut self,
        context: u32,
        read_raw: fn(&mut Self) -> Result<T>,
        widen: fn(T) -> u32,
        narrow: fn(u32) -> T,
    ) -> Result<T> {
        match classify(context) {
            ContextClass::Raw => read_raw(self),
            ContextClass::Static { .. } | ContextClass::Adaptive => {
                match self.decode_symbol(context)? {
                    Symbol::Value(v) => Ok(narrow(v)),
                    Symbol::Escape => {
                        let value = read_raw(self)?;
                        tracing::trace!(context, value = widen(value), "escaped value");
                        self.contexts
                            .add_symbol(context, Symbol::Value(widen(value)))?;
                        Ok(value)
                    }
                }
            }
        }
    }

    pub fn read_compressed_u8(&mut self, context: u32) -> Result<u8> {
        self.read_compressed(context, Self::read_u8, u32::from, |v| v as u8)
    }

    pub fn read_compressed_u16(&mut self, context: u32) -> Result<u16> {
        self.read_compressed(context, Self::read_u16, u32::from, |v| v as u16)
    }

    pub fn read_compressed_u32(&mut self, context: u32) -> Result<u32> {
        self.read_compressed(context, Self::read_u32, |v| v, |v| v)
    }

    /// `U16` byte length followed by that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16()?;
        let mut bytes = Vec::with_capacity(len as usize);
        for _ in 0..len {
            bytes.push(self.read_u8()?);
        }
        String::from_utf8(bytes).map_err(|_| U3dError::InvalidString)
    }

    /// Skip whatever the writer flushed to close the current interval, then
    /// move to the next 32-bit boundary.
    pub fn align_to_word(&mut self) -> Result<()> {
        self.resync()?;
        self.stream.align_to_word();
        Ok(())
    }

    /// Mirror of the writer's flush: 16 bits of `low` plus the pending
    /// underflow bits, nothing if the interval is at rest.
    fn resync(&mut self) -> Result<()> {
        if self.interval.is_at_rest() {
            return Ok(());
        }
        let skip = 16 + u64::from(self.interval.underflow());
        self.advance(self.stream.bit_position() + skip)?;
        self.interval.reset();
        Ok(())
    }

    /// Read a nested block written by
    /// [`BlockWriter::write_data_block`](super::BlockWriter::write_data_block).
    pub fn read_data_block(&mut self) -> Result<DataBlock> {
        let block_type = self.read_u32()?;
        let data_size = self.read_u32()?;
        let metadata_size = self.read_u32()?;
        let data = (0..DataBlock::words_for(data_size))
            .map(|_| self.read_u32())
            .collect::<Result<Vec<_>>>()?;
        let metadata = (0..DataBlock::words_for(metadata_size))
            .map(|_| self.read_u32())
            .collect::<Result<Vec<_>>>()?;
        Ok(DataBlock {
            block_type,
            data_size,
            metadata_size,
            data,
            metadata,
        })
    }

    /// End the session, returning the number of bits consumed.
    pub fn finish(mut self) -> Result<u64> {
        self.resync()?;
        let consumed = self.stream.bit_position();
        tracing::debug!(bits = consumed, "finished block read session");
        Ok(consumed)
    }
}
