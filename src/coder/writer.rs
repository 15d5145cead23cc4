//! Encoding side of a block session.

use super::bit_writer::BitWriter;
use super::context::{classify, ContextClass, ContextRegistry, Symbol, RAW_CONTEXT};
use super::interval::IntervalState;
use super::tables::swap_bits8;
use crate::block::DataBlock;
use crate::error::Result;

/// Writes values into the data words of one block.
///
/// Mirror of [`BlockReader`](super::BlockReader): every call here has a read
/// counterpart that must be issued with the same context, in the same order.
pub struct BlockWriter<'m> {
    sink: BitWriter,
    interval: IntervalState,
    contexts: &'m mut ContextRegistry,
}

impl<'m> BlockWriter<'m> {
    pub fn new(contexts: &'m mut ContextRegistry) -> Self {
        tracing::debug!("starting block write session");
        Self {
            sink: BitWriter::new(),
            interval: IntervalState::new(),
            contexts,
        }
    }

    /// Bits emitted so far (not counting what a flush would add).
    pub fn bit_position(&self) -> u64 {
        self.sink.bit_position()
    }

    pub fn interval(&self) -> &IntervalState {
        &self.interval
    }

    pub fn contexts(&self) -> &ContextRegistry {
        self.contexts
    }

    /// Emit a settled bit followed by the complements it resolves.
    fn emit_settled(&mut self, bit: u32) {
        self.sink.write_bit(bit);
        for _ in 0..self.interval.take_underflow() {
            self.sink.write_bit(!bit & 1);
        }
    }

    /// Encode one symbol into `context`. The symbol must have a non-zero
    /// frequency in the context's current table.
    pub fn encode_symbol(&mut self, context: u32, symbol: Symbol) -> Result<()> {
        let total = self.contexts.total_frequency(context);
        let cumulative = self.contexts.cumulative_frequency(context, symbol);
        let frequency = self.contexts.frequency(context, symbol);
        self.interval.narrow(cumulative, frequency, total)?;
        self.contexts.add_symbol(context, symbol)?;

        let low = self.interval.low();
        let settled = self.interval.shift_settled();
        if settled > 0 {
            let bits = low >> (16 - settled);
            self.emit_settled(bits >> (settled - 1));
            self.sink.write_bits_msb_first(bits, settled - 1);
        }
        self.interval.shift_underflow();
        Ok(())
    }

    /// Write one byte through the uniform byte context.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.encode_symbol(RAW_CONTEXT, Symbol::Value(u32::from(swap_bits8(value))))
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let [low, high] = value.to_le_bytes();
        self.write_u8(low)?;
        self.write_u8(high)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u16(value as u16)?;
        self.write_u16((value >> 16) as u16)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_u32(value as u32)?;
        self.write_u32((value >> 32) as u32)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    /// IEEE-754 bit pattern, no numeric conversion.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32(value.to_bits())
    }

    /// Encode a compressed value whose raw fallback is `write_raw`.
    fn write_compressed<T: Copy + Into<u32>>(
        &mut self,
        context: u32,
        value: T,
        write_raw: fn(&mut Self, T) -> Result<()>,
    ) -> Result<()> {
        let wide = value.into();
        match classify(context) {
            ContextClass::Raw => write_raw(self, value),
            ContextClass::Static { .. } | ContextClass::Adaptive => {
                if self.contexts.frequency(context, Symbol::Value(wide)) > 0 {
                    return self.encode_symbol(context, Symbol::Value(wide));
                }
                // Static contexts escape values past their alphabet and
                // ignore the add below.
                tracing::trace!(context, value = wide, "escaping unseen value");
                self.encode_symbol(context, Symbol::Escape)?;
                write_raw(self, value)?;
                self.contexts.add_symbol(context, Symbol::Value(wide))
            }
        }
    }

    pub fn write_compressed_u8(&mut self, context: u32, value: u8) -> Result<()> {
        self.write_compressed(context, value, Self::write_u8)
    }

    pub fn write_compressed_u16(&mut self, context: u32, value: u16) -> Result<()> {
        self.write_compressed(context, value, Self::write_u16)
    }

    pub fn write_compressed_u32(&mut self, context: u32, value: u32) -> Result<()> {
        self.write_compressed(context, value, Self::write_u32)
    }

    /// `U16` byte length followed by the UTF-8 bytes. Strings longer than
    /// `u16::MAX` bytes are truncated at a character boundary.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let mut end = value.len().min(usize::from(u16::MAX));
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        let bytes = &value.as_bytes()[..end];
        self.write_u16(bytes.len() as u16)?;
        for &b in bytes {
            self.write_u8(b)?;
        }
        Ok(())
    }

    /// Close the interval: the top bit of `low`, the pending complements,
    /// then the remaining fifteen bits of `low`. Enough for the reader's
    /// last probe to land inside the final interval.
    fn flush(&mut self) {
        if self.interval.is_at_rest() {
            return;
        }
        let low = self.interval.low();
        tracing::debug!(
            low,
            underflow = self.interval.underflow(),
            "flushing arithmetic interval"
        );
        self.emit_settled(low >> 15);
        self.sink.write_bits_msb_first(low, 15);
        self.interval.reset();
    }

    /// Flush the interval and pad to the next 32-bit boundary.
    pub fn align_to_word(&mut self) {
        self.flush();
        self.sink.align_to_word();
    }

    /// Write a complete block inline: type, sizes, then the padded data and
    /// metadata words.
    pub fn write_data_block(&mut self, block: &DataBlock) -> Result<()> {
        self.write_u32(block.block_type)?;
        self.write_u32(block.data_size)?;
        self.write_u32(block.metadata_size)?;
        for &word in &block.data {
            self.write_u32(word)?;
        }
        for &word in &block.metadata {
            self.write_u32(word)?;
        }
        Ok(())
    }

    /// Flush and wrap the written words into a block of `block_type`.
    pub fn finish(mut self, block_type: u32) -> DataBlock {
        self.flush();
        let data_size = self.sink.byte_len();
        let data = self.sink.into_words();
        tracing::debug!(block_type, data_size, "finished block write session");
        DataBlock::new(block_type, data, data_size)
    }
}
