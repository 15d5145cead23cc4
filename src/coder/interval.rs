//! Interval state of the arithmetic coder.
//!
//! `low` and `high` are the bounds of the current 16-bit coding interval,
//! `underflow` counts E3 shifts whose output bit is not decided yet. The
//! encoder and the decoder drive identical copies of this state, so every
//! bound update and both renormalization loops live here.

use super::tables::{FAST_NOT_MASK, LEADING_AGREE};
use crate::error::{Result, U3dError};

const TOP: u32 = 0xFFFF;
const HALF: u32 = 0x8000;
const QUARTER: u32 = 0x4000;
const TOP_TWO: u32 = 0xC000;

/// `low`, `high` and the pending underflow count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalState {
    low: u32,
    high: u32,
    underflow: u32,
}

impl Default for IntervalState {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalState {
    /// Full interval, nothing pending.
    pub const fn new() -> Self {
        Self {
            low: 0,
            high: TOP,
            underflow: 0,
        }
    }

    #[inline]
    pub fn low(&self) -> u32 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> u32 {
        self.high
    }

    #[inline]
    pub fn underflow(&self) -> u32 {
        self.underflow
    }

    /// True when every decided bit has been emitted and nothing is pending.
    #[inline]
    pub fn is_at_rest(&self) -> bool {
        self.low == 0 && self.high == TOP && self.underflow == 0
    }

    /// Number of codes in the interval.
    #[inline]
    pub fn range(&self) -> u32 {
        self.high - self.low + 1
    }

    fn violation(&self, detail: &'static str) -> U3dError {
        tracing::warn!(
            low = self.low,
            high = self.high,
            underflow = self.underflow,
            detail,
            "arithmetic interval invariant violated"
        );
        U3dError::InvariantViolation {
            low: self.low,
            high: self.high,
            detail,
        }
    }

    fn check(&self) -> Result<()> {
        if self.low > self.high || self.high > TOP {
            return Err(self.violation("low/high out of order"));
        }
        Ok(())
    }

    /// Map a probed code word to a cumulative frequency in `0..total`.
    ///
    /// The `+1`/`-1` pair undoes the truncation the encoder applied when it
    /// narrowed the interval.
    #[inline]
    pub fn cumulative_for_code(&self, code: u32, total: u32) -> Result<u32> {
        if code < self.low || code > self.high {
            return Err(self.violation("code word outside interval"));
        }
        Ok((total * (1 + code - self.low) - 1) / self.range())
    }

    /// Narrow to the sub-interval `[cumulative, cumulative + frequency)` of
    /// `total`. Encoder and decoder must both come through here so the
    /// truncation matches bit for bit.
    #[inline]
    pub fn narrow(&mut self, cumulative: u32, frequency: u32, total: u32) -> Result<()> {
        if frequency == 0 || total == 0 || cumulative + frequency > total {
            return Err(self.violation("empty or out-of-table sub-interval"));
        }
        let range = self.range();
        let upper = range * (cumulative + frequency) / total;
        if upper == 0 {
            return Err(self.violation("range narrower than table"));
        }
        self.high = self.low + upper - 1;
        self.low += range * cumulative / total;
        self.check()
    }

    /// E1/E2 scaling: shift out the leading bits on which `low` and `high`
    /// agree. Returns how many were shifted; they equal the top bits of the
    /// pre-call `low`.
    #[inline]
    pub fn shift_settled(&mut self) -> u32 {
        let mut shifted = 0;
        loop {
            let agree = LEADING_AGREE[(((self.low ^ self.high) >> 12) & 0xF) as usize];
            if agree == 0 {
                break;
            }
            let mask = FAST_NOT_MASK[agree as usize];
            self.low = (self.low & mask) << agree;
            self.high = ((self.high & mask) << agree) | ((1 << agree) - 1);
            shifted += agree;
            if agree < 4 {
                break;
            }
        }
        shifted
    }

    /// E3 scaling: while the interval straddles the midpoint inside the middle
    /// half, drop the second-highest bit and defer it.
    #[inline]
    pub fn shift_underflow(&mut self) -> u32 {
        let mut shifted = 0;
        while (self.low & TOP_TWO) == QUARTER && (self.high & TOP_TWO) == HALF {
            self.low = (self.low & (QUARTER - 1)) << 1;
            self.high = ((self.high & (QUARTER - 1)) << 1) | (HALF | 1);
            shifted += 1;
        }
        self.underflow += shifted;
        shifted
    }

    /// Take the pending underflow count, resetting it. Called once a settled
    /// bit resolves the deferred ones.
    #[inline]
    pub fn take_underflow(&mut self) -> u32 {
        std::mem::take(&mut self.underflow)
    }

    /// Return to the full interval after a flush.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
