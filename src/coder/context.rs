//! Per-context frequency models.
//!
//! Every compressed value in a U3D block is coded under a context id chosen by
//! the caller. The id decides which model supplies the probabilities:
//!
//! | Id range | Model |
//! |----------|-------|
//! | `0` ([`RAW_CONTEXT`]) | uniform byte table, used by the raw `U8` primitive |
//! | `1 ..= STATIC_FULL - 1` | adaptive table, learns every value it codes |
//! | `STATIC_FULL + N` | escape plus values `0..N`, uniform, never adapts |
//! | `>= MAX_RANGE` | raw, compressed primitives bypass the coder |
//!
//! Adaptive tables start out knowing only the escape symbol. A value the table
//! has not seen is coded as escape followed by the raw value, after which the
//! value is added so the next occurrence codes directly. Static tables escape
//! the same way but never learn, so a value outside `0..N` escapes every time.

use std::collections::HashMap;

use crate::error::{Result, U3dError};

/// The raw sentinel context: byte pass-through with a uniform table.
pub const RAW_CONTEXT: u32 = 0;

/// First static context id. `STATIC_FULL + N` codes the escape plus the
/// values `0..N`, one count each.
pub const STATIC_FULL: u32 = 0x0000_0400;

/// First context id that is always coded raw.
pub const MAX_RANGE: u32 = STATIC_FULL + 0x0000_3FFF;

/// Largest total frequency any table may reach.
///
/// After renormalization the interval spans at least `0x4001` codes, so a
/// total up to this bound gives every symbol a non-empty sub-interval.
pub const MAX_TOTAL_FREQUENCY: u32 = 0x3FFF;

/// Default total at which an adaptive table halves its counts.
pub const DEFAULT_RESCALE_THRESHOLD: u32 = 0x1FFF;

/// Alphabet size of the byte table.
const BYTE_ALPHABET: u32 = 256;

/// A symbol in a context's alphabet.
///
/// The escape always owns cumulative frequency `0`; values follow it. Keeping
/// the two apart avoids numbering value `v` as `v + 1`, which has no room for
/// `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// "Not yet modeled": the raw value follows.
    Escape,
    Value(u32),
}

/// How a context id is coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextClass {
    /// Bypass the model: compressed primitives fall back to the raw reader.
    Raw,
    /// Uniform, non-adaptive table of `size` symbols: the escape and the
    /// values `0..size - 1`.
    Static { size: u32 },
    /// Adaptive table with escape.
    Adaptive,
}

/// Decide how `context` is coded. Every primitive routes through this.
#[inline]
pub const fn classify(context: u32) -> ContextClass {
    if context == RAW_CONTEXT || context >= MAX_RANGE {
        ContextClass::Raw
    } else if context >= STATIC_FULL {
        ContextClass::Static {
            size: context - STATIC_FULL + 1,
        }
    } else {
        ContextClass::Adaptive
    }
}

/// Registry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Total frequency above which an adaptive table halves its counts.
    /// Must be below [`MAX_TOTAL_FREQUENCY`].
    pub rescale_threshold: u32,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            rescale_threshold: DEFAULT_RESCALE_THRESHOLD,
        }
    }
}

/// Frequencies of one adaptive context.
#[derive(Debug, Clone)]
struct AdaptiveTable {
    escape: u32,
    /// Seen values, sorted ascending, with their counts
    values: Vec<(u32, u32)>,
    total: u32,
}

impl AdaptiveTable {
    fn new() -> Self {
        Self {
            escape: 1,
            values: Vec::new(),
            total: 1,
        }
    }

    fn frequency(&self, symbol: Symbol) -> u32 {
        match symbol {
            Symbol::Escape => self.escape,
            Symbol::Value(v) => match self.values.binary_search_by_key(&v, |&(value, _)| value) {
                Ok(i) => self.values[i].1,
                Err(_) => 0,
            },
        }
    }

    fn cumulative(&self, symbol: Symbol) -> u32 {
        match symbol {
            Symbol::Escape => 0,
            Symbol::Value(v) => {
                self.escape
                    + self
                        .values
                        .iter()
                        .take_while(|&&(value, _)| value < v)
                        .map(|&(_, freq)| freq)
                        .sum::<u32>()
            }
        }
    }

    fn symbol_for(&self, cumulative: u32) -> Option<Symbol> {
        if cumulative < self.escape {
            return Some(Symbol::Escape);
        }
        let mut upper = self.escape;
        for &(value, freq) in &self.values {
            upper += freq;
            if cumulative < upper {
                return Some(Symbol::Value(value));
            }
        }
        None
    }

    fn add(&mut self, symbol: Symbol) {
        match symbol {
            Symbol::Escape => self.escape += 1,
            Symbol::Value(v) => match self.values.binary_search_by_key(&v, |&(value, _)| value) {
                Ok(i) => self.values[i].1 += 1,
                Err(i) => self.values.insert(i, (v, 1)),
            },
        }
        self.total += 1;
    }

    /// Halve every count. Values that drop to zero are forgotten and escape
    /// again on their next occurrence; the escape keeps at least one count.
    fn rescale(&mut self) {
        self.escape = (self.escape >> 1).max(1);
        self.values.retain_mut(|entry| {
            entry.1 >>= 1;
            entry.1 > 0
        });
        self.total = self.escape + self.values.iter().map(|&(_, freq)| freq).sum::<u32>();
    }
}

/// All frequency models of an import or export run.
///
/// Adaptive tables are created on first use and live as long as the registry,
/// so they keep learning across every block coded with it. Only the symbol
/// codec mutates the registry.
#[derive(Debug, Clone)]
pub struct ContextRegistry {
    tables: HashMap<u32, AdaptiveTable>,
    options: RegistryOptions,
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    /// Create a registry with the default rescale threshold.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            options: RegistryOptions::default(),
        }
    }

    /// Create a registry with custom options.
    pub fn with_options(options: RegistryOptions) -> Result<Self> {
        if options.rescale_threshold == 0 || options.rescale_threshold >= MAX_TOTAL_FREQUENCY {
            return Err(U3dError::ContextOverflow {
                context: RAW_CONTEXT,
                total: options.rescale_threshold,
            });
        }
        Ok(Self {
            tables: HashMap::new(),
            options,
        })
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    /// Number of adaptive contexts that have coded at least one symbol.
    pub fn adaptive_contexts(&self) -> usize {
        self.tables.len()
    }

    /// Forget everything learned so far.
    pub fn reset(&mut self) {
        self.tables.clear();
    }

    /// Sum of all frequencies in `context`.
    pub fn total_frequency(&self, context: u32) -> u32 {
        match classify(context) {
            ContextClass::Raw => BYTE_ALPHABET,
            ContextClass::Static { size } => size,
            ContextClass::Adaptive => self.tables.get(&context).map_or(1, |t| t.total),
        }
    }

    /// Count of `symbol` in `context`; `0` for a symbol the context cannot code
    /// directly.
    pub fn frequency(&self, context: u32, symbol: Symbol) -> u32 {
        match (classify(context), symbol) {
            (ContextClass::Raw, Symbol::Value(v)) => u32::from(v < BYTE_ALPHABET),
            (ContextClass::Raw, Symbol::Escape) => 0,
            (ContextClass::Static { size }, Symbol::Value(v)) => u32::from(v < size - 1),
            (ContextClass::Static { .. }, Symbol::Escape) => 1,
            (ContextClass::Adaptive, _) => match self.tables.get(&context) {
                Some(table) => table.frequency(symbol),
                None => u32::from(symbol == Symbol::Escape),
            },
        }
    }

    /// Sum of the frequencies of every symbol ordered before `symbol`.
    pub fn cumulative_frequency(&self, context: u32, symbol: Symbol) -> u32 {
        match (classify(context), symbol) {
            (ContextClass::Raw, Symbol::Value(v)) => v,
            (ContextClass::Static { .. }, Symbol::Value(v)) => v.saturating_add(1),
            (ContextClass::Raw | ContextClass::Static { .. }, Symbol::Escape) => 0,
            (ContextClass::Adaptive, _) => match self.tables.get(&context) {
                Some(table) => table.cumulative(symbol),
                None => u32::from(symbol != Symbol::Escape),
            },
        }
    }

    /// The symbol whose cumulative interval contains `cumulative`, or `None`
    /// when `cumulative >= total_frequency(context)`.
    pub fn symbol_for_cumulative(&self, context: u32, cumulative: u32) -> Option<Symbol> {
        if cumulative >= self.total_frequency(context) {
            return None;
        }
        match classify(context) {
            ContextClass::Raw => Some(Symbol::Value(cumulative)),
            ContextClass::Static { .. } => Some(match cumulative {
                0 => Symbol::Escape,
                c => Symbol::Value(c - 1),
            }),
            ContextClass::Adaptive => match self.tables.get(&context) {
                Some(table) => table.symbol_for(cumulative),
                None => Some(Symbol::Escape),
            },
        }
    }

    /// Count one more occurrence of `symbol`. A no-op for non-adaptive contexts.
    pub(crate) fn add_symbol(&mut self, context: u32, symbol: Symbol) -> Result<()> {
        if classify(context) != ContextClass::Adaptive {
            return Ok(());
        }
        let threshold = self.options.rescale_threshold;
        let table = self.tables.entry(context).or_insert_with(AdaptiveTable::new);
        // Totals stay at or below the threshold between calls.
        if table.total >= MAX_TOTAL_FREQUENCY {
            return Err(U3dError::ContextOverflow {
                context,
                total: table.total + 1,
            });
        }
        table.add(symbol);
        if table.total > threshold {
            let before = table.total;
            table.rescale();
            tracing::trace!(context, before, after = table.total, "rescaled context");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(RAW_CONTEXT), ContextClass::Raw);
        assert_eq!(classify(1), ContextClass::Adaptive);
        assert_eq!(classify(STATIC_FULL - 1), ContextClass::Adaptive);
        assert_eq!(classify(STATIC_FULL), ContextClass::Static { size: 1 });
        assert_eq!(classify(STATIC_FULL + 12), ContextClass::Static { size: 13 });
        assert_eq!(
            classify(MAX_RANGE - 1),
            ContextClass::Static {
                size: MAX_TOTAL_FREQUENCY
            }
        );
        assert_eq!(classify(MAX_RANGE), ContextClass::Raw);
        assert_eq!(classify(u32::MAX), ContextClass::Raw);
    }

    #[test]
    fn test_fresh_adaptive_context_only_knows_escape() {
        let registry = ContextRegistry::new();
        assert_eq!(registry.total_frequency(7), 1);
        assert_eq!(registry.frequency(7, Symbol::Escape), 1);
        assert_eq!(registry.frequency(7, Symbol::Value(3)), 0);
        assert_eq!(registry.symbol_for_cumulative(7, 0), Some(Symbol::Escape));
        assert_eq!(registry.symbol_for_cumulative(7, 1), None);
    }

    #[test]
    fn test_adaptive_cumulative_layout() {
        let mut registry = ContextRegistry::new();
        registry.add_symbol(5, Symbol::Value(9)).unwrap();
        registry.add_symbol(5, Symbol::Value(2)).unwrap();
        registry.add_symbol(5, Symbol::Value(2)).unwrap();

        // escape:1, value 2:2, value 9:1
        assert_eq!(registry.total_frequency(5), 4);
        assert_eq!(registry.cumulative_frequency(5, Symbol::Escape), 0);
        assert_eq!(registry.cumulative_frequency(5, Symbol::Value(2)), 1);
        assert_eq!(registry.cumulative_frequency(5, Symbol::Value(9)), 3);
        assert_eq!(registry.symbol_for_cumulative(5, 0), Some(Symbol::Escape));
        assert_eq!(registry.symbol_for_cumulative(5, 1), Some(Symbol::Value(2)));
        assert_eq!(registry.symbol_for_cumulative(5, 2), Some(Symbol::Value(2)));
        assert_eq!(registry.symbol_for_cumulative(5, 3), Some(Symbol::Value(9)));
        assert_eq!(registry.symbol_for_cumulative(5, 4), None);
        assert_eq!(registry.adaptive_contexts(), 1);
    }

    #[test]
    fn test_static_and_raw_tables_are_uniform() {
        let mut registry = ContextRegistry::new();
        let ctx = STATIC_FULL + 4;
        // Escape plus values 0..4.
        assert_eq!(registry.total_frequency(ctx), 5);
        assert_eq!(registry.frequency(ctx, Symbol::Escape), 1);
        assert_eq!(registry.cumulative_frequency(ctx, Symbol::Escape), 0);
        assert_eq!(registry.frequency(ctx, Symbol::Value(0)), 1);
        assert_eq!(registry.cumulative_frequency(ctx, Symbol::Value(0)), 1);
        assert_eq!(registry.frequency(ctx, Symbol::Value(3)), 1);
        assert_eq!(registry.cumulative_frequency(ctx, Symbol::Value(3)), 4);
        assert_eq!(registry.frequency(ctx, Symbol::Value(4)), 0);
        assert_eq!(registry.symbol_for_cumulative(ctx, 0), Some(Symbol::Escape));
        assert_eq!(registry.symbol_for_cumulative(ctx, 3), Some(Symbol::Value(2)));
        assert_eq!(registry.symbol_for_cumulative(ctx, 5), None);

        // STATIC_FULL itself holds only the escape.
        assert_eq!(registry.total_frequency(STATIC_FULL), 1);
        assert_eq!(registry.frequency(STATIC_FULL, Symbol::Value(0)), 0);

        assert_eq!(registry.total_frequency(RAW_CONTEXT), 256);
        assert_eq!(registry.frequency(RAW_CONTEXT, Symbol::Escape), 0);

        registry.add_symbol(ctx, Symbol::Value(1)).unwrap();
        registry.add_symbol(RAW_CONTEXT, Symbol::Value(1)).unwrap();
        assert_eq!(registry.total_frequency(ctx), 5);
        assert_eq!(registry.adaptive_contexts(), 0);
    }

    #[test]
    fn test_rescale_bounds_total() {
        let mut registry = ContextRegistry::with_options(RegistryOptions {
            rescale_threshold: 64,
        })
        .unwrap();
        registry.add_symbol(3, Symbol::Value(1)).unwrap();
        for _ in 0..500 {
            registry.add_symbol(3, Symbol::Value(0)).unwrap();
            assert!(registry.total_frequency(3) <= 64);
        }
        // The single early value halves away; the escape never does.
        assert_eq!(registry.frequency(3, Symbol::Value(1)), 0);
        assert!(registry.frequency(3, Symbol::Escape) >= 1);
    }

    #[test]
    fn test_distinct_values_stay_within_bound() {
        let mut registry = ContextRegistry::new();
        for v in 0..40_000 {
            registry.add_symbol(4, Symbol::Escape).unwrap();
            registry.add_symbol(4, Symbol::Value(v)).unwrap();
            assert!(registry.total_frequency(4) <= DEFAULT_RESCALE_THRESHOLD);
        }
        let total = registry.total_frequency(4);
        assert!(registry.symbol_for_cumulative(4, total - 1).is_some());
        assert_eq!(registry.symbol_for_cumulative(4, total), None);
    }

    #[test]
    fn test_largest_threshold_rescales() {
        let mut registry = ContextRegistry::with_options(RegistryOptions {
            rescale_threshold: MAX_TOTAL_FREQUENCY - 1,
        })
        .unwrap();
        for _ in 0..40_000 {
            registry.add_symbol(6, Symbol::Value(7)).unwrap();
            assert!(registry.total_frequency(6) < MAX_TOTAL_FREQUENCY);
        }
    }

    #[test]
    fn test_rejects_oversized_threshold() {
        for threshold in [0, MAX_TOTAL_FREQUENCY, MAX_TOTAL_FREQUENCY + 1] {
            let result = ContextRegistry::with_options(RegistryOptions {
                rescale_threshold: threshold,
            });
            assert!(matches!(result, Err(U3dError::ContextOverflow { .. })));
        }
        assert!(ContextRegistry::with_options(RegistryOptions {
            rescale_threshold: MAX_TOTAL_FREQUENCY - 1,
        })
        .is_ok());
    }

    #[test]
    fn test_reset() {
        let mut registry = ContextRegistry::new();
        registry.add_symbol(2, Symbol::Value(0)).unwrap();
        registry.reset();
        assert_eq!(registry.total_frequency(2), 1);
        assert_eq!(registry.adaptive_contexts(), 0);
    }
}
