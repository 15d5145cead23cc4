//! U3D adaptive arithmetic coder.
//!
//! This module reads and writes the data section of U3D blocks. Every value,
//! including plain bytes, passes through one binary arithmetic coder with a
//! 16-bit interval; only the probability model behind each call changes.
//!
//! ## Contexts
//!
//! | Id | Model | Used by |
//! |----|-------|---------|
//! | `0` | uniform bytes | `U8`/`U16`/`U32`/`I32`/`F32` and raw fallbacks |
//! | `1 ..= 0x3FF` | adaptive, with escape | compressed values that repeat |
//! | `0x400 + N` | escape plus uniform `0..N` | indices into tables of `N` entries |
//! | `>= 0x43FF` | none, written raw | compressed calls that opt out |
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │ BlockReader / BlockWriter     │ ← U8..F32, compressed U8..U32, strings
//! └───────────────────────────────┘
//!       ↓ decode_symbol / encode_symbol
//! ┌───────────────┐ ┌─────────────┐
//! │ IntervalState │ │ Context     │ ← low/high/underflow, frequency tables
//! │               │ │ Registry    │
//! └───────────────┘ └─────────────┘
//!       ↓
//! ┌───────────────────────────────┐
//! │ BitStream / BitWriter         │ ← LSB-first bits in 32-bit words
//! └───────────────────────────────┘
//! ```
//!
//! ## Stream layout
//!
//! Settled bits are written most significant first, but bits are packed
//! LSB-first inside each word. A byte written from a fresh interval through
//! the byte context therefore lands in the word verbatim: the byte is
//! bit-reversed before coding and the packing reverses it back.
//!
//! The decoder never keeps a code register. Before each symbol it probes the
//! next code word at the cursor, rewinds, and after renormalizing advances the
//! cursor by exactly the bits the encoder settled for that symbol.

mod bit_stream;
mod bit_writer;
pub mod context;
mod interval;
mod reader;
mod tables;
mod writer;


pub use bit_stream::BitStream;
pub use bit_writer::BitWriter;
pub use context::{
    classify, ContextClass, ContextRegistry, RegistryOptions, Symbol, MAX_RANGE, RAW_CONTEXT,
    STATIC_FULL,
};
pub use interval::IntervalState;
pub use reader::BlockReader;
pub use writer::BlockWriter;
