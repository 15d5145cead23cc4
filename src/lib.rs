//! U3D (ECMA-363) bitstream coding.
//!
//! Reads and writes the payload of U3D blocks: the adaptive binary arithmetic
//! coder, the per-context frequency models it is driven by, the raw and
//! compressed primitives built on top, and the block framing around them.
//!
//! ## Features
//! - Core library depends only on `tracing`
//! - `async` - Async file loading with tokio
//!
//! ## Example
//!
//! ```rust
//! use u3d_bitstream::{BlockReader, BlockWriter, ContextRegistry, STATIC_FULL};
//!
//! let indices = [0u32, 1, 2, 2, 1, 3];
//! let mut contexts = ContextRegistry::new();
//! let mut writer = BlockWriter::new(&mut contexts);
//! writer.write_string("mesh").unwrap();
//! for &i in &indices {
//!     writer.write_compressed_u32(STATIC_FULL + 4, i).unwrap();
//! }
//! let block = writer.finish(0xFFFF_FF3B);
//!
//! let mut contexts = ContextRegistry::new();
//! let mut reader = BlockReader::new(&block.data, &mut contexts);
//! assert_eq!(reader.read_string().unwrap(), "mesh");
//! for &i in &indices {
//!     assert_eq!(reader.read_compressed_u32(STATIC_FULL + 4).unwrap(), i);
//! }
//! ```

pub mod block;
pub mod coder;
pub mod error;
mod file_media;

pub use block::{parse_blocks, BlockType, DataBlock};
pub use coder::{
    BitStream, BitWriter, BlockReader, BlockWriter, ContextClass, ContextRegistry,
    RegistryOptions, Symbol, MAX_RANGE, RAW_CONTEXT, STATIC_FULL,
};
pub use error::{Result, U3dError};
pub use file_media::{write_blocks, LocalFileMedia};

#[cfg(feature = "async")]
pub use file_media::{read_blocks_async, FileMedia};
