//! U3D block framing (ECMA-363 §9.2).
//!
//! Every U3D block is laid out as:
//!
//! ```text
//! u32 block_type
//! u32 data_size        (bytes, without padding)
//! u32 metadata_size    (bytes, without padding)
//! data                 (padded to a multiple of 4 bytes)
//! metadata             (padded to a multiple of 4 bytes)
//! ```
//!
//! All fields are little-endian. The arithmetic coder works on the `data`
//! section as an array of 32-bit words.

use std::io::Write;

use crate::error::{Result, U3dError};

/// Known block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    FileHeader,
    ModifierChain,
    ModelNode,
    LightNode,
    ViewNode,
    MeshDeclaration,
    MeshContinuation,
    ShadingModifier,
    LightResource,
    ViewResource,
    LitTextureShader,
    MaterialResource,
    Other(u32),
}

impl BlockType {
    pub fn from_u32(v: u32) -> Self {
        match v {
            0x0044_3355 => Self::FileHeader,
            0xFFFF_FF14 => Self::ModifierChain,
            0xFFFF_FF22 => Self::ModelNode,
            0xFFFF_FF23 => Self::LightNode,
            0xFFFF_FF24 => Self::ViewNode,
            0xFFFF_FF31 => Self::MeshDeclaration,
            0xFFFF_FF3B => Self::MeshContinuation,
            0xFFFF_FF45 => Self::ShadingModifier,
            0xFFFF_FF51 => Self::LightResource,
            0xFFFF_FF52 => Self::ViewResource,
            0xFFFF_FF53 => Self::LitTextureShader,
            0xFFFF_FF54 => Self::MaterialResource,
            other => Self::Other(other),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::FileHeader => 0x0044_3355,
            Self::ModifierChain => 0xFFFF_FF14,
            Self::ModelNode => 0xFFFF_FF22,
            Self::LightNode => 0xFFFF_FF23,
            Self::ViewNode => 0xFFFF_FF24,
            Self::MeshDeclaration => 0xFFFF_FF31,
            Self::MeshContinuation => 0xFFFF_FF3B,
            Self::ShadingModifier => 0xFFFF_FF45,
            Self::LightResource => 0xFFFF_FF51,
            Self::ViewResource => 0xFFFF_FF52,
            Self::LitTextureShader => 0xFFFF_FF53,
            Self::MaterialResource => 0xFFFF_FF54,
            Self::Other(v) => v,
        }
    }
}

/// One serialized U3D block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    pub block_type: u32,
    /// Data size in bytes, without padding
    pub data_size: u32,
    /// Metadata size in bytes, without padding
    pub metadata_size: u32,
    pub data: Vec<u32>,
    pub metadata: Vec<u32>,
}

impl DataBlock {
    /// Fixed part of every block: type and the two sizes.
    pub const HEADER_SIZE: usize = 12;

    /// Block with data and no metadata.
    pub fn new(block_type: u32, data: Vec<u32>, data_size: u32) -> Self {
        debug_assert_eq!(data.len(), Self::words_for(data_size));
        Self {
            block_type,
            data_size,
            metadata_size: 0,
            data,
            metadata: Vec::new(),
        }
    }

    /// Number of padded words holding `size` bytes.
    pub fn words_for(size: u32) -> usize {
        (size as usize).div_ceil(4)
    }

    pub fn kind(&self) -> BlockType {
        BlockType::from_u32(self.block_type)
    }

    /// Serialized length including padding.
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + 4 * (self.data.len() + self.metadata.len())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.block_type.to_le_bytes());
        out.extend_from_slice(&self.data_size.to_le_bytes());
        out.extend_from_slice(&self.metadata_size.to_le_bytes());
        for word in self.data.iter().chain(&self.metadata) {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Write the serialized block, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<usize> {
        let bytes = self.to_bytes();
        out.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Parse one block from the start of `buffer`.
    ///
    /// Returns the block and the number of bytes it occupied.
    pub fn parse(buffer: &[u8]) -> Result<(Self, usize)> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(U3dError::BufferTooSmall {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }

        let block_type = read_le_u32(buffer, 0);
        let data_size = read_le_u32(buffer, 4);
        let metadata_size = read_le_u32(buffer, 8);

        let data_words = Self::words_for(data_size);
        let metadata_words = Self::words_for(metadata_size);
        let needed = Self::HEADER_SIZE + 4 * (data_words + metadata_words);
        if buffer.len() < needed {
            return Err(U3dError::BufferTooSmall {
                needed,
                have: buffer.len(),
            });
        }

        let words = |start: usize, count: usize| -> Vec<u32> {
            (0..count).map(|i| read_le_u32(buffer, start + 4 * i)).collect()
        };
        let data = words(Self::HEADER_SIZE, data_words);
        let metadata = words(Self::HEADER_SIZE + 4 * data_words, metadata_words);

        Ok((
            Self {
                block_type,
                data_size,
                metadata_size,
                data,
                metadata,
            },
            needed,
        ))
    }
}

#[inline]
fn read_le_u32(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

/// Iterator over consecutive blocks in a byte buffer.
///
/// Stops after the first error.
pub struct Blocks<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for Blocks<'_> {
    type Item = Result<DataBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        match DataBlock::parse(&self.buffer[self.offset..]) {
            Ok((block, used)) => {
                self.offset += used;
                Some(Ok(block))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterate the blocks of a U3D file held in memory.
pub fn parse_blocks(buffer: &[u8]) -> Blocks<'_> {
    Blocks {
        buffer,
        offset: 0,
        failed: false,
    }
}
