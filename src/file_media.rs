//! FileMedia - byte sources holding a U3D file.

use crate::block::{parse_blocks, DataBlock};
use crate::error::Result;

/// Local U3D file.
#[derive(Debug, Clone)]
pub struct LocalFileMedia {
    path: String,
    name: String,
    length: u64,
}

impl LocalFileMedia {
    pub fn new(path: &str) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            path: path.to_string(),
            name,
            length: metadata.len(),
        })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sync read of every block in the file.
    pub fn read_blocks(&self) -> Result<Vec<DataBlock>> {
        let bytes = std::fs::read(&self.path)?;
        let blocks = parse_blocks(&bytes).collect::<Result<Vec<_>>>()?;
        tracing::debug!(file = %self.name, blocks = blocks.len(), "loaded U3D blocks");
        Ok(blocks)
    }
}

/// Write blocks back to back into `path`, returning the bytes written.
pub fn write_blocks(path: &str, blocks: &[DataBlock]) -> Result<usize> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut written = 0;
    for block in blocks {
        written += block.write_to(&mut file)?;
    }
    std::io::Write::flush(&mut file)?;
    Ok(written)
}

// Async FileMedia trait (requires 'async' feature)
#[cfg(feature = "async")]
use std::future::Future;
#[cfg(feature = "async")]
use std::pin::Pin;

/// Abstract source of a whole U3D file, read asynchronously.
///
/// Implement this trait for custom byte sources (e.g., HTTP downloads).
/// The library provides [`LocalFileMedia`] for local files.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub trait FileMedia: Send + Sync {
    fn length(&self) -> u64;
    fn name(&self) -> &str;
    fn read_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>>;
}

#[cfg(feature = "async")]
impl FileMedia for LocalFileMedia {
    fn length(&self) -> u64 {
        self.length
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>> {
        let path = self.path.clone();
        Box::pin(async move {
            use tokio::io::AsyncReadExt;
            let mut file = tokio::fs::File::open(&path).await?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer).await?;
            Ok(buffer)
        })
    }
}

/// Read and split every block of `media`.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn read_blocks_async(media: &dyn FileMedia) -> Result<Vec<DataBlock>> {
    let bytes = media.read_all().await?;
    let blocks = parse_blocks(&bytes).collect::<Result<Vec<_>>>()?;
    tracing::debug!(file = media.name(), blocks = blocks.len(), "loaded U3D blocks");
    Ok(blocks)
}
