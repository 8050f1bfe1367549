use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression as FlateCompression;
use serde::{Deserialize, Serialize};

use crate::persistence::{PersistenceError, PersistenceResult};

/// Whole-file compression applied by disk stores on top of the chunk format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// Bytes are written as produced by the serializer
    None,
    /// Zlib stream (small header, fast)
    #[default]
    Zlib,
    /// Gzip stream
    Gzip,
}

/// Handles compression and decompression of data
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    compression_type: CompressionType,
}

impl Compressor {
    pub fn new(compression_type: CompressionType) -> Self {
        Self { compression_type }
    }

    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }

    pub fn compress(&self, data: &[u8]) -> PersistenceResult<Vec<u8>> {
        match self.compression_type {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), FlateCompression::default());
                encoder.write_all(data).map_err(compression_error)?;
                encoder.finish().map_err(compression_error)
            }
            CompressionType::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), FlateCompression::default());
                encoder.write_all(data).map_err(compression_error)?;
                encoder.finish().map_err(compression_error)
            }
        }
    }

    pub fn decompress(&self, data: &[u8]) -> PersistenceResult<Vec<u8>> {
        let mut out = Vec::new();
        match self.compression_type {
            CompressionType::None => return Ok(data.to_vec()),
            CompressionType::Zlib => {
                ZlibDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(compression_error)?;
            }
            CompressionType::Gzip => {
                GzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(compression_error)?;
            }
        }
        Ok(out)
    }
}

fn compression_error(err: std::io::Error) -> PersistenceError {
    PersistenceError::CompressionError(err.to_string())
}
