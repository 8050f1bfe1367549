use serde::{Deserialize, Serialize};

use crate::constants::core::{BLOCKS_PER_CHUNK, CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::persistence::{corrupted_data, version_mismatch, PersistenceError, PersistenceResult};
use crate::world::core::{BlockData, ChunkPos};
use crate::world::storage::{BlockStore, Chunk};

/// Version of the chunk format
pub const CHUNK_FORMAT_VERSION: u32 = 1;

/// Magic bytes to identify chunk files
const CHUNK_MAGIC: &[u8; 4] = b"VXCK";

/// Encoded size of [`ChunkHeader`] (bincode fixed-width integers)
const HEADER_SIZE: usize = 4 + 4 + 1 + 4 * 6;

/// Bytes per encoded block
const BLOCK_SIZE: usize = std::mem::size_of::<BlockData>();

/// Chunk serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFormat {
    /// Flat block array
    Raw,
    /// Run-length encoded, for chunks made of long uniform spans
    RLE,
    /// Palette plus one byte per block, for chunks with few block types
    Palette,
}

impl ChunkFormat {
    fn tag(self) -> u8 {
        match self {
            ChunkFormat::Raw => 0,
            ChunkFormat::RLE => 1,
            ChunkFormat::Palette => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChunkFormat::Raw),
            1 => Some(ChunkFormat::RLE),
            2 => Some(ChunkFormat::Palette),
            _ => None,
        }
    }
}

/// Header for serialized chunks
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ChunkHeader {
    magic: [u8; 4],
    version: u32,
    format: u8,
    x: i32,
    z: i32,
    width: u32,
    height: u32,
    block_count: u32,
    checksum: u32,
}

/// Serializes and deserializes chunks.
///
/// Layout: a fixed header (magic, version, payload format, chunk origin,
/// dimensions, block count, CRC32 of the payload) followed by the payload.
/// Blocks are written in the store's layer-major order using their in-memory
/// byte layout. Only block content is persisted; the render and edit flags
/// are not, and a decoded chunk always comes back dirty and unmodified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkSerializer {
    /// Fixed payload format; `None` picks the smallest per chunk
    format: Option<ChunkFormat>,
}

impl ChunkSerializer {
    pub fn new(format: ChunkFormat) -> Self {
        Self {
            format: Some(format),
        }
    }

    /// Serializer that chooses the payload format per chunk
    pub fn adaptive() -> Self {
        Self { format: None }
    }

    /// Serialize a chunk to bytes
    pub fn serialize(&self, chunk: &Chunk) -> PersistenceResult<Vec<u8>> {
        let blocks = chunk.blocks().as_slice();
        let format = self.format.unwrap_or_else(|| Self::analyze_chunk(chunk));

        let (format, payload) = match format {
            ChunkFormat::Raw => (ChunkFormat::Raw, encode_raw(blocks)),
            ChunkFormat::RLE => (ChunkFormat::RLE, encode_rle(blocks)),
            ChunkFormat::Palette => match encode_palette(blocks) {
                Some(payload) => (ChunkFormat::Palette, payload),
                None => {
                    log::debug!(
                        "[ChunkSerializer] Chunk {} has too many block types for a palette, writing raw",
                        chunk.position()
                    );
                    (ChunkFormat::Raw, encode_raw(blocks))
                }
            },
        };

        write_frame(format, chunk.position(), &payload)
    }

    /// Deserialize a chunk from bytes
    pub fn deserialize(&self, data: &[u8]) -> PersistenceResult<Chunk> {
        if data.len() < HEADER_SIZE {
            return Err(corrupted_data(format!(
                "Data too small to contain valid chunk header ({} bytes)",
                data.len()
            )));
        }

        let header: ChunkHeader = bincode::deserialize(&data[..HEADER_SIZE])?;

        if header.magic != *CHUNK_MAGIC {
            return Err(corrupted_data("Invalid chunk magic"));
        }
        if header.version != CHUNK_FORMAT_VERSION {
            return Err(version_mismatch(CHUNK_FORMAT_VERSION, header.version));
        }
        if header.width != CHUNK_WIDTH as u32 || header.height != CHUNK_HEIGHT as u32 {
            return Err(corrupted_data(format!(
                "Invalid chunk dimensions {}x{}",
                header.width, header.height
            )));
        }
        if header.block_count as usize != BLOCKS_PER_CHUNK {
            return Err(corrupted_data(format!(
                "Invalid block count: {} (expected {})",
                header.block_count, BLOCKS_PER_CHUNK
            )));
        }

        let position = ChunkPos::containing(header.x, header.z);
        if position.x() != header.x || position.z() != header.z {
            return Err(corrupted_data(format!(
                "Chunk origin ({}, {}) is not grid aligned",
                header.x, header.z
            )));
        }

        let payload = &data[HEADER_SIZE..];
        if calculate_checksum(payload) != header.checksum {
            return Err(corrupted_data("Checksum mismatch"));
        }

        let format = ChunkFormat::from_tag(header.format).ok_or_else(|| {
            PersistenceError::DeserializationError(format!("Unknown chunk format {}", header.format))
        })?;
        let blocks = match format {
            ChunkFormat::Raw => decode_raw(payload)?,
            ChunkFormat::RLE => decode_rle(payload)?,
            ChunkFormat::Palette => decode_palette(payload)?,
        };

        let store = BlockStore::from_vec(blocks)
            .ok_or_else(|| corrupted_data("Decoded block array has the wrong length"))?;
        Ok(Chunk::from_store(position, store))
    }

    /// Pick the format with the smallest payload for this chunk
    pub fn analyze_chunk(chunk: &Chunk) -> ChunkFormat {
        let blocks = chunk.blocks().as_slice();
        let mut unique: Vec<BlockData> = Vec::new();
        let mut runs = 0usize;
        let mut last = None;

        for &block in blocks {
            if last != Some(block) {
                runs += 1;
                last = Some(block);
            }
            if unique.len() <= 256 && !unique.contains(&block) {
                unique.push(block);
            }
        }

        let raw_size = BLOCK_SIZE * blocks.len();
        let rle_size = 4 + (BLOCK_SIZE + 4) * runs;
        let palette_size = if unique.len() <= 256 {
            2 + BLOCK_SIZE * unique.len() + blocks.len()
        } else {
            usize::MAX
        };

        if rle_size <= palette_size && rle_size <= raw_size {
            ChunkFormat::RLE
        } else if palette_size <= raw_size {
            ChunkFormat::Palette
        } else {
            ChunkFormat::Raw
        }
    }
}

fn write_frame(format: ChunkFormat, position: ChunkPos, payload: &[u8]) -> PersistenceResult<Vec<u8>> {
    let header = ChunkHeader {
        magic: *CHUNK_MAGIC,
        version: CHUNK_FORMAT_VERSION,
        format: format.tag(),
        x: position.x(),
        z: position.z(),
        width: CHUNK_WIDTH as u32,
        height: CHUNK_HEIGHT as u32,
        block_count: BLOCKS_PER_CHUNK as u32,
        checksum: calculate_checksum(payload),
    };

    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
    bincode::serialize_into(&mut buffer, &header)?;
    debug_assert_eq!(buffer.len(), HEADER_SIZE);
    buffer.extend_from_slice(payload);
    Ok(buffer)
}

/// Calculate CRC32 checksum
fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn read_block(bytes: &[u8]) -> BlockData {
    bytemuck::pod_read_unaligned(bytes)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

fn encode_raw(blocks: &[BlockData]) -> Vec<u8> {
    bytemuck::cast_slice(blocks).to_vec()
}

fn decode_raw(payload: &[u8]) -> PersistenceResult<Vec<BlockData>> {
    if payload.len() != BLOCKS_PER_CHUNK * BLOCK_SIZE {
        return Err(corrupted_data(format!(
            "Raw payload is {} bytes, expected {}",
            payload.len(),
            BLOCKS_PER_CHUNK * BLOCK_SIZE
        )));
    }
    Ok(payload.chunks_exact(BLOCK_SIZE).map(read_block).collect())
}

/// `[run count: u32]` then `[block][length: u32]` per run
fn encode_rle(blocks: &[BlockData]) -> Vec<u8> {
    let mut runs: Vec<(BlockData, u32)> = Vec::new();
    for &block in blocks {
        match runs.last_mut() {
            Some((current, length)) if *current == block => *length += 1,
            _ => runs.push((block, 1)),
        }
    }

    let mut out = Vec::with_capacity(4 + runs.len() * (BLOCK_SIZE + 4));
    out.extend_from_slice(&(runs.len() as u32).to_le_bytes());
    for (block, length) in runs {
        out.extend_from_slice(bytemuck::bytes_of(&block));
        out.extend_from_slice(&length.to_le_bytes());
    }
    out
}

fn decode_rle(payload: &[u8]) -> PersistenceResult<Vec<BlockData>> {
    if payload.len() < 4 {
        return Err(corrupted_data("RLE payload missing run count"));
    }
    let run_count = read_u32(&payload[..4]) as usize;
    let entry = BLOCK_SIZE + 4;
    if payload.len() != 4 + run_count * entry {
        return Err(corrupted_data(format!(
            "RLE payload length {} does not match {} runs",
            payload.len(),
            run_count
        )));
    }

    let mut blocks = Vec::with_capacity(BLOCKS_PER_CHUNK);
    for run in payload[4..].chunks_exact(entry) {
        let block = read_block(&run[..BLOCK_SIZE]);
        let length = read_u32(&run[BLOCK_SIZE..]) as usize;
        if length == 0 || blocks.len() + length > BLOCKS_PER_CHUNK {
            return Err(corrupted_data("RLE run overflows the chunk"));
        }
        blocks.extend(std::iter::repeat(block).take(length));
    }

    if blocks.len() != BLOCKS_PER_CHUNK {
        return Err(corrupted_data(format!(
            "RLE runs cover {} blocks, expected {}",
            blocks.len(),
            BLOCKS_PER_CHUNK
        )));
    }
    Ok(blocks)
}

/// `[palette length: u16][entries][one index byte per block]`; `None` when
/// more than 256 distinct blocks are present
fn encode_palette(blocks: &[BlockData]) -> Option<Vec<u8>> {
    let mut palette: Vec<BlockData> = Vec::new();
    let mut indices = Vec::with_capacity(blocks.len());
    for &block in blocks {
        let index = match palette.iter().position(|&entry| entry == block) {
            Some(index) => index,
            None => {
                if palette.len() == 256 {
                    return None;
                }
                palette.push(block);
                palette.len() - 1
            }
        };
        indices.push(index as u8);
    }

    let mut out = Vec::with_capacity(2 + palette.len() * BLOCK_SIZE + indices.len());
    out.extend_from_slice(&(palette.len() as u16).to_le_bytes());
    for entry in &palette {
        out.extend_from_slice(bytemuck::bytes_of(entry));
    }
    out.extend_from_slice(&indices);
    Some(out)
}

fn decode_palette(payload: &[u8]) -> PersistenceResult<Vec<BlockData>> {
    if payload.len() < 2 {
        return Err(corrupted_data("Palette payload missing length"));
    }
    let palette_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    if palette_len == 0 || palette_len > 256 {
        return Err(corrupted_data(format!("Invalid palette length {}", palette_len)));
    }

    let indices_start = 2 + palette_len * BLOCK_SIZE;
    if payload.len() != indices_start + BLOCKS_PER_CHUNK {
        return Err(corrupted_data(format!(
            "Palette payload is {} bytes, expected {}",
            payload.len(),
            indices_start + BLOCKS_PER_CHUNK
        )));
    }

    let palette: Vec<BlockData> = payload[2..indices_start]
        .chunks_exact(BLOCK_SIZE)
        .map(read_block)
        .collect();

    payload[indices_start..]
        .iter()
        .map(|&index| {
            palette
                .get(index as usize)
                .copied()
                .ok_or_else(|| corrupted_data(format!("Palette index {} out of range", index)))
        })
        .collect()
}
