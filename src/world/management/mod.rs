//! World orchestration: the streaming policy, the background loader and the
//! `World` that ties generation, persistence and mutation together.

pub mod loader;
pub mod streaming;
mod world;

pub use loader::{ChunkLoader, ChunkSource, Completion, LoaderError};
pub use streaming::StreamingPolicy;
pub use world::{TickReport, World, WorldError, WorldStats};

#[cfg(test)]
mod tests;
