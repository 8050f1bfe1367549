//! Background chunk production.
//!
//! The tick thread owns the in-flight table and the receiving end of the
//! completion channel; workers only ever see their own request. A coordinate
//! has at most one task at a time: a request that was superseded (the tick
//! thread produced the chunk itself in the meantime) keeps its slot until
//! the stale result comes back and is thrown away.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::FxHashMap;

use crate::persistence::{ChunkPersistence, ChunkSerializer};
use crate::world::core::ChunkPos;
use crate::world::generation::WorldGenerator;
use crate::world::storage::Chunk;

/// Where a produced chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSource {
    Generated,
    Loaded,
}

/// A chunk produced by a worker
#[derive(Debug)]
pub struct Completion {
    pub position: ChunkPos,
    pub chunk: Chunk,
    pub source: ChunkSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Pending,
    Superseded,
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Failed to build loader thread pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("Loader workers disconnected with {0} requests in flight")]
    Disconnected(usize),
}

/// Load a chunk from storage, or generate it when storage has nothing usable.
///
/// Storage errors and undecodable data count as a miss.
pub fn load_or_generate(
    position: ChunkPos,
    generator: &dyn WorldGenerator,
    persistence: &dyn ChunkPersistence,
    serializer: &ChunkSerializer,
) -> (Chunk, ChunkSource) {
    match persistence.load(position) {
        Ok(Some(data)) => match serializer.deserialize(&data) {
            Ok(chunk) if chunk.position() == position => {
                return (chunk, ChunkSource::Loaded);
            }
            Ok(chunk) => {
                log::warn!(
                    "[ChunkLoader] Stored data for {} describes chunk {}, regenerating",
                    position,
                    chunk.position()
                );
            }
            Err(e) => {
                log::warn!("[ChunkLoader] Stored chunk {} is unreadable ({}), regenerating", position, e);
            }
        },
        Ok(None) => {
            log::trace!("[ChunkLoader] No saved data for {}", position);
        }
        Err(e) => {
            log::warn!("[ChunkLoader] Failed to load chunk {} ({}), regenerating", position, e);
        }
    }

    (generator.populate(position), ChunkSource::Generated)
}

pub struct ChunkLoader {
    pool: ThreadPool,
    generator: Arc<dyn WorldGenerator>,
    persistence: Arc<dyn ChunkPersistence>,
    serializer: ChunkSerializer,
    in_flight: FxHashMap<ChunkPos, InFlight>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl ChunkLoader {
    pub fn new(
        generator: Arc<dyn WorldGenerator>,
        persistence: Arc<dyn ChunkPersistence>,
        serializer: ChunkSerializer,
        worker_threads: usize,
        queue_capacity: usize,
    ) -> Result<Self, LoaderError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads.max(1))
            .thread_name(|i| format!("chunk-loader-{}", i))
            .build()?;
        // Bounded so workers block instead of piling up finished chunks
        let (sender, receiver) = bounded(queue_capacity.max(1));

        log::info!(
            "[ChunkLoader] Started {} workers (completion queue {})",
            pool.current_num_threads(),
            queue_capacity.max(1)
        );

        Ok(Self {
            pool,
            generator,
            persistence,
            serializer,
            in_flight: FxHashMap::default(),
            sender,
            receiver,
        })
    }

    /// Queue a chunk. Returns `false` if the coordinate already has a task.
    pub fn request(&mut self, position: ChunkPos) -> bool {
        if self.in_flight.contains_key(&position) {
            return false;
        }
        self.in_flight.insert(position, InFlight::Pending);

        let generator = Arc::clone(&self.generator);
        let persistence = Arc::clone(&self.persistence);
        let serializer = self.serializer;
        let sender = self.sender.clone();

        self.pool.spawn(move || {
            let (chunk, source) =
                load_or_generate(position, generator.as_ref(), persistence.as_ref(), &serializer);
            if sender
                .send(Completion {
                    position,
                    chunk,
                    source,
                })
                .is_err()
            {
                log::trace!("[ChunkLoader] Dropped chunk {} after shutdown", position);
            }
        });
        true
    }

    /// Waiting on the result of a live (not superseded) request
    pub fn is_pending(&self, position: ChunkPos) -> bool {
        self.in_flight.get(&position) == Some(&InFlight::Pending)
    }

    /// Mark a request as superseded; its result will be discarded
    pub fn cancel(&mut self, position: ChunkPos) {
        if let Some(state) = self.in_flight.get_mut(&position) {
            *state = InFlight::Superseded;
        }
    }

    /// Tasks not yet returned, superseded ones included
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Positions of live requests
    pub fn pending(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.in_flight
            .iter()
            .filter(|(_, state)| **state == InFlight::Pending)
            .map(|(pos, _)| *pos)
    }

    /// Collect finished chunks without blocking
    pub fn drain(&mut self) -> Vec<Completion> {
        let finished: Vec<Completion> = self.receiver.try_iter().collect();
        finished
            .into_iter()
            .filter_map(|completion| self.settle(completion))
            .collect()
    }

    /// Block until every task has returned
    pub fn wait_all(&mut self) -> Result<Vec<Completion>, LoaderError> {
        let mut accepted = Vec::new();
        while !self.in_flight.is_empty() {
            let completion = self
                .receiver
                .recv()
                .map_err(|_| LoaderError::Disconnected(self.in_flight.len()))?;
            accepted.extend(self.settle(completion));
        }
        Ok(accepted)
    }

    fn settle(&mut self, completion: Completion) -> Option<Completion> {
        match self.in_flight.remove(&completion.position) {
            Some(InFlight::Pending) => Some(completion),
            Some(InFlight::Superseded) => {
                log::trace!(
                    "[ChunkLoader] Discarding superseded chunk {}",
                    completion.position
                );
                None
            }
            None => {
                log::warn!(
                    "[ChunkLoader] Received untracked chunk {}",
                    completion.position
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for ChunkLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkLoader")
            .field("workers", &self.pool.current_num_threads())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
