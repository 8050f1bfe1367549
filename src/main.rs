//! Headless world driver
//!
//! Walks an observer through the world for a fixed number of ticks, edits a
//! few blocks along the way, renders through a recording renderer and logs
//! streaming statistics. Usage: `voxel-world [config.toml] [ticks]`.

use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use voxel_world::world::{HeadlessAssets, RecordingRenderer};
use voxel_world::{BlockData, BlockId, VoxelPos, World, WorldConfig};

const TICK_SECONDS: f32 = 1.0 / 20.0;
const WALK_SPEED: f32 = 12.0;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => WorldConfig::load(&path).with_context(|| format!("loading config {}", path))?,
        None => WorldConfig::default(),
    };
    let ticks: u32 = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid tick count {}", raw))?,
        None => 400,
    };

    let mut world = World::new(config, Arc::new(HeadlessAssets::new())).context("creating world")?;
    let mut renderer = RecordingRenderer::new();
    let mut observer = Vec3::new(0.5, 100.0, 0.5);

    log::info!("Starting headless run: {} ticks, seed {}", ticks, world.seed());

    for tick in 0..ticks {
        // Walk east, curving slowly north
        let heading = tick as f32 * 0.002;
        observer += Vec3::new(heading.cos(), 0.0, heading.sin()) * WALK_SPEED * TICK_SECONDS;

        let report = world.update(observer, TICK_SECONDS);
        if !report.save_failures.is_empty() {
            log::warn!("Tick {}: {} chunks failed to save", tick, report.save_failures.len());
        }

        if tick % 50 == 0 {
            let feet = VoxelPos::from_world_position(observer);
            let ground = world.generator().surface_height(feet.x, feet.z);
            let marker = VoxelPos::new(feet.x, ground + 1, feet.z);
            if world.place_block(BlockData::new(BlockId::COBBLESTONE), marker) {
                log::info!("Placed marker at {:?}", marker);
            }
        }

        renderer.begin_frame();
        world.render(observer, Mat4::IDENTITY, &mut renderer);
    }

    world.finish_pending().context("waiting for chunk loader")?;
    let failed = world.save_all();
    if !failed.is_empty() {
        log::error!("{} chunks could not be saved", failed.len());
    }

    let stats = world.stats();
    log::info!(
        "Done: {} resident, {} generated, {} loaded, {} evicted, {} saved, {} save failures, {} frames",
        stats.resident_chunks,
        stats.chunks_generated,
        stats.chunks_loaded,
        stats.chunks_evicted,
        stats.chunks_saved,
        stats.save_failures,
        renderer.frames
    );
    Ok(())
}
