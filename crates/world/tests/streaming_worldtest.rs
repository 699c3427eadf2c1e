//! Streaming behavior worldtest.
//!
//! Covers residency hysteresis, the one-per-frame work budget, stale queue
//! entries, collaborator bookkeeping across unloads, and a long scripted walk
//! exported as JSONL events plus a metrics report.

use eldergrove_core::{EntityHandle, FrameTick};
use eldergrove_testkit::{
    EventRecord, GenerationMetrics, JsonlSink, MetricsReport, SeamReport, StreamingMetrics,
    TimingStats,
};
use eldergrove_world::{
    BiomeClassifier, BiomeSource, ChunkCoord, ChunkManager, ChunkState, EdgeBlender, EnemyRoster,
    HeadlessUploader, SpawnSystem, SphereCull, StreamingConfig, VegetationManager,
};
use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

const LOAD: i32 = 2;
const UNLOAD: i32 = 3;

fn config() -> StreamingConfig {
    StreamingConfig {
        resolution: 8,
        load_distance: LOAD,
        unload_distance: UNLOAD,
        ..StreamingConfig::default()
    }
}

fn headless() -> ChunkManager<HeadlessUploader> {
    ChunkManager::new(config(), HeadlessUploader::new()).expect("valid config")
}

/// Update until both queues are empty, returning the frames used.
fn settle(manager: &mut ChunkManager<HeadlessUploader>, x: f32, z: f32) -> u64 {
    let mut frames = 0;
    loop {
        manager.update(x, z);
        frames += 1;
        let stats = manager.get_stats();
        if stats.generation_queue_len == 0 && stats.upload_queue_len == 0 {
            return frames;
        }
        assert!(frames < 1_000, "streaming never settled");
    }
}

#[test]
fn crossing_one_chunk_loads_a_column_and_keeps_the_old_one() {
    let mut manager = headless();
    settle(&mut manager, 32.0, 32.0);
    let side = (2 * LOAD + 1) as usize;
    assert_eq!(manager.get_stats().ready_chunks, side * side);

    let report = manager.update(64.0 + 32.0, 32.0);
    assert_eq!(report.player_chunk, ChunkCoord::new(1, 0));
    assert_eq!(report.queued, side);
    assert_eq!(report.unloaded, 0, "hysteresis keeps the trailing column");

    let queued: Vec<ChunkCoord> = std::iter::once(report.generated)
        .flatten()
        .chain(manager.generation_queue())
        .collect();
    assert_eq!(queued.len(), side);
    assert!(queued.iter().all(|coord| coord.x == 1 + LOAD));

    // Trailing column -2 is at distance 3 from chunk 1: still inside UNLOAD.
    assert!(manager.chunk(ChunkCoord::new(-LOAD, 0)).is_some());

    // One more step pushes column -2 past the unload distance.
    let report = manager.update(128.0 + 32.0, 32.0);
    assert_eq!(report.unloaded, side);
    assert!(manager.chunk(ChunkCoord::new(-LOAD, 0)).is_none());
}

#[test]
fn work_is_limited_to_one_chunk_per_frame() {
    let mut manager = headless();
    let side = (2 * LOAD + 1) as u64;
    let total = side * side;

    for frame in 1..=total {
        let report = manager.update(0.0, 0.0);
        assert!(report.generated.is_some());
        assert!(report.uploaded.is_some());
        let stats = manager.get_stats();
        assert_eq!(stats.chunks_generated, frame);
        assert_eq!(stats.ready_chunks as u64, frame);
        assert_eq!(stats.generation_queue_len as u64, total - frame);
    }

    let idle = manager.update(0.0, 0.0);
    assert_eq!(idle.generated, None);
    assert_eq!(idle.uploaded, None);
}

#[test]
fn chunk_walks_the_state_machine() {
    let mut manager = headless();
    let first = manager.update(0.0, 0.0).generated.expect("first chunk");
    assert_eq!(manager.chunk(first).map(|c| c.state()), Some(ChunkState::Ready));

    let waiting = manager.generation_queue().next().expect("backlog");
    assert_eq!(manager.chunk(waiting).map(|c| c.state()), Some(ChunkState::Unloaded));
    assert_eq!(manager.get_height_at(
        waiting.origin(64.0).0 + 1.0,
        waiting.origin(64.0).1 + 1.0,
    ), 0.0);

    settle(&mut manager, 0.0, 0.0);
    assert!(manager.chunks().all(|c| c.state() == ChunkState::Ready));
    assert!(manager.chunks().all(|c| c.gpu_mesh().is_some()));
}

#[test]
fn returning_before_generation_reuses_queued_chunks() {
    let mut manager = headless();
    manager.update(0.0, 0.0);
    // Step across and back before anything drains.
    let away = manager.update(64.0 * 10.0, 0.0);
    assert_eq!(away.unloaded, 25);
    let back = manager.update(0.0, 0.0);
    assert_eq!(back.queued, 25);
    assert_eq!(back.unloaded, 25);

    settle(&mut manager, 0.0, 0.0);
    let stats = manager.get_stats();
    assert_eq!(stats.total_chunks, 25);
    assert_eq!(stats.ready_chunks, 25);
    assert_eq!(manager.uploader().live(), 25);
}

#[test]
fn attached_entities_clear_on_unload() {
    let mut manager = headless();
    settle(&mut manager, 0.0, 0.0);
    let coord = ChunkCoord::new(-LOAD, 0);
    manager
        .chunk_mut(coord)
        .expect("resident")
        .attach_entity(EntityHandle(77));
    assert_eq!(manager.chunk(coord).map(|c| c.entities().len()), Some(1));

    manager.update(64.0 * 2.0, 0.0);
    assert!(manager.chunk(coord).is_none());
}

struct HalfSpace {
    min_x: f32,
}

impl SphereCull for HalfSpace {
    fn sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        center.x + radius >= self.min_x
    }
}

#[test]
fn render_in_frustum_skips_culled_chunks() {
    let mut manager = headless();
    settle(&mut manager, 32.0, 32.0);

    let mut all = 0;
    assert_eq!(manager.render(|_| all += 1), 25);
    assert_eq!(all, 25);

    // Radius is 0.7 * 64 = 44.8, so columns with center x >= 20 pass.
    let mut visible = Vec::new();
    let drawn = manager.render_in_frustum(&HalfSpace { min_x: 64.8 }, |chunk| {
        visible.push(chunk.coord())
    });
    assert_eq!(drawn, visible.len());
    assert_eq!(drawn, 15);
    assert!(visible.iter().all(|coord| coord.x >= 0));
}

#[test]
fn streaming_worldtest() {
    let test_start = Instant::now();
    let log_path = std::env::temp_dir().join("eldergrove_streaming_worldtest.jsonl");
    let mut event_log = JsonlSink::create(&log_path).expect("create event log");

    let seed = config().world_seed;
    let roster = Rc::new(RefCell::new(EnemyRoster::new()));
    let classifier: Rc<dyn BiomeSource> = Rc::new(BiomeClassifier::new(seed));
    let mut manager = ChunkManager::new(
        StreamingConfig {
            nearest_first: true,
            ..config()
        },
        HeadlessUploader::new(),
    )
    .expect("valid config")
    .with_biomes(classifier)
    .with_vegetation(VegetationManager::new(seed))
    .with_spawning(SpawnSystem::new(seed), Rc::clone(&roster));

    println!("\n=== Streaming Worldtest ===");

    let frames: u64 = 400;
    let mut tick = FrameTick::ZERO;
    let mut streaming = StreamingMetrics::default();
    let mut timing = TimingStats::default();
    for _ in 0..frames {
        // Walk diagonally, one chunk every 32 frames.
        let travelled = tick.0 as f32 * 2.0;
        let started = Instant::now();
        let report = manager.update(travelled, travelled * 0.5);
        if report.generated.is_some() {
            timing.record(started.elapsed());
        }
        tick = tick.advance(1);

        if report.queued > 0 || report.unloaded > 0 {
            event_log
                .write(&EventRecord {
                    tick,
                    kind: "player_chunk_changed",
                    payload: &format!(
                        "{{\"x\":{},\"z\":{},\"queued\":{},\"unloaded\":{}}}",
                        report.player_chunk.x,
                        report.player_chunk.z,
                        report.queued,
                        report.unloaded
                    ),
                })
                .expect("write event");
        }
        if let Some(coord) = report.uploaded {
            event_log
                .write(&EventRecord {
                    tick,
                    kind: "chunk_ready",
                    payload: &coord.to_string(),
                })
                .expect("write event");
        }

        let stats = manager.get_stats();
        streaming.observe(stats.total_chunks, stats.generation_queue_len);

        // Residency never exceeds the unload square.
        let side = (2 * UNLOAD + 1) as usize;
        assert!(stats.total_chunks <= side * side);
    }

    // Every enemy the roster holds belongs to a resident chunk.
    let resident_enemies: usize = manager.chunks().map(|c| c.enemies().len()).sum();
    assert_eq!(roster.borrow().len(), resident_enemies);
    assert!(manager.get_stats().chunks_unloaded > 0);

    // Seams between ready neighbors, away from blended corners.
    let res = manager.config().resolution;
    let band = EdgeBlender::blend_width(res);
    let mut seams = SeamReport::new(1e-4);
    for chunk in manager.chunks() {
        let (Some(data), Some(right)) = (
            chunk.data(),
            manager
                .chunk(chunk.coord().offset(1, 0))
                .and_then(|c| c.data()),
        ) else {
            continue;
        };
        let mut worst = 0.0f32;
        for z in band..res - band {
            worst = worst.max((data.heightmap.get(res - 1, z) - right.heightmap.get(0, z)).abs());
        }
        seams.record(worst);
    }
    assert!(seams.checked > 0);
    assert_eq!(seams.failed, 0, "worst seam diff {}", seams.worst);

    let stats = manager.get_stats();
    assert_eq!(streaming.frames, frames);
    assert_eq!(timing.samples(), stats.chunks_generated);
    streaming.chunks_generated = stats.chunks_generated;
    streaming.chunks_uploaded = stats.chunks_uploaded;
    streaming.chunks_unloaded = stats.chunks_unloaded;
    streaming.final_ready = stats.ready_chunks;

    let mut generation = GenerationMetrics::from_timing(&timing, res);
    generation.seams = Some(seams);
    let metrics = MetricsReport::new("streaming_worldtest")
        .with_generation(generation)
        .with_streaming(streaming)
        .finished(test_start.elapsed(), None);

    let metrics_path = std::env::temp_dir().join("eldergrove-metrics/streaming_worldtest.json");
    metrics.write_json(&metrics_path).expect("write metrics");

    manager.release();
    assert!(roster.borrow().is_empty());
    assert_eq!(manager.uploader().live(), 0);
    event_log.flush().expect("flush event log");

    println!("  Frames: {}", frames);
    println!("  Generated: {}", stats.chunks_generated);
    println!("  Unloaded: {}", stats.chunks_unloaded);
    println!("  Events: {}", event_log.written());
}
