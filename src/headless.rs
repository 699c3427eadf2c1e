//! Headless streaming driver: walks a scripted path and streams terrain
//! around it without a window or GPU.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use eldergrove_core::FrameTick;
use eldergrove_render::Camera;
use eldergrove_testkit::{
    EventRecord, GenerationMetrics, JsonlSink, MeshMetrics, MetricsReport, StreamingMetrics,
    TimingStats,
};
use eldergrove_world::{
    BiomeClassifier, BiomeSource, ChunkManager, EnemyRoster, FrameReport, HeadlessUploader,
    SpawnSystem, StreamStats, VegetationManager,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;
use tracing::info;

/// Everything one headless run needs.
pub struct HeadlessConfig {
    pub app: AppConfig,
    /// JSONL event log destination.
    pub events: Option<PathBuf>,
    /// Metrics report destination.
    pub metrics: Option<PathBuf>,
}

/// Outcome of a headless run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub stats: StreamStats,
    pub peak_resident: usize,
    pub peak_generation_queue: usize,
    /// Chunks inside the camera frustum on the last frame.
    pub visible_chunks: usize,
    /// Enemies alive when the walk ended, before release.
    pub enemies: usize,
    pub vegetation_instances: usize,
    pub events_written: usize,
}

/// Player position after walking `distance` units around the circle.
///
/// Returns `(x, z, heading)` with the heading tangent to the path.
pub fn walk_position(radius: f32, distance: f32) -> (f32, f32, f32) {
    let angle = distance / radius;
    let (sin, cos) = angle.sin_cos();
    (radius * cos, radius * sin, angle + std::f32::consts::FRAC_PI_2)
}

/// Walk the configured path and stream terrain around it.
pub fn run(config: HeadlessConfig) -> Result<RunSummary> {
    let started = Instant::now();
    let app = config.app;
    let seed = app.streaming.world_seed;

    let roster = Rc::new(RefCell::new(EnemyRoster::new()));
    let vegetation = Rc::new(RefCell::new(VegetationManager::new(seed)));
    let biomes: Rc<dyn BiomeSource> = Rc::new(BiomeClassifier::from_config(&app.streaming));
    let mut manager = ChunkManager::new(app.streaming.clone(), HeadlessUploader::new())
        .context("invalid streaming configuration")?
        .with_biomes(biomes)
        .with_vegetation(Rc::clone(&vegetation))
        .with_spawning(SpawnSystem::new(seed), Rc::clone(&roster));

    let mut events = match &config.events {
        Some(path) => Some(
            JsonlSink::create(path)
                .with_context(|| format!("failed to create event log {}", path.display()))?,
        ),
        None => None,
    };

    info!(
        frames = app.frames,
        seed,
        radius = app.path_radius,
        resolution = app.streaming.resolution,
        "Starting headless streaming run"
    );

    let mut camera = Camera::new(16.0 / 9.0);
    let mut tick = FrameTick::ZERO;
    let mut visible_chunks = 0;
    let mut streaming = StreamingMetrics::default();
    let mut timing = TimingStats::default();
    let mut meshing = MeshMetrics::default();

    for _ in 0..app.frames {
        let (x, z, heading) = walk_position(app.path_radius, tick.0 as f32 * app.player_speed);
        let frame_start = Instant::now();
        let report = manager.update(x, z);
        if report.generated.is_some() {
            timing.record(frame_start.elapsed());
        }
        tick = tick.advance(1);

        if let Some(sink) = events.as_mut() {
            record_frame(sink, tick, &report)?;
        }
        if let Some(coord) = report.uploaded {
            if let Some(mesh) = manager.chunk(coord).and_then(|c| c.data()).map(|d| &d.mesh) {
                meshing.add(mesh.vertex_count(), mesh.triangle_count(), mesh.byte_size());
            }
        }

        camera.yaw = heading;
        camera.place_on_terrain(x, z, &manager, app.eye_height);
        visible_chunks = manager.render_in_frustum(&camera.frustum(), |_| {});

        let stats = manager.get_stats();
        streaming.observe(stats.total_chunks, stats.generation_queue_len);

        if app.stats_interval > 0 && tick.0 % app.stats_interval == 0 {
            info!(
                tick = tick.0,
                ready = stats.ready_chunks,
                resident = stats.total_chunks,
                generation_queue = stats.generation_queue_len,
                upload_queue = stats.upload_queue_len,
                visible = visible_chunks,
                biome = %manager.get_biome_at(x, z),
                "Streaming stats"
            );
        }
    }

    let stats = manager.get_stats();
    let enemies = roster.borrow().len();
    let vegetation_instances = vegetation.borrow().total_instances();
    manager.release();

    let events_written = match events.as_mut() {
        Some(sink) => {
            sink.flush()?;
            sink.written()
        }
        None => 0,
    };

    streaming.chunks_generated = stats.chunks_generated;
    streaming.chunks_uploaded = stats.chunks_uploaded;
    streaming.chunks_unloaded = stats.chunks_unloaded;
    streaming.final_ready = stats.ready_chunks;

    let summary = RunSummary {
        frames: app.frames,
        stats,
        peak_resident: streaming.peak_resident,
        peak_generation_queue: streaming.peak_generation_queue,
        visible_chunks,
        enemies,
        vegetation_instances,
        events_written,
    };

    if let Some(path) = &config.metrics {
        MetricsReport::new("headless_streaming_run")
            .with_generation(GenerationMetrics::from_timing(&timing, app.streaming.resolution))
            .with_streaming(streaming)
            .with_meshing(meshing)
            .finished(started.elapsed(), None)
            .write_json(path)?;
        info!(path = %path.display(), "Wrote metrics report");
    }

    info!(
        frames = summary.frames,
        generated = summary.stats.chunks_generated,
        unloaded = summary.stats.chunks_unloaded,
        enemies = summary.enemies,
        vegetation = summary.vegetation_instances,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Headless run finished"
    );
    Ok(summary)
}

fn record_frame(sink: &mut JsonlSink, tick: FrameTick, report: &FrameReport) -> Result<()> {
    if report.queued > 0 || report.unloaded > 0 {
        sink.write(&EventRecord {
            tick,
            kind: "player_chunk_changed",
            payload: &format!(
                "{{\"x\":{},\"z\":{},\"queued\":{},\"unloaded\":{}}}",
                report.player_chunk.x, report.player_chunk.z, report.queued, report.unloaded
            ),
        })?;
    }
    if let Some(coord) = report.generated {
        sink.write(&EventRecord {
            tick,
            kind: "chunk_generated",
            payload: &coord.to_string(),
        })?;
    }
    if let Some(coord) = report.uploaded {
        sink.write(&EventRecord {
            tick,
            kind: "chunk_ready",
            payload: &coord.to_string(),
        })?;
    }
    Ok(())
}
