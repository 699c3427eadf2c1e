//! Metrics reports exported by worldtests and headless runs.
//!
//! Each run writes one [`MetricsReport`] as pretty JSON so CI can track
//! generation cost, seam quality and streaming behavior across commits.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable read for the commit a report belongs to.
pub const COMMIT_ENV: &str = "ELDERGROVE_COMMIT";

/// One run's metrics; absent sections are omitted from the JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Run identifier, usually the test name.
    pub name: String,
    /// RFC 3339 time the report was started.
    pub timestamp: String,
    /// Commit under test, from [`COMMIT_ENV`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Whether every check passed.
    pub outcome: Outcome,
    /// Heightmap and mesh generation cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationMetrics>,
    /// Residency and queue behavior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<StreamingMetrics>,
    /// Mesh sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meshing: Option<MeshMetrics>,
    /// Wall time of the whole run.
    pub elapsed_seconds: f64,
    /// Assertions evaluated, when the run counts them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<usize>,
}

/// Pass/fail status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every check held.
    Pass,
    /// At least one check failed.
    Fail,
}

impl Outcome {
    /// `Pass` when no failures were counted.
    pub fn from_failures(failures: usize) -> Self {
        if failures == 0 {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }
}

impl MetricsReport {
    /// Start a passing report stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            commit: std::env::var(COMMIT_ENV).ok().filter(|c| !c.is_empty()),
            outcome: Outcome::Pass,
            generation: None,
            streaming: None,
            meshing: None,
            elapsed_seconds: 0.0,
            checks: None,
        }
    }

    /// Set the outcome.
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Attach generation metrics; failed seams turn the outcome to `Fail`.
    pub fn with_generation(mut self, generation: GenerationMetrics) -> Self {
        if generation.seams.as_ref().is_some_and(|s| s.failed > 0) {
            self.outcome = Outcome::Fail;
        }
        self.generation = Some(generation);
        self
    }

    /// Attach streaming metrics.
    pub fn with_streaming(mut self, streaming: StreamingMetrics) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Attach mesh metrics.
    pub fn with_meshing(mut self, meshing: MeshMetrics) -> Self {
        self.meshing = Some(meshing);
        self
    }

    /// Record wall time and, optionally, how many checks ran.
    pub fn finished(mut self, elapsed: Duration, checks: Option<usize>) -> Self {
        self.elapsed_seconds = elapsed.as_secs_f64();
        self.checks = checks;
        self
    }

    /// Write pretty JSON to `path`, creating parent directories.
    ///
    /// The report lands in a sibling temp file first and is renamed into
    /// place, so readers never see a partial report.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let staging = path.with_extension("json.partial");
        fs::write(&staging, json)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("failed to move report into {}", path.display()))?;
        Ok(())
    }
}

/// Running min/mean/max over per-chunk generation times.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    samples: u64,
    total_us: u128,
    min_us: Option<u128>,
    max_us: u128,
}

impl TimingStats {
    /// Add one measured duration.
    pub fn record(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros();
        self.samples += 1;
        self.total_us += us;
        self.min_us = Some(self.min_us.map_or(us, |m| m.min(us)));
        self.max_us = self.max_us.max(us);
    }

    /// Durations recorded.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Mean in microseconds; zero with no samples.
    pub fn mean_us(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_us as f64 / self.samples as f64
        }
    }

    /// Samples per second of recorded time.
    pub fn per_second(&self) -> f64 {
        if self.total_us == 0 {
            0.0
        } else {
            self.samples as f64 * 1_000_000.0 / self.total_us as f64
        }
    }
}

/// Heightmap generation cost and quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetrics {
    /// Chunks measured.
    pub chunks: u64,
    /// Vertices per chunk edge.
    pub resolution: usize,
    /// Mean generation time (microseconds).
    pub mean_us: f64,
    /// Fastest chunk (microseconds).
    pub min_us: u128,
    /// Slowest chunk (microseconds).
    pub max_us: u128,
    /// Throughput over measured time only.
    pub chunks_per_second: f64,
    /// Distinct biomes seen across all chunks.
    pub distinct_biomes: usize,
    /// Lowest and highest final height.
    pub height_range: (f32, f32),
    /// Border agreement between neighboring chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seams: Option<SeamReport>,
}

impl GenerationMetrics {
    /// Fill timing fields from `timing`; the rest start empty.
    pub fn from_timing(timing: &TimingStats, resolution: usize) -> Self {
        Self {
            chunks: timing.samples,
            resolution,
            mean_us: timing.mean_us(),
            min_us: timing.min_us.unwrap_or(0),
            max_us: timing.max_us,
            chunks_per_second: timing.per_second(),
            distinct_biomes: 0,
            height_range: (0.0, 0.0),
            seams: None,
        }
    }
}

/// Accumulated height mismatch along shared chunk borders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeamReport {
    /// Borders compared.
    pub checked: usize,
    /// Borders within tolerance.
    pub passed: usize,
    /// Borders outside tolerance.
    pub failed: usize,
    /// Largest mismatch seen.
    pub worst: f32,
    /// Mean of per-border worst mismatches.
    pub mean: f64,
    /// Largest mismatch a border may have and still pass.
    pub tolerance: f32,
    #[serde(skip)]
    sum: f64,
}

impl SeamReport {
    /// Empty report judging borders against `tolerance`.
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Record one border's worst mismatch; returns whether it passed.
    pub fn record(&mut self, diff: f32) -> bool {
        let ok = diff <= self.tolerance;
        self.checked += 1;
        if ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.worst = self.worst.max(diff);
        self.sum += diff as f64;
        self.mean = self.sum / self.checked as f64;
        ok
    }
}

/// Chunk streaming behavior over a scripted walk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingMetrics {
    /// Frames simulated.
    pub frames: u64,
    /// Chunks that ran the generation pipeline.
    pub chunks_generated: u64,
    /// Meshes uploaded.
    pub chunks_uploaded: u64,
    /// Chunks destroyed.
    pub chunks_unloaded: u64,
    /// Most chunks resident at once.
    pub peak_resident: usize,
    /// Longest generation backlog observed.
    pub peak_generation_queue: usize,
    /// Ready chunks when the walk ended.
    pub final_ready: usize,
}

impl StreamingMetrics {
    /// Fold one frame's residency and backlog into the peaks.
    pub fn observe(&mut self, resident: usize, generation_queue: usize) {
        self.frames += 1;
        self.peak_resident = self.peak_resident.max(resident);
        self.peak_generation_queue = self.peak_generation_queue.max(generation_queue);
    }
}

/// Mesh size totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshMetrics {
    /// Meshes measured.
    pub meshes: usize,
    /// Vertices, including skirts.
    pub total_vertices: usize,
    /// Triangles, including skirts.
    pub total_triangles: usize,
    /// Bytes of vertex and index data.
    pub total_bytes: usize,
}

impl MeshMetrics {
    /// Count one mesh.
    pub fn add(&mut self, vertices: usize, triangles: usize, bytes: usize) {
        self.meshes += 1;
        self.total_vertices += vertices;
        self.total_triangles += triangles;
        self.total_bytes += bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_tracks_extremes_and_mean() {
        let mut timing = TimingStats::default();
        assert_eq!(timing.mean_us(), 0.0);
        for us in [300, 100, 200] {
            timing.record(Duration::from_micros(us));
        }
        let generation = GenerationMetrics::from_timing(&timing, 32);
        assert_eq!(generation.chunks, 3);
        assert_eq!((generation.min_us, generation.max_us), (100, 300));
        assert_eq!(generation.mean_us, 200.0);
        assert_eq!(generation.chunks_per_second, 5000.0);
    }

    #[test]
    fn seam_failures_fail_the_report() {
        let mut seams = SeamReport::new(1e-4);
        assert!(seams.record(0.0));
        assert!(!seams.record(0.5));
        assert_eq!((seams.checked, seams.passed, seams.failed), (2, 1, 1));
        assert_eq!(seams.worst, 0.5);
        assert_eq!(seams.mean, 0.25);

        let mut generation = GenerationMetrics::from_timing(&TimingStats::default(), 8);
        generation.seams = Some(seams);
        let report = MetricsReport::new("seams").with_generation(generation);
        assert_eq!(report.outcome, Outcome::Fail);
    }

    #[test]
    fn optional_sections_are_omitted() {
        let mut streaming = StreamingMetrics::default();
        streaming.observe(9, 8);
        streaming.observe(12, 3);
        let report = MetricsReport::new("streaming_only")
            .with_outcome(Outcome::from_failures(1))
            .with_streaming(streaming);

        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"outcome\":\"fail\""));
        assert!(json.contains("\"peak_resident\":12"));
        assert!(json.contains("\"peak_generation_queue\":8"));
        assert!(!json.contains("generation\""));
        assert!(!json.contains("meshing"));
        assert!(!json.contains("checks"));
    }

    #[test]
    fn report_is_written_whole() {
        let dir = std::env::temp_dir().join(format!("eldergrove-metrics-{}", std::process::id()));
        let path = dir.join("report.json");

        let mut meshing = MeshMetrics::default();
        meshing.add(100, 180, 5000);
        MetricsReport::new("write_test")
            .with_meshing(meshing)
            .finished(Duration::from_millis(1500), Some(3))
            .write_json(&path)
            .expect("write report");

        let contents = fs::read_to_string(&path).expect("report readable");
        assert!(contents.contains("\"name\": \"write_test\""));
        assert!(contents.contains("\"outcome\": \"pass\""));
        assert!(contents.contains("\"total_triangles\": 180"));
        assert!(contents.contains("\"elapsed_seconds\": 1.5"));
        assert!(!path.with_extension("json.partial").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
