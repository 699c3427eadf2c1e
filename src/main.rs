//! eldergrove - chunk-streamed procedural terrain
//!
//! Headless driver: walks a scripted path and streams terrain around it.

mod config;
mod headless;

use anyhow::Result;
use config::AppConfig;
use headless::HeadlessConfig;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    let cli = CliOptions::parse(env::args().skip(1));

    // WARN by default; RUST_LOG or --log override it.
    let filter = match cli.log_filter.as_deref() {
        Some(directives) => tracing_subscriber::EnvFilter::new(directives),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting eldergrove v{}", env!("CARGO_PKG_VERSION"));

    let mut app = match &cli.config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };
    if let Some(frames) = cli.frames {
        app.frames = frames;
    }
    if let Some(seed) = cli.world_seed {
        app.streaming.world_seed = seed;
    }
    if cli.nearest_first {
        app.streaming.nearest_first = true;
    }

    if let Some(path) = &cli.write_config {
        app.save_to_path(path)?;
        info!(path = %path.display(), "Wrote effective configuration");
        return Ok(());
    }

    let summary = headless::run(HeadlessConfig {
        app,
        events: cli.events_path,
        metrics: cli.metrics_path,
    })?;

    println!(
        "{} frames: {} chunks generated, {} unloaded, {} ready, peak {} resident, {} enemies, {} vegetation instances",
        summary.frames,
        summary.stats.chunks_generated,
        summary.stats.chunks_unloaded,
        summary.stats.ready_chunks,
        summary.peak_resident,
        summary.enemies,
        summary.vegetation_instances,
    );
    Ok(())
}

#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    frames: Option<u64>,
    world_seed: Option<u64>,
    nearest_first: bool,
    log_filter: Option<String>,
    events_path: Option<PathBuf>,
    metrics_path: Option<PathBuf>,
    write_config: Option<PathBuf>,
}

impl CliOptions {
    // Runs before the subscriber is installed, so problems go to stderr.
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => match args.next() {
                    Some(path) => opts.config_path = Some(PathBuf::from(path)),
                    None => eprintln!("--config requires a file path"),
                },
                "--frames" => opts.frames = parse_number(&mut args, "--frames"),
                "--seed" | "--world-seed" => opts.world_seed = parse_number(&mut args, "--seed"),
                "--nearest-first" => opts.nearest_first = true,
                "--log" => match args.next() {
                    Some(filter) => opts.log_filter = Some(filter),
                    None => eprintln!("--log requires a filter such as eldergrove_world=debug"),
                },
                "--events" => match args.next() {
                    Some(path) => opts.events_path = Some(PathBuf::from(path)),
                    None => eprintln!("--events requires a file path"),
                },
                "--metrics" => match args.next() {
                    Some(path) => opts.metrics_path = Some(PathBuf::from(path)),
                    None => eprintln!("--metrics requires a file path"),
                },
                "--write-config" => match args.next() {
                    Some(path) => opts.write_config = Some(PathBuf::from(path)),
                    None => eprintln!("--write-config requires a file path"),
                },
                other => eprintln!("Ignoring unknown argument {other}"),
            }
        }

        opts
    }
}

fn parse_number<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Option<u64> {
    let raw = match args.next() {
        Some(raw) => raw,
        None => {
            eprintln!("{flag} requires an integer");
            return None;
        }
    };
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("{flag} must be an integer, got {raw}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_known_flags() {
        let opts = parse(&[
            "--frames",
            "300",
            "--seed",
            "9",
            "--nearest-first",
            "--log",
            "eldergrove_world=debug",
            "--events",
            "out/events.jsonl",
        ]);
        assert_eq!(opts.frames, Some(300));
        assert_eq!(opts.world_seed, Some(9));
        assert!(opts.nearest_first);
        assert_eq!(opts.log_filter.as_deref(), Some("eldergrove_world=debug"));
        assert_eq!(opts.events_path, Some(PathBuf::from("out/events.jsonl")));
        assert_eq!(opts.metrics_path, None);
    }

    #[test]
    fn bad_values_are_ignored() {
        let opts = parse(&["--frames", "lots", "--bogus", "--config"]);
        assert_eq!(opts.frames, None);
        assert_eq!(opts.config_path, None);
    }
}
