//! pyramid-view - Inspect and render OME-Zarr image pyramids.
//!
//! This binary wires the viewing engine to the command line.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_view::{
    annotation::AnnotationStore,
    config::{Cli, Command, InfoConfig, RenderConfig},
    pyramid::PyramidSource,
    session::Session,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Info(config) => run_info(config),
        Command::Render(config) => run_render(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_view=debug"
    } else {
        "pyramid_view=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = match PyramidSource::open(&config.locator) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open {}: {}", config.locator.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", source.summary());
    println!("Container: {}", source.container_kind().name());
    println!();
    println!("Level  Size              Layout            Shape");
    println!("─────  ────────────────  ────────────────  ─────────────────");
    for level in source.levels() {
        println!(
            "{:>5}  {:<16}  {:<16}  {:?}",
            level.index,
            level.extent().to_string(),
            level.layout.name(),
            level.shape
        );
    }

    let annotations = AnnotationStore::from_source(&source);
    println!();
    println!(
        "Annotations: {} feature(s), {} level style(s)",
        annotations.len(),
        annotations.level_count()
    );
    if annotations.skipped_documents() > 0 || annotations.skipped_features() > 0 {
        println!(
            "  skipped {} document(s), {} feature(s)",
            annotations.skipped_documents(),
            annotations.skipped_features()
        );
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Render Command
// =============================================================================

fn run_render(config: RenderConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut session = Session::new(config.session_config());
    if let Err(e) = session.load(&config.locator) {
        error!("Failed to open {}: {}", config.locator.display(), e);
        return ExitCode::FAILURE;
    }

    if let Some(level) = config.level {
        if let Err(e) = session.set_level(level) {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    let anchor = config.anchor();
    for step in 0..config.zoom_in {
        if !session.zoom_in(anchor) {
            info!(step, "already at full resolution");
            break;
        }
    }

    session.pan(config.pan_x, config.pan_y);

    let frame = match session.render() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Render failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let saved = frame
        .to_image()
        .map_err(|e| e.to_string())
        .and_then(|img| img.save(&config.output).map_err(|e| e.to_string()));
    if let Err(e) = saved {
        error!("Failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    if let Some(status) = session.status() {
        println!("{}", status.image);
        println!("{}", status.position);
        if !status.annotations.is_empty() {
            println!("{}", status.annotations);
        }
    }
    println!("Wrote {}", config.output.display());

    ExitCode::SUCCESS
}
