//! Command-line configuration for the `pyramid-view` binary.
//!
//! This module provides configuration that supports:
//! - Command-line arguments via clap
//! - Environment variables with `PYRAMID_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `PYRAMID_CANVAS_WIDTH` - Canvas width in pixels (default: 800)
//! - `PYRAMID_CANVAS_HEIGHT` - Canvas height in pixels (default: 600)
//! - `PYRAMID_CACHE_FRAMES` - Max frames to cache (default: 100)
//! - `PYRAMID_NO_ANNOTATIONS` - Hide annotations (default: false)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::session::SessionConfig;
use crate::tile::DEFAULT_TILE_CACHE_CAPACITY;
use crate::viewport::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};

/// Default output file for rendered frames.
pub const DEFAULT_OUTPUT: &str = "frame.png";

// =============================================================================
// CLI Arguments
// =============================================================================

/// pyramid-view - Inspect and render OME-Zarr image pyramids.
///
/// Opens pyramids stored as directories or ZIP archives and renders
/// canvas-sized views with their annotations.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-view")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the level table and annotation summary of a pyramid.
    Info(InfoConfig),

    /// Render one view of a pyramid to a PNG file.
    Render(RenderConfig),
}

/// Arguments of `pyramid-view info`.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Pyramid directory or ZIP archive.
    pub locator: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.locator.as_os_str().is_empty() {
            return Err("locator must not be empty".to_string());
        }
        Ok(())
    }
}

/// Arguments of `pyramid-view render`.
#[derive(Args, Debug, Clone)]
pub struct RenderConfig {
    /// Pyramid directory or ZIP archive.
    pub locator: PathBuf,

    // =========================================================================
    // Canvas
    // =========================================================================
    /// Canvas width in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_WIDTH, env = "PYRAMID_CANVAS_WIDTH")]
    pub width: usize,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_HEIGHT, env = "PYRAMID_CANVAS_HEIGHT")]
    pub height: usize,

    // =========================================================================
    // View
    // =========================================================================
    /// Level to show (default: coarsest), keeping the canvas center fixed.
    #[arg(long)]
    pub level: Option<usize>,

    /// Horizontal pan in canvas pixels.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub pan_x: f64,

    /// Vertical pan in canvas pixels.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub pan_y: f64,

    /// Number of one-level zoom-in steps.
    #[arg(long, default_value_t = 0)]
    pub zoom_in: usize,

    /// Canvas X of the zoom anchor (default: canvas center).
    #[arg(long)]
    pub anchor_x: Option<f64>,

    /// Canvas Y of the zoom anchor (default: canvas center).
    #[arg(long)]
    pub anchor_y: Option<f64>,

    /// Do not draw annotations.
    #[arg(long, default_value_t = false, env = "PYRAMID_NO_ANNOTATIONS")]
    pub no_annotations: bool,

    // =========================================================================
    // Cache
    // =========================================================================
    /// Maximum number of extracted frames to cache.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "PYRAMID_CACHE_FRAMES")]
    pub cache_frames: usize,

    // =========================================================================
    // Output
    // =========================================================================
    /// Output PNG path.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("canvas width and height must be greater than 0".to_string());
        }
        if self.cache_frames == 0 {
            return Err("cache_frames must be greater than 0".to_string());
        }
        if !self.pan_x.is_finite() || !self.pan_y.is_finite() {
            return Err("pan offsets must be finite".to_string());
        }
        let is_png = self
            .output
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png {
            return Err(format!(
                "output must be a .png file, got {}",
                self.output.display()
            ));
        }
        Ok(())
    }

    /// Zoom anchor, defaulting to the canvas center.
    pub fn anchor(&self) -> (f64, f64) {
        (
            self.anchor_x.unwrap_or(self.width as f64 / 2.0),
            self.anchor_y.unwrap_or(self.height as f64 / 2.0),
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cache_capacity: self.cache_frames,
            canvas_width: self.width,
            canvas_height: self.height,
            show_annotations: !self.no_annotations,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
