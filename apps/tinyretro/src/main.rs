mod app;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use app::TinyRetroApp;
use clap::Parser;
use eframe::egui;
use libretro_host::Session;
use tracing_subscriber::EnvFilter;

/// Minimal libretro frontend: loads a core module, runs a ROM in it, and
/// presents the frames in a window.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the libretro core shared module.
    core: PathBuf,
    /// Path to the ROM image to load.
    rom: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    tracing::info!(core = %cli.core.display(), rom = %cli.rom.display(), "starting");
    let session = Session::start(&cli.core, &cli.rom)?;
    let geometry = session.av_info().geometry;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("tinyretro")
            .with_inner_size([
                geometry.base_width.max(1) as f32 * 3.0,
                geometry.base_height.max(1) as f32 * 3.0,
            ]),
        ..Default::default()
    };

    eframe::run_native(
        "tinyretro",
        native_options,
        Box::new(move |cc| Ok(Box::new(TinyRetroApp::new(cc, session)))),
    )
    .map_err(|e| anyhow!("eframe failed: {e}"))?;

    Ok(())
}
