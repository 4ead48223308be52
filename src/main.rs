mod app;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use content_islands::config::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding `nodes.json` and `categories.json`.
    #[arg(long, default_value = "demos/content")]
    data_dir: PathBuf,

    /// JSON file with settings overrides.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Saved node positions; dragging a node writes back to it.
    #[arg(long)]
    positions: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if args.positions.is_some() {
        settings.persist_positions = true;
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "content-islands",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::ContentIslandsApp::new(
                cc,
                args.data_dir.clone(),
                args.positions.clone(),
                settings,
            )))
        }),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
