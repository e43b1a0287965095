use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use anyhow::{anyhow, Result};
use clap::Parser;
use client_core::{load_settings, Settings};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::{ConsoleApp, PersistedConsoleSettings, SETTINGS_STORAGE_KEY};

#[derive(Debug, Parser)]
#[command(name = "envdeck-gui", about = "Desktop console for a Python environment manager")]
struct Args {
    /// Management API base URL; overrides config and environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Explicit config file instead of the default search path.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = &args.api_url {
        settings.api_base_url = url.trim().to_string();
    }
    Ok(settings)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();
    let settings = resolve_settings(&args)?;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Envdeck")
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([760.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Envdeck",
        options,
        Box::new(move |cc| {
            let persisted = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedConsoleSettings>(&text).ok())
            });
            Ok(Box::new(ConsoleApp::new(settings, cmd_tx, ui_rx, persisted)))
        }),
    )
    .map_err(|err| anyhow!("gui failed: {err}"))
}
