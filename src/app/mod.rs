use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context};

use content_islands::config::{ConfigBridge, Settings};
use content_islands::content::{
    Dataset, JsonDirSource, JsonFilePositionStore, NodeId, apply_positions, load_dataset,
    read_positions,
};
use content_islands::engine::{GraphEngine, TimerQueue};

mod graph;
mod render_utils;
mod ui;

type LoadResult = Result<Dataset, String>;

pub struct ContentIslandsApp {
    data_dir: PathBuf,
    positions: Option<PathBuf>,
    bridge: ConfigBridge,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Empty,
    Error(String),
}

struct ViewModel {
    engine: GraphEngine,
    bridge: ConfigBridge,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    drag_node: Option<NodeId>,
    settings_error: Option<String>,
}

struct SearchMatchCache {
    query: String,
    rebuild_count: u64,
    matches: Arc<HashSet<NodeId>>,
}

impl ContentIslandsApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        data_dir: PathBuf,
        positions: Option<PathBuf>,
        settings: Settings,
    ) -> Self {
        let state = Self::start_load(data_dir.clone(), positions.clone());
        Self {
            data_dir,
            positions,
            bridge: ConfigBridge::new(settings),
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(data_dir: PathBuf, positions: Option<PathBuf>) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_content(data_dir, positions).map_err(|error| {
                tracing::error!("failed to load content: {error:#}");
                format!("{error:#}")
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_dir: PathBuf, positions: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(data_dir, positions),
        }
    }

    fn ready_state(&self, result: LoadResult) -> AppState {
        match result {
            Ok(dataset) if dataset.is_empty() => AppState::Empty,
            Ok(dataset) => {
                let mut engine = GraphEngine::new(
                    dataset,
                    self.bridge.clone(),
                    Box::new(TimerQueue::monotonic()),
                );
                if let Some(path) = &self.positions {
                    engine = engine.with_position_store(Box::new(JsonFilePositionStore::new(path)));
                }
                AppState::Ready(Box::new(ViewModel::new(engine, self.bridge.clone())))
            }
            Err(error) => AppState::Error(error),
        }
    }
}

fn load_content(data_dir: PathBuf, positions: Option<PathBuf>) -> Result<Dataset> {
    let mut dataset = load_dataset(&JsonDirSource::new(data_dir))?;
    if let Some(path) = positions {
        let saved = read_positions(&path)?;
        apply_positions(&mut dataset, &saved);
    }
    Ok(dataset)
}

fn centered_message(ctx: &Context, heading: &str, spinner: bool) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(120.0);
            ui.heading(heading);
            if spinner {
                ui.add_space(8.0);
                ui.spinner();
            }
        });
    });
}

impl eframe::App for ContentIslandsApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut loaded = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => loaded = Some(result),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }
                centered_message(ctx, "Loading content graph...", true);
            }
            AppState::Empty => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("No content to display");
                        ui.add_space(6.0);
                        ui.label(format!("{} has no nodes.", self.data_dir.display()));
                        ui.add_space(10.0);
                        if ui.button("Reload").clicked() {
                            transition =
                                Some(Self::start_load(self.data_dir.clone(), self.positions.clone()));
                        }
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load content");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition =
                            Some(Self::start_load(self.data_dir.clone(), self.positions.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.data_dir, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx =
                        Some(Self::spawn_load(self.data_dir.clone(), self.positions.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => loaded = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = loaded {
            transition = Some(self.ready_state(result));
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
