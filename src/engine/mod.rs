pub mod geometry;
pub mod interaction;
pub mod islands;
pub mod layout;
pub mod links;
pub mod model;
pub mod reconcile;
pub mod repulsion;
pub mod scene;
pub mod scheduler;
pub mod simulation;
pub mod transform;

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::f32::consts::TAU;
use std::rc::Rc;
use std::time::Duration;

use eframe::egui::{Color32, Pos2, Vec2, pos2};

use crate::config::{ConfigBridge, Settings, SubscriptionId};
use crate::content::{
    CategoryId, CategoryRecord, Dataset, NodeId, NodeRecord, PositionRecord, PositionStore,
};
use crate::util::parse_hex_color;

pub use interaction::{Command, Emphasis, InteractionMachine, Mode, PointerEvent};
pub use islands::{Island, IslandCadence, IslandKey, IslandParams, build_islands};
pub use links::{Link, LinkId, LinkKind, LinkParams, build_links};
pub use model::{Category, GraphNode};
pub use repulsion::{RepulsionOverlay, RepulsionParams, StopReason};
pub use scene::Scene;
pub use scheduler::{Clock, ManualClock, MonotonicClock, Scheduler, Task, TickHandle, TimerQueue};
pub use simulation::{Simulation, SimulationParams};
pub use transform::ViewTransform;

const MAX_TASKS_PER_PUMP: usize = 64;
const REBUILD_ALPHA: f32 = 0.5;
const PULSE_INTERVAL: Duration = Duration::from_millis(50);
const PULSE_STEP: f32 = TAU / 24.0;

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Navigate {
        id: NodeId,
        permalink: String,
    },
    Rebuilt {
        nodes: usize,
        links: usize,
        islands: usize,
    },
}

/// Handle to one live graph view. Everything runs on the caller's thread:
/// the owner forwards pointer input and calls `pump` whenever
/// `next_wakeup` says a timer is due.
pub struct GraphEngine {
    bridge: ConfigBridge,
    subscription: Option<SubscriptionId>,
    dirty: Rc<Cell<bool>>,
    settings: Settings,
    applied_revision: u64,
    scheduler: Box<dyn Scheduler>,
    position_store: Option<Box<dyn PositionStore>>,

    records: Vec<NodeRecord>,
    category_records: Vec<CategoryRecord>,
    categories: Vec<Category>,
    filters: BTreeSet<CategoryId>,
    viewport: Option<Vec2>,
    transform: ViewTransform,

    simulation: Option<Simulation>,
    islands: Vec<Island>,
    cadence: IslandCadence,
    overlay: RepulsionOverlay,
    interaction: InteractionMachine,
    scene: Scene,

    tick_handle: Option<TickHandle>,
    rebuild_handle: Option<TickHandle>,
    repulsion_handle: Option<TickHandle>,
    navigation_handle: Option<TickHandle>,
    last_frame_at: Option<Duration>,

    events: Vec<EngineEvent>,
    rebuild_count: u64,
    closed: bool,
}

impl GraphEngine {
    pub fn new(dataset: Dataset, bridge: ConfigBridge, scheduler: Box<dyn Scheduler>) -> Self {
        let settings = bridge.settings();
        let applied_revision = bridge.revision();

        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        let subscription = bridge.subscribe(move |_| flag.set(true));

        let mut seen = HashSet::new();
        let records = dataset
            .nodes
            .into_iter()
            .filter(|record| seen.insert(record.id))
            .collect::<Vec<_>>();
        let categories = build_categories(&dataset.categories, &settings);

        Self {
            subscription: Some(subscription),
            dirty,
            applied_revision,
            scheduler,
            position_store: None,
            records,
            category_records: dataset.categories,
            categories,
            filters: BTreeSet::new(),
            viewport: None,
            transform: ViewTransform::default(),
            simulation: None,
            islands: Vec::new(),
            cadence: IslandCadence::from_settings(&settings),
            overlay: RepulsionOverlay::new(RepulsionParams::from_settings(&settings)),
            interaction: InteractionMachine::new(),
            scene: Scene::new(),
            tick_handle: None,
            rebuild_handle: None,
            repulsion_handle: None,
            navigation_handle: None,
            last_frame_at: None,
            events: Vec::new(),
            rebuild_count: 0,
            closed: false,
            bridge,
            settings,
        }
    }

    pub fn with_position_store(mut self, store: Box<dyn PositionStore>) -> Self {
        self.position_store = Some(store);
        self
    }

    pub fn bridge(&self) -> &ConfigBridge {
        &self.bridge
    }

    /// Settings as of the last rebuild.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn applied_revision(&self) -> u64 {
        self.applied_revision
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn links(&self) -> &[Link] {
        self.simulation.as_ref().map_or(&[], Simulation::links)
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn filters(&self) -> &BTreeSet<CategoryId> {
        &self.filters
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn viewport(&self) -> Option<Vec2> {
        self.viewport
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.simulation.as_ref()?.node(id)
    }

    pub fn total_nodes(&self) -> usize {
        self.records.len()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.interaction.selected()
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.interaction.hovered()
    }

    pub fn interaction_mode(&self) -> Mode {
        self.interaction.mode()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn is_repulsion_running(&self) -> bool {
        self.overlay.is_running()
    }

    /// Node under a viewport-local screen position.
    pub fn node_at_screen(&self, screen: Pos2) -> Option<NodeId> {
        self.scene.node_at(self.transform.screen_to_world(screen))
    }

    /// Time until the next timer, or zero while transitions are playing.
    pub fn next_wakeup(&self) -> Option<Duration> {
        if self.closed {
            return None;
        }
        if self.scene.has_transitions() {
            return Some(Duration::ZERO);
        }
        let now = self.scheduler.now();
        self.scheduler
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(now))
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if self.closed {
            return;
        }
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            tracing::warn!(width, height, "ignoring resize to an unusable viewport");
            return;
        }

        let size = Vec2::new(width, height);
        if self.viewport == Some(size) {
            return;
        }
        self.viewport = Some(size);

        let Some(simulation) = self.simulation.as_mut() else {
            self.cancel(Task::Rebuild);
            self.rebuild();
            return;
        };

        let reheat_alpha = self.bridge.read(|settings| settings.reheat_alpha);
        simulation.set_center(pos2(width * 0.5, height * 0.5));
        let target = simulation.alpha_target();
        simulation.reheat(reheat_alpha, target);
        self.cadence.reset();
        self.ensure_ticking();
    }

    pub fn reset_zoom(&mut self) {
        self.transform = ViewTransform::default();
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.transform.pan_by(delta);
    }

    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        self.transform.zoom_at(anchor, factor);
    }

    /// Returns whether the category is filtered in after the toggle.
    pub fn toggle_category(&mut self, id: CategoryId) -> bool {
        let active = if self.filters.remove(&id) {
            false
        } else {
            self.filters.insert(id);
            true
        };
        self.request_rebuild();
        active
    }

    pub fn clear_filters(&mut self) {
        if self.filters.is_empty() {
            return;
        }
        self.filters.clear();
        self.request_rebuild();
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        if self.closed {
            return;
        }

        let target = match event {
            PointerEvent::HoverEnter(id)
            | PointerEvent::Click(id)
            | PointerEvent::DoubleActivate(id)
            | PointerEvent::DragStart(id) => Some(id),
            _ => None,
        };
        if let Some(id) = target
            && self.node(id).is_none()
        {
            tracing::debug!(id, ?event, "pointer event for unknown node ignored");
            return;
        }

        for command in self.interaction.handle(event) {
            self.apply(command);
        }
    }

    /// Runs due timers and advances transitions.
    pub fn pump(&mut self) {
        if self.closed {
            return;
        }

        if self.dirty.replace(false) {
            self.request_rebuild();
        }

        for _ in 0..MAX_TASKS_PER_PUMP {
            let Some((handle, task)) = self.scheduler.next_due() else {
                break;
            };
            self.run(handle, task);
            if self.closed {
                return;
            }
        }

        self.advance_transitions();
    }

    /// Cancels every timer and detaches from the settings bridge. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        self.scheduler.cancel_all();
        self.tick_handle = None;
        self.rebuild_handle = None;
        self.repulsion_handle = None;
        self.navigation_handle = None;
        self.overlay.reset();
        self.scene.clear(self.scheduler.as_mut());
        if let Some(subscription) = self.subscription.take() {
            self.bridge.unsubscribe(subscription);
        }
        self.closed = true;
        tracing::debug!("graph engine closed");
    }

    fn request_rebuild(&mut self) {
        if self.closed {
            return;
        }
        self.cancel(Task::Rebuild);
        let delay = self.bridge.read(Settings::rebuild_debounce);
        self.rebuild_handle = Some(self.scheduler.schedule_tick(Task::Rebuild, delay));
    }

    fn cancel(&mut self, task: Task) {
        let slot = match task {
            Task::SimulationTick => &mut self.tick_handle,
            Task::Rebuild => &mut self.rebuild_handle,
            Task::RepulsionFrame => &mut self.repulsion_handle,
            Task::Navigate(_) => &mut self.navigation_handle,
            Task::Pulse(_) => return,
        };
        if let Some(handle) = slot.take() {
            self.scheduler.cancel_tick(handle);
        }
    }

    fn run(&mut self, handle: TickHandle, task: Task) {
        match task {
            Task::SimulationTick => {
                self.tick_handle = None;
                self.step_simulation();
            }
            Task::RepulsionFrame => {
                self.repulsion_handle = None;
                self.step_repulsion();
            }
            Task::Rebuild => {
                self.rebuild_handle = None;
                self.rebuild();
            }
            Task::Navigate(id) => {
                if self.navigation_handle == Some(handle) {
                    self.navigation_handle = None;
                }
                if self.interaction.take_pending_navigation(id) {
                    self.navigate(id);
                }
            }
            Task::Pulse(id) => self.pulse(id, handle),
        }
    }

    fn rebuild(&mut self) {
        let Some(viewport) = self.viewport else {
            tracing::warn!("rebuild requested before the viewport exists; skipping");
            return;
        };

        let settings = self.bridge.settings();
        let revision = self.bridge.revision();
        let center = pos2(viewport.x * 0.5, viewport.y * 0.5);
        self.categories = build_categories(&self.category_records, &settings);

        let previous = self
            .simulation
            .take()
            .map(|simulation| {
                simulation
                    .into_nodes()
                    .into_iter()
                    .map(|node| (node.id, node))
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        let mut nodes = Vec::new();
        let mut seated = Vec::new();
        for record in self.records.iter().filter(|record| passes_filter(record, &self.filters)) {
            let mut node = GraphNode::from_record(record, &self.categories, &settings);
            if let Some(prior) = previous.get(&record.id)
                && prior.has_finite_position()
            {
                node.x = prior.x;
                node.y = prior.y;
                node.vx = prior.vx;
                node.vy = prior.vy;
                node.fx = prior.fx;
                node.fy = prior.fy;
                seated.push(true);
            } else if let Some((x, y)) = record.persisted_position() {
                node.x = x;
                node.y = y;
                seated.push(true);
            } else {
                seated.push(false);
            }
            nodes.push(node);
        }

        let spacing = layout::layout_spacing(settings.node_size, settings.collision_padding);
        layout::place_unseated(&mut nodes, &seated, center, spacing);

        let kept = nodes.iter().map(|node| node.id).collect::<HashSet<_>>();
        for id in previous.keys().filter(|id| !kept.contains(*id)) {
            self.interaction.forget(*id);
        }

        let links = build_links(&nodes, LinkParams::from_settings(&settings));
        let mut simulation =
            Simulation::new(nodes, links, SimulationParams::from_settings(&settings), center);
        if !previous.is_empty() {
            simulation = simulation.with_alpha(REBUILD_ALPHA);
        }
        if let Some(dragged) = self.interaction.dragging() {
            simulation.reheat(settings.reheat_alpha, settings.reheat_alpha_target);
            simulation.pin(dragged);
        }

        // Overlay velocities are indexed by node order, which a rebuild may change.
        let repulsing = self.overlay.is_running();
        self.overlay.reset();
        self.overlay.set_params(RepulsionParams::from_settings(&settings));
        self.cadence = IslandCadence::from_settings(&settings);
        self.settings = settings;
        self.applied_revision = revision;

        let animate = self.settings.animations_enabled;
        let no_links: &[Link] = &[];
        self.scene
            .sync_nodes(simulation.nodes(), self.scheduler.as_mut(), animate);
        let visible_links = if self.settings.show_links {
            simulation.links()
        } else {
            no_links
        };
        self.scene
            .sync_links(visible_links, simulation.nodes(), animate);
        self.simulation = Some(simulation);

        self.refresh_scales();
        self.refresh_islands();
        self.rebuild_count += 1;
        if repulsing {
            self.restart_repulsion();
        }

        let node_count = self.simulation.as_ref().map_or(0, |simulation| simulation.nodes().len());
        let link_count = self.scene.links().len();
        tracing::info!(
            nodes = node_count,
            links = link_count,
            islands = self.islands.len(),
            revision,
            "graph rebuilt"
        );
        self.events.push(EngineEvent::Rebuilt {
            nodes: node_count,
            links: link_count,
            islands: self.islands.len(),
        });

        self.ensure_ticking();
    }

    fn refresh_islands(&mut self) {
        let Some(simulation) = self.simulation.as_ref() else {
            return;
        };

        self.islands = if self.settings.show_islands {
            build_islands(
                simulation.nodes(),
                &self.categories,
                &IslandParams::from_settings(&self.settings),
            )
        } else {
            Vec::new()
        };
        self.scene
            .sync_islands(&self.islands, self.settings.animations_enabled);
    }

    fn refresh_scales(&mut self) {
        let ids = self.scene.nodes().keys().copied().collect::<Vec<_>>();
        for id in ids {
            let emphasis = self.scene.node(id).map(|element| element.emphasis);
            if let Some(emphasis) = emphasis {
                self.set_emphasis(id, emphasis);
            }
        }
    }

    fn ensure_ticking(&mut self) {
        if self.closed || self.tick_handle.is_some() {
            return;
        }
        let Some(simulation) = self.simulation.as_ref() else {
            return;
        };
        if simulation.is_idle() {
            return;
        }

        let interval = self.bridge.read(Settings::tick_interval);
        self.tick_handle = Some(self.scheduler.schedule_tick(Task::SimulationTick, interval));
    }

    fn step_simulation(&mut self) {
        let Some(simulation) = self.simulation.as_mut() else {
            return;
        };

        let running = simulation.tick();
        let alpha = simulation.alpha();
        self.scene.sync_positions(simulation.nodes());

        // Settling still moves nodes after the cadence stops firing.
        if self.cadence.observe_tick(alpha) || !running {
            self.refresh_islands();
        }
        if running {
            self.ensure_ticking();
        }
    }

    fn restart_repulsion(&mut self) {
        self.cancel(Task::RepulsionFrame);
        let params = self.bridge.read(RepulsionParams::from_settings);
        self.overlay.set_params(params);
        self.overlay.start(self.scheduler.now());

        let interval = self.bridge.read(Settings::tick_interval);
        self.repulsion_handle = Some(self.scheduler.schedule_tick(Task::RepulsionFrame, interval));
    }

    fn step_repulsion(&mut self) {
        let now = self.scheduler.now();
        let Some(simulation) = self.simulation.as_mut() else {
            self.overlay.reset();
            return;
        };

        let stopped = self.overlay.step(simulation.nodes_mut(), now);
        self.scene.sync_positions(simulation.nodes());
        if stopped.is_some() {
            return;
        }

        let interval = self.bridge.read(Settings::tick_interval);
        self.repulsion_handle = Some(self.scheduler.schedule_tick(Task::RepulsionFrame, interval));
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Emphasize(id, emphasis) => self.set_emphasis(id, emphasis),
            Command::ResetVisual(id) => {
                self.set_emphasis(id, Emphasis::None);
                if let Some(simulation) = self.simulation.as_mut() {
                    simulation.unpin(id);
                }
            }
            Command::ScheduleNavigation(id) => {
                if let Some(handle) = self.navigation_handle.take() {
                    self.scheduler.cancel_tick(handle);
                }
                let window = self.bridge.read(Settings::double_click_window);
                self.navigation_handle =
                    Some(self.scheduler.schedule_tick(Task::Navigate(id), window));
            }
            Command::CancelNavigation => {
                if let Some(handle) = self.navigation_handle.take() {
                    self.scheduler.cancel_tick(handle);
                }
            }
            Command::Navigate(id) => self.navigate(id),
            Command::Pin(id) => {
                if let Some(simulation) = self.simulation.as_mut() {
                    simulation.pin(id);
                }
            }
            Command::MovePin(id, position) => {
                if let Some(simulation) = self.simulation.as_mut()
                    && simulation.set_pin(id, position)
                {
                    self.scene.sync_positions(simulation.nodes());
                }
            }
            Command::Unpin(id) => {
                if let Some(simulation) = self.simulation.as_mut() {
                    simulation.unpin(id);
                }
            }
            Command::Reheat => {
                let (alpha, target) = self
                    .bridge
                    .read(|settings| (settings.reheat_alpha, settings.reheat_alpha_target));
                if let Some(simulation) = self.simulation.as_mut() {
                    simulation.reheat(alpha, target);
                }
                self.cadence.reset();
                self.ensure_ticking();
            }
            Command::Cool => {
                if let Some(simulation) = self.simulation.as_mut() {
                    simulation.cool();
                }
                self.ensure_ticking();
            }
            Command::PersistPosition(id) => self.persist_position(id),
            Command::RestartRepulsion => self.restart_repulsion(),
        }
    }

    fn set_emphasis(&mut self, id: NodeId, emphasis: Emphasis) {
        let (scale, animate) = self.bridge.read(|settings| {
            let scale = match emphasis {
                Emphasis::None => 1.0,
                Emphasis::Hover => settings.hover_scale,
                Emphasis::Selected => settings.selected_scale,
            };
            (scale, settings.animations_enabled)
        });

        let Some(element) = self.scene.node_mut(id) else {
            return;
        };
        element.emphasis = emphasis;
        element.target_scale = scale;
        if !animate {
            element.scale = scale;
        }

        let wants_pulse = emphasis == Emphasis::Selected && animate;
        if wants_pulse {
            if element.animation.is_none() {
                element.animation = Some(self.scheduler.schedule_tick(Task::Pulse(id), PULSE_INTERVAL));
            }
        } else {
            if let Some(handle) = element.animation.take() {
                self.scheduler.cancel_tick(handle);
            }
            element.pulse_phase = 0.0;
        }
    }

    fn pulse(&mut self, id: NodeId, handle: TickHandle) {
        let Some(element) = self.scene.node_mut(id) else {
            return;
        };
        if element.animation != Some(handle) {
            return;
        }

        element.animation = None;
        if element.emphasis != Emphasis::Selected {
            element.pulse_phase = 0.0;
            return;
        }
        element.pulse_phase = (element.pulse_phase + PULSE_STEP) % TAU;
        element.animation = Some(self.scheduler.schedule_tick(Task::Pulse(id), PULSE_INTERVAL));
    }

    fn navigate(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let permalink = node.permalink.clone();
        tracing::debug!(id, permalink = permalink.as_str(), "navigating to node");
        self.events.push(EngineEvent::Navigate { id, permalink });
    }

    fn persist_position(&mut self, id: NodeId) {
        if !self.bridge.read(|settings| settings.persist_positions) {
            return;
        }
        let Some(store) = self.position_store.as_ref() else {
            return;
        };
        let Some(node) = self.simulation.as_ref().and_then(|simulation| simulation.node(id)) else {
            return;
        };
        if !node.has_finite_position() {
            return;
        }
        store.save(PositionRecord {
            id,
            x: node.x,
            y: node.y,
        });
    }

    fn advance_transitions(&mut self) {
        let now = self.scheduler.now();
        let dt = self
            .last_frame_at
            .replace(now)
            .map_or(Duration::ZERO, |previous| now.saturating_sub(previous));
        let fade = self.bridge.read(|settings| {
            if settings.animations_enabled {
                settings.fade_duration()
            } else {
                Duration::ZERO
            }
        });
        self.scene.advance_transitions(dt.min(Duration::from_secs(1)), fade);
    }
}

impl Drop for GraphEngine {
    fn drop(&mut self) {
        self.close();
    }
}

fn passes_filter(record: &NodeRecord, filters: &BTreeSet<CategoryId>) -> bool {
    filters.is_empty()
        || record
            .categories
            .iter()
            .any(|category| filters.contains(category))
}

fn build_categories(records: &[CategoryRecord], settings: &Settings) -> Vec<Category> {
    let fallback = parse_hex_color(&settings.default_node_color).unwrap_or(Color32::GRAY);
    records
        .iter()
        .map(|record| Category::from_record(record, fallback))
        .collect()
}
