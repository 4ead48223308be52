use eframe::egui::Pos2;

use crate::content::NodeId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    HoverEnter(NodeId),
    HoverLeave,
    Click(NodeId),
    DoubleActivate(NodeId),
    BackgroundClick,
    DragStart(NodeId),
    /// World coordinates.
    DragMove(Pos2),
    DragEnd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Emphasis {
    #[default]
    None,
    Hover,
    Selected,
}

/// Side effects requested by a transition. The engine applies them in order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Emphasize(NodeId, Emphasis),
    /// Scale, pin and animation back to rest.
    ResetVisual(NodeId),
    ScheduleNavigation(NodeId),
    CancelNavigation,
    Navigate(NodeId),
    Pin(NodeId),
    MovePin(NodeId, Pos2),
    Unpin(NodeId),
    Reheat,
    Cool,
    PersistPosition(NodeId),
    RestartRepulsion,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    Selected(NodeId),
    Dragging {
        node: NodeId,
        resume: Option<NodeId>,
    },
}

#[derive(Debug, Default)]
pub struct InteractionMachine {
    mode: Mode,
    hovered: Option<NodeId>,
    pending_navigation: Option<NodeId>,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected(&self) -> Option<NodeId> {
        match self.mode {
            Mode::Selected(id) => Some(id),
            Mode::Dragging { resume, .. } => resume,
            Mode::Idle => None,
        }
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn dragging(&self) -> Option<NodeId> {
        match self.mode {
            Mode::Dragging { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging().is_some()
    }

    pub fn pending_navigation(&self) -> Option<NodeId> {
        self.pending_navigation
    }

    /// Consumes the pending single-click navigation if it still targets `id`.
    pub fn take_pending_navigation(&mut self, id: NodeId) -> bool {
        if self.pending_navigation == Some(id) {
            self.pending_navigation = None;
            return true;
        }
        false
    }

    pub fn handle(&mut self, event: PointerEvent) -> Vec<Command> {
        let mut commands = Vec::new();
        match event {
            PointerEvent::HoverEnter(id) => self.hover_enter(id, &mut commands),
            PointerEvent::HoverLeave => self.hover_leave(&mut commands),
            PointerEvent::Click(id) => self.click(id, &mut commands),
            PointerEvent::DoubleActivate(id) => {
                self.cancel_navigation(&mut commands);
                commands.push(Command::Navigate(id));
            }
            PointerEvent::BackgroundClick => {
                if let Mode::Selected(previous) = self.mode {
                    self.cancel_navigation(&mut commands);
                    commands.push(Command::ResetVisual(previous));
                    self.mode = Mode::Idle;
                }
            }
            PointerEvent::DragStart(id) => self.drag_start(id, &mut commands),
            PointerEvent::DragMove(position) => {
                if let Mode::Dragging { node, .. } = self.mode {
                    commands.push(Command::MovePin(node, position));
                }
            }
            PointerEvent::DragEnd => self.drag_end(&mut commands),
        }
        commands
    }

    fn hover_enter(&mut self, id: NodeId, commands: &mut Vec<Command>) {
        if self.hovered == Some(id) {
            return;
        }
        self.hover_leave(commands);
        self.hovered = Some(id);

        if self.selected() != Some(id) && self.dragging() != Some(id) {
            commands.push(Command::Emphasize(id, Emphasis::Hover));
        }
    }

    fn hover_leave(&mut self, commands: &mut Vec<Command>) {
        let Some(previous) = self.hovered.take() else {
            return;
        };
        if self.selected() != Some(previous) && self.dragging() != Some(previous) {
            commands.push(Command::Emphasize(previous, Emphasis::None));
        }
    }

    fn click(&mut self, id: NodeId, commands: &mut Vec<Command>) {
        match self.mode {
            Mode::Dragging { .. } => {}
            Mode::Selected(current) if current == id => {
                self.pending_navigation = Some(id);
                commands.push(Command::ScheduleNavigation(id));
            }
            Mode::Selected(previous) => {
                self.cancel_navigation(commands);
                commands.push(Command::ResetVisual(previous));
                self.select(id, commands);
            }
            Mode::Idle => self.select(id, commands),
        }
    }

    fn select(&mut self, id: NodeId, commands: &mut Vec<Command>) {
        self.mode = Mode::Selected(id);
        commands.push(Command::Emphasize(id, Emphasis::Selected));
    }

    fn cancel_navigation(&mut self, commands: &mut Vec<Command>) {
        if self.pending_navigation.take().is_some() {
            commands.push(Command::CancelNavigation);
        }
    }

    fn drag_start(&mut self, id: NodeId, commands: &mut Vec<Command>) {
        if self.is_dragging() {
            self.drag_end(commands);
        }

        self.cancel_navigation(commands);
        let resume = self.selected();
        self.mode = Mode::Dragging { node: id, resume };
        commands.extend([Command::Pin(id), Command::Reheat, Command::RestartRepulsion]);
    }

    fn drag_end(&mut self, commands: &mut Vec<Command>) {
        let Mode::Dragging { node, resume } = self.mode else {
            return;
        };

        commands.extend([
            Command::Unpin(node),
            Command::PersistPosition(node),
            Command::Cool,
            Command::RestartRepulsion,
        ]);
        self.mode = resume.map_or(Mode::Idle, Mode::Selected);

        if self.selected() != Some(node) {
            let emphasis = if self.hovered == Some(node) {
                Emphasis::Hover
            } else {
                Emphasis::None
            };
            commands.push(Command::Emphasize(node, emphasis));
        }
    }

    /// Drops every reference to a node that no longer exists.
    pub fn forget(&mut self, id: NodeId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.pending_navigation == Some(id) {
            self.pending_navigation = None;
        }

        self.mode = match self.mode {
            Mode::Selected(current) if current == id => Mode::Idle,
            Mode::Dragging { node, resume } if node == id => {
                resume.filter(|resume| *resume != id).map_or(Mode::Idle, Mode::Selected)
            }
            Mode::Dragging { node, resume: Some(resume) } if resume == id => Mode::Dragging {
                node,
                resume: None,
            },
            other => other,
        };
    }
}
