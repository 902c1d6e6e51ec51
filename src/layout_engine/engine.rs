use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use super::floating::default_floating_frame;
use super::layout::{calculate_layout, node_rect};
use super::utils::compute_tiling_area;
use crate::common::config::Settings;
use crate::layout_engine::{Direction, LayoutKind, Orientation, ResizeDimension, ResizeValue};
use crate::model::monitor::{MonitorId, MonitorRegistry, MonitorTarget};
use crate::model::tree::MoveOutcome;
use crate::model::window::{WindowId, pid_t};
use crate::model::workspace::{WorkspaceId, WorkspaceManager};
use crate::sys::geometry::{Point, Rect};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    SwitchWorkspace(String),
    NextWorkspace,
    PrevWorkspace,
    MoveWindowToWorkspace(String),
    MoveWorkspaceToMonitor(MonitorTarget),

    MoveWindow(Direction),
    MoveWindowToMonitor(MonitorTarget),
    MoveFocus(Direction),
    FocusMonitor(MonitorTarget),

    Resize {
        #[serde(default)]
        dimension: ResizeDimension,
        amount: ResizeValue,
    },
    Split(Orientation),
    Join(Direction),
    ToggleOrientation,
    ToggleStack,
    Rebalance,
    ToggleFloating,
}

/// What the caller should do about focus after the engine handled something.
#[must_use]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventResponse {
    pub focus_monitor: Option<MonitorId>,
    pub focus_window: Option<WindowId>,
}

impl EventResponse {
    fn window(wid: WindowId) -> Self {
        Self { focus_window: Some(wid), ..Self::default() }
    }

    fn monitor(monitor: MonitorId) -> Self {
        Self { focus_monitor: Some(monitor), ..Self::default() }
    }
}

/// Owns the monitors and workspaces and turns them into window frames.
#[derive(Debug)]
pub struct LayoutEngine {
    monitors: MonitorRegistry,
    workspaces: WorkspaceManager,
    settings: Settings,
}

impl LayoutEngine {
    pub fn new(settings: Settings, persistent: &[String]) -> Self {
        Self {
            monitors: MonitorRegistry::new(),
            workspaces: WorkspaceManager::new(persistent),
            settings,
        }
    }

    pub fn monitors(&self) -> &MonitorRegistry { &self.monitors }

    pub fn workspaces(&self) -> &WorkspaceManager { &self.workspaces }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn set_settings(&mut self, settings: Settings) { self.settings = settings; }

    pub fn add_monitor(&mut self, rect: Rect) -> MonitorId {
        let id = self.monitors.add(rect);
        self.workspaces.active_workspace(id);
        id
    }

    /// Unregisters a monitor. Its workspace becomes hidden and workspaces
    /// homed there move to the nearest remaining monitor. Returns false for an
    /// unknown monitor.
    pub fn remove_monitor(&mut self, id: MonitorId) -> bool {
        let Some(removed) = self.monitors.remove(id) else {
            return false;
        };
        self.workspaces.monitor_removed(id, removed.rect, &self.monitors);
        self.workspaces.ensure_monitors(&self.monitors);
        true
    }

    /// Replaces a monitor's frame. Floating windows of every workspace laid
    /// out against it move by the change in origin.
    pub fn update_monitor(&mut self, id: MonitorId, rect: Rect) -> bool {
        let Some(old) = self.monitor_rect(id) else {
            return false;
        };
        let affected: Vec<WorkspaceId> = self
            .workspaces
            .iter()
            .map(|(ws, _)| ws)
            .filter(|&ws| self.layout_monitor(ws) == Some(id))
            .collect();
        if !self.monitors.update(id, rect) {
            return false;
        }
        let delta = rect.origin() - old.origin();
        for ws in affected {
            self.workspaces.translate_floating(ws, delta);
        }
        true
    }

    /// The monitor whose centre is closest to `point`.
    pub fn nearest_monitor(&self, point: Point) -> Option<MonitorId> {
        self.monitors.nearest_by_center(point).map(|m| m.id)
    }

    pub fn active_workspace(&mut self, monitor: MonitorId) -> WorkspaceId {
        self.workspaces.active_workspace(monitor)
    }

    pub fn workspace_named(&mut self, name: &str) -> WorkspaceId { self.workspaces.ensure(name) }

    pub fn focused_window(&self, monitor: MonitorId) -> Option<WindowId> {
        let ws = self.workspaces.active_on(monitor)?;
        self.workspaces.get(ws)?.last_focused()
    }

    pub fn workspace_for_window(&self, wid: WindowId) -> Option<WorkspaceId> {
        self.workspaces.workspace_for_window(wid)
    }

    pub fn is_floating(&self, wid: WindowId) -> bool {
        self.workspace_for_window(wid)
            .and_then(|ws| self.workspaces.get(ws))
            .is_some_and(|ws| ws.is_floating(wid))
    }

    fn monitor_rect(&self, monitor: MonitorId) -> Option<Rect> {
        self.monitors.get(monitor).map(|m| m.rect)
    }

    /// The monitor a workspace is laid out against: where it is shown, else
    /// its home, else the first monitor.
    fn layout_monitor(&self, ws: WorkspaceId) -> Option<MonitorId> {
        self.workspaces
            .monitor_of(ws)
            .or_else(|| self.workspaces.get(ws)?.home().filter(|&m| self.monitors.contains(m)))
            .or_else(|| self.monitors.ids().next())
    }

    fn tiling_area(&self, ws: WorkspaceId) -> Option<Rect> {
        let rect = self.monitor_rect(self.layout_monitor(ws)?)?;
        Some(compute_tiling_area(rect, &self.settings.layout.gaps))
    }

    fn new_container_layout(&self, ws: WorkspaceId) -> LayoutKind {
        let pending = self.workspaces.get(ws).and_then(|w| w.pending_orientation());
        let orientation = pending.unwrap_or_else(|| match self.tiling_area(ws) {
            Some(area) => self.settings.default_orientation.resolve(area.width(), area.height()),
            None => Orientation::Horizontal,
        });
        LayoutKind::from(orientation)
    }

    /// Tiles `wid` into `ws` after `anchor` (or the workspace's focused window).
    pub fn add_tiled(&mut self, wid: WindowId, ws: WorkspaceId, anchor: Option<WindowId>) {
        let layout = self.new_container_layout(ws);
        let Some(workspace) = self.workspaces.get_mut(ws) else {
            return;
        };
        let anchor = anchor.or(workspace.last_focused()).filter(|a| workspace.tree.contains_window(*a));
        let joins_lone_leaf = workspace.tree.window_count() == 1;
        workspace.tree.insert_after(anchor, wid, layout);
        if joins_lone_leaf {
            workspace.set_pending_orientation(None);
        }
        self.workspaces.assign_window(wid, ws);
        trace!(%wid, ?ws, "tiled window");
    }

    /// Floats `wid` in `ws`. Without a frame it is centred on the workspace's
    /// monitor at half its size.
    pub fn add_floating(&mut self, wid: WindowId, ws: WorkspaceId, frame: Option<Rect>) {
        let frame = frame
            .or_else(|| self.tiling_area(ws).map(default_floating_frame))
            .unwrap_or_default();
        if let Some(workspace) = self.workspaces.get_mut(ws) {
            workspace.floating.add(wid, frame);
            self.workspaces.assign_window(wid, ws);
            trace!(%wid, ?ws, ?frame, "floating window");
        }
    }

    pub fn remove_window(&mut self, wid: WindowId) -> Option<WorkspaceId> {
        self.workspaces.remove_window(wid)
    }

    pub fn remove_windows_for_app(&mut self, pid: pid_t) -> Vec<WindowId> {
        self.workspaces.remove_windows_for_app(pid)
    }

    pub fn gc(&mut self) -> Vec<String> { self.workspaces.gc() }

    /// Records `wid` as its workspace's focused window and brings that
    /// workspace forward: shown workspaces hand focus to their monitor, hidden
    /// ones are switched onto `fallback`.
    pub fn focus_window(&mut self, wid: WindowId, fallback: MonitorId) -> EventResponse {
        let Some(ws) = self.workspaces.workspace_for_window(wid) else {
            return EventResponse::default();
        };
        if let Some(workspace) = self.workspaces.get_mut(ws) {
            workspace.set_last_focused(Some(wid));
            workspace.floating.raise(wid);
        }
        let monitor = match self.workspaces.monitor_of(ws) {
            Some(m) => m,
            None => {
                self.show_workspace(ws, fallback);
                fallback
            }
        };
        EventResponse { focus_monitor: Some(monitor), focus_window: Some(wid) }
    }

    /// Shows `ws` on `monitor`, carrying its floating windows over from the
    /// monitor it was last laid out on.
    fn show_workspace(&mut self, ws: WorkspaceId, monitor: MonitorId) -> Option<WorkspaceId> {
        let from = self.layout_monitor(ws).and_then(|m| self.monitor_rect(m));
        let evicted = self.workspaces.switch_to(ws, monitor);
        if let (Some(from), Some(to)) = (from, self.monitor_rect(monitor)) {
            self.workspaces.translate_floating(ws, to.origin() - from.origin());
        }
        evicted
    }

    /// Frames for every window the engine knows about: visible workspaces are
    /// laid out on their monitors, hidden ones are parked in the bottom-right
    /// corner of their home monitor.
    pub fn calculate_frames(&self) -> Vec<(WindowId, Rect)> {
        let mut frames = Vec::new();
        for (ws, workspace) in self.workspaces.iter() {
            let Some(area) = self.tiling_area(ws) else {
                continue;
            };
            let tiled = calculate_layout(
                &workspace.tree,
                area,
                workspace.last_focused(),
                &self.settings.layout,
            );
            if self.workspaces.is_visible(ws) {
                frames.extend(tiled);
                frames.extend(workspace.floating.iter());
            } else {
                let Some(screen) = self.layout_monitor(ws).and_then(|m| self.monitor_rect(m)) else {
                    continue;
                };
                let corner = Point::new(screen.max_x() - 1.0, screen.max_y() - 1.0);
                frames.extend(
                    tiled
                        .into_iter()
                        .chain(workspace.floating.iter())
                        .map(|(wid, frame)| (wid, frame.with_origin(corner))),
                );
            }
        }
        frames
    }

    fn visible_frames(&self, ws: WorkspaceId) -> Vec<(WindowId, Rect)> {
        let (Some(workspace), Some(area)) = (self.workspaces.get(ws), self.tiling_area(ws)) else {
            return Vec::new();
        };
        calculate_layout(&workspace.tree, area, workspace.last_focused(), &self.settings.layout)
    }

    fn tiled_window_at(&self, ws: WorkspaceId, point: Point) -> Option<WindowId> {
        self.visible_frames(ws)
            .into_iter()
            .rev()
            .find(|(_, frame)| frame.contains(point))
            .map(|(wid, _)| wid)
    }

    /// The window under `point`: floating windows of the monitor's workspace
    /// first (topmost wins), then tiled frames (last emitted wins).
    pub fn window_at(&self, point: Point) -> Option<WindowId> {
        if self.monitors.is_empty() {
            return None;
        }
        let monitor = self.monitors.monitor_containing(point).id;
        let ws = self.workspaces.active_on(monitor)?;
        self.workspaces
            .get(ws)?
            .floating
            .topmost_at(point)
            .or_else(|| self.tiled_window_at(ws, point))
    }

    pub fn monitor_at(&self, point: Point) -> Option<MonitorId> {
        if self.monitors.is_empty() {
            return None;
        }
        Some(self.monitors.monitor_containing(point).id)
    }

    /// Takes `wid` out of its workspace, returning the workspace and the
    /// window's floating frame if it was floating.
    fn detach(&mut self, wid: WindowId) -> Option<(WorkspaceId, Option<Rect>)> {
        let ws = self.workspaces.workspace_for_window(wid)?;
        let frame = self.workspaces.get(ws)?.floating.frame(wid);
        self.workspaces.remove_window(wid);
        Some((ws, frame))
    }

    /// Moves `wid` into `target`, keeping it floating or tiled as it was.
    fn transfer(&mut self, wid: WindowId, target: WorkspaceId, anchor: Option<WindowId>) -> bool {
        if self.workspaces.workspace_for_window(wid) == Some(target) {
            return false;
        }
        let from_rect = self
            .workspaces
            .workspace_for_window(wid)
            .and_then(|ws| self.layout_monitor(ws))
            .and_then(|m| self.monitor_rect(m));
        let Some((_, floating)) = self.detach(wid) else {
            return false;
        };
        match floating {
            Some(frame) => {
                let to_rect = self.layout_monitor(target).and_then(|m| self.monitor_rect(m));
                let frame = match (from_rect, to_rect) {
                    (Some(from), Some(to)) => frame.translate(to.origin() - from.origin()),
                    _ => frame,
                };
                self.add_floating(wid, target, Some(frame));
            }
            None => self.add_tiled(wid, target, anchor),
        }
        if let Some(workspace) = self.workspaces.get_mut(target) {
            workspace.set_last_focused(Some(wid));
        }
        true
    }

    /// Drag-and-drop of `wid` to `point`.
    ///
    /// Floating windows take the point as their new origin and join the
    /// workspace under their centre. Tiled windows dropped on another tiled
    /// window of their workspace swap with it; dropped on another monitor they
    /// are inserted after the window under the point.
    #[instrument(skip(self))]
    pub fn window_moved(&mut self, wid: WindowId, point: Point) -> EventResponse {
        let Some(src) = self.workspaces.workspace_for_window(wid) else {
            return EventResponse::default();
        };
        if self.monitors.is_empty() {
            return EventResponse::default();
        }
        if let Some(frame) = self.workspaces.get(src).and_then(|ws| ws.floating.frame(wid)) {
            let moved = frame.with_origin(point);
            let monitor = self.monitors.monitor_containing(moved.center()).id;
            let target = self.workspaces.active_workspace(monitor);
            if target != src {
                self.workspaces.remove_window(wid);
                self.add_floating(wid, target, Some(moved));
            } else if let Some(ws) = self.workspaces.get_mut(src) {
                ws.floating.set_frame(wid, moved);
            }
            return EventResponse { focus_monitor: Some(monitor), focus_window: Some(wid) };
        }

        let monitor = self.monitors.monitor_containing(point).id;
        let target = self.workspaces.active_workspace(monitor);
        let under = self.tiled_window_at(target, point).filter(|&w| w != wid);
        if target == src {
            match under {
                Some(other) => {
                    debug!(%wid, %other, "swapping dragged window");
                    if let Some(ws) = self.workspaces.get_mut(src) {
                        ws.tree.swap_windows(wid, other);
                    }
                }
                None => trace!(%wid, "dropped in place"),
            }
            return EventResponse::window(wid);
        }
        self.transfer(wid, target, under);
        EventResponse { focus_monitor: Some(monitor), focus_window: Some(wid) }
    }

    #[instrument(skip(self))]
    pub fn handle_command(&mut self, focused: MonitorId, command: &LayoutCommand) -> EventResponse {
        let ws = self.workspaces.active_workspace(focused);
        let window = self.workspaces.get(ws).and_then(|w| w.last_focused());
        match command {
            LayoutCommand::SwitchWorkspace(name) => {
                let target = self.workspaces.ensure(name);
                self.switch_workspace(target, focused)
            }
            LayoutCommand::NextWorkspace => match self.workspaces.next(ws) {
                Some(target) => self.switch_workspace(target, focused),
                None => EventResponse::default(),
            },
            LayoutCommand::PrevWorkspace => match self.workspaces.prev(ws) {
                Some(target) => self.switch_workspace(target, focused),
                None => EventResponse::default(),
            },
            LayoutCommand::MoveWindowToWorkspace(name) => {
                let Some(wid) = window else {
                    return EventResponse::default();
                };
                let target = self.workspaces.ensure(name);
                self.transfer(wid, target, None);
                EventResponse::default()
            }
            LayoutCommand::MoveWorkspaceToMonitor(target) => {
                let Some(monitor) = self.monitors.resolve(focused, *target) else {
                    return EventResponse::default();
                };
                if monitor == focused {
                    return EventResponse::default();
                }
                self.show_workspace(ws, monitor);
                EventResponse::monitor(monitor)
            }
            LayoutCommand::MoveWindow(direction) => {
                let Some(wid) = window else {
                    return EventResponse::default();
                };
                self.move_window(ws, wid, focused, *direction)
            }
            LayoutCommand::MoveWindowToMonitor(target) => {
                let Some(wid) = window else {
                    return EventResponse::default();
                };
                let Some(monitor) = self.monitors.resolve(focused, *target) else {
                    return EventResponse::default();
                };
                let target_ws = self.workspaces.active_workspace(monitor);
                if !self.transfer(wid, target_ws, None) {
                    return EventResponse::default();
                }
                EventResponse { focus_monitor: Some(monitor), focus_window: Some(wid) }
            }
            LayoutCommand::MoveFocus(direction) => self.move_focus(focused, window, *direction),
            LayoutCommand::FocusMonitor(target) => match self.monitors.resolve(focused, *target) {
                Some(monitor) => EventResponse {
                    focus_monitor: Some(monitor),
                    focus_window: self.focused_window(monitor),
                },
                None => EventResponse::default(),
            },
            LayoutCommand::Resize { dimension, amount } => {
                if let Some(wid) = window {
                    self.resize(ws, wid, *dimension, *amount);
                }
                EventResponse::default()
            }
            LayoutCommand::Split(orientation) => {
                if let Some(wid) = window {
                    self.split(ws, wid, *orientation);
                }
                EventResponse::default()
            }
            LayoutCommand::Join(direction) => {
                if let (Some(wid), Some(workspace)) = (window, self.workspaces.get_mut(ws)) {
                    workspace.tree.join(wid, *direction);
                }
                EventResponse::default()
            }
            LayoutCommand::ToggleOrientation => {
                self.update_parent_layout(ws, window, LayoutKind::toggled_orientation);
                EventResponse::default()
            }
            LayoutCommand::ToggleStack => {
                self.update_parent_layout(ws, window, |kind| {
                    if kind.is_stacked() {
                        LayoutKind::from(kind.orientation())
                    } else {
                        LayoutKind::stacked(kind.orientation())
                    }
                });
                EventResponse::default()
            }
            LayoutCommand::Rebalance => {
                if let Some(workspace) = self.workspaces.get_mut(ws) {
                    workspace.tree.rebalance_all();
                }
                EventResponse::default()
            }
            LayoutCommand::ToggleFloating => match window {
                Some(wid) => self.toggle_floating(ws, wid),
                None => EventResponse::default(),
            },
        }
    }

    fn switch_workspace(&mut self, target: WorkspaceId, focused: MonitorId) -> EventResponse {
        if let Some(monitor) = self.workspaces.monitor_of(target) {
            // Already on screen somewhere: go there instead of stealing it.
            return EventResponse {
                focus_monitor: Some(monitor),
                focus_window: self.focused_window(monitor),
            };
        }
        self.show_workspace(target, focused);
        let removed = self.workspaces.gc();
        if !removed.is_empty() {
            debug!(?removed, "dropped empty workspaces");
        }
        EventResponse {
            focus_monitor: Some(focused),
            focus_window: self.focused_window(focused),
        }
    }

    fn move_window(
        &mut self,
        ws: WorkspaceId,
        wid: WindowId,
        focused: MonitorId,
        direction: Direction,
    ) -> EventResponse {
        let Some(workspace) = self.workspaces.get_mut(ws) else {
            return EventResponse::default();
        };
        if workspace.is_floating(wid) {
            trace!(%wid, "move of floating window ignored");
            return EventResponse::default();
        }
        match workspace.tree.move_window(wid, direction) {
            MoveOutcome::Moved => EventResponse::window(wid),
            MoveOutcome::NotFound => EventResponse::default(),
            MoveOutcome::AtEdge => {
                let Some(monitor) = self.monitors.neighbor(focused, direction) else {
                    return EventResponse::default();
                };
                let target = self.workspaces.active_workspace(monitor);
                self.transfer(wid, target, None);
                EventResponse { focus_monitor: Some(monitor), focus_window: Some(wid) }
            }
        }
    }

    /// Focuses the nearest visible window whose centre lies beyond the
    /// focused window's centre in `direction`, on any monitor.
    fn move_focus(
        &self,
        focused: MonitorId,
        window: Option<WindowId>,
        direction: Direction,
    ) -> EventResponse {
        let mut candidates = Vec::new();
        for monitor in self.monitors.ids() {
            let Some(ws) = self.workspaces.active_on(monitor) else {
                continue;
            };
            candidates.extend(self.visible_frames(ws).into_iter().map(|(w, r)| (w, r, monitor)));
            if let Some(workspace) = self.workspaces.get(ws) {
                candidates.extend(workspace.floating.iter().map(|(w, r)| (w, r, monitor)));
            }
        }
        let origin = match window.and_then(|w| candidates.iter().find(|(c, ..)| *c == w)) {
            Some((_, frame, _)) => frame.center(),
            None => match self.monitor_rect(focused) {
                Some(rect) => rect.center(),
                None => return EventResponse::default(),
            },
        };
        let axis = direction.orientation();
        let sign = if direction.is_forward() { 1.0 } else { -1.0 };
        candidates
            .into_iter()
            .filter(|(w, ..)| Some(*w) != window)
            .filter(|(_, frame, _)| {
                (frame.center().coordinate(axis) - origin.coordinate(axis)) * sign > 0.0
            })
            .min_by(|a, b| {
                a.1.center()
                    .distance_squared_to(origin)
                    .total_cmp(&b.1.center().distance_squared_to(origin))
            })
            .map(|(wid, _, monitor)| EventResponse {
                focus_monitor: Some(monitor),
                focus_window: Some(wid),
            })
            .unwrap_or_default()
    }

    fn resize(
        &mut self,
        ws: WorkspaceId,
        wid: WindowId,
        dimension: ResizeDimension,
        amount: ResizeValue,
    ) -> bool {
        let Some(area) = self.tiling_area(ws) else {
            return false;
        };
        let min_share = self.settings.min_share;
        let layout_settings = &self.settings.layout;
        let Some(workspace) = self.workspaces.get_mut(ws) else {
            return false;
        };
        if workspace.is_floating(wid) {
            trace!(%wid, "resize of floating window ignored");
            return false;
        }
        let focused = workspace.last_focused();
        let tree = &workspace.tree;
        let Some(node) = tree.resize_target(wid, dimension.orientation()) else {
            return false;
        };
        let Some(parent) = tree.parent(node) else {
            return false;
        };
        let Some(axis) = tree.layout(parent).map(|k| k.orientation()) else {
            return false;
        };
        let extent = node_rect(tree, parent, area, focused, layout_settings)
            .map(|r| r.extent(axis))
            .unwrap_or(0.0);
        let resized = workspace.tree.resize(node, amount.fraction_of(extent), min_share);
        trace!(%wid, %amount, resized, "resize");
        resized
    }

    fn split(&mut self, ws: WorkspaceId, wid: WindowId, orientation: Orientation) {
        let Some(workspace) = self.workspaces.get_mut(ws) else {
            return;
        };
        if workspace.is_floating(wid) {
            return;
        }
        match workspace.tree.parent_of_window(wid) {
            Some(parent) => {
                let stacked = workspace.tree.layout(parent).is_some_and(LayoutKind::is_stacked);
                let kind = if stacked {
                    LayoutKind::stacked(orientation)
                } else {
                    LayoutKind::from(orientation)
                };
                workspace.tree.set_layout(parent, kind);
            }
            None => workspace.set_pending_orientation(Some(orientation)),
        }
    }

    fn update_parent_layout(
        &mut self,
        ws: WorkspaceId,
        window: Option<WindowId>,
        f: impl FnOnce(LayoutKind) -> LayoutKind,
    ) {
        let (Some(wid), Some(workspace)) = (window, self.workspaces.get_mut(ws)) else {
            return;
        };
        let Some(parent) = workspace.tree.parent_of_window(wid) else {
            return;
        };
        if let Some(kind) = workspace.tree.layout(parent) {
            workspace.tree.set_layout(parent, f(kind));
        }
    }

    fn toggle_floating(&mut self, ws: WorkspaceId, wid: WindowId) -> EventResponse {
        let floating = self.workspaces.get(ws).is_some_and(|w| w.is_floating(wid));
        if floating {
            let layout = self.new_container_layout(ws);
            let Some(workspace) = self.workspaces.get_mut(ws) else {
                return EventResponse::default();
            };
            workspace.floating.remove(wid);
            let joins_lone_leaf = workspace.tree.window_count() == 1;
            workspace.tree.insert_after(None, wid, layout);
            if joins_lone_leaf {
                workspace.set_pending_orientation(None);
            }
        } else {
            let frame = self
                .visible_frames(ws)
                .into_iter()
                .find(|(w, _)| *w == wid)
                .map(|(_, frame)| frame)
                .or_else(|| self.tiling_area(ws).map(default_floating_frame))
                .unwrap_or_default();
            let Some(workspace) = self.workspaces.get_mut(ws) else {
                return EventResponse::default();
            };
            if !workspace.tree.remove_window(wid) {
                return EventResponse::default();
            }
            workspace.floating.add(wid, frame);
        }
        if let Some(workspace) = self.workspaces.get_mut(ws) {
            workspace.set_last_focused(Some(wid));
        }
        EventResponse::window(wid)
    }

    pub fn draw_tree(&self, ws: WorkspaceId) -> String {
        self.workspaces.get(ws).map(|w| w.tree.draw_tree()).unwrap_or_default()
    }

    /// Panics if the model is inconsistent.
    pub fn check_invariants(&self) {
        self.workspaces.check_invariants();
        for id in self.monitors.ids() {
            assert!(
                self.workspaces.active_on(id).is_some(),
                "monitor {id} has no active workspace"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn w(idx: u32) -> WindowId { WindowId::new(1, idx) }

    fn rect(x: f64, y: f64, wd: f64, h: f64) -> Rect { Rect::new(x, y, wd, h).unwrap() }

    /// Two 1000x800 monitors side by side, "1" on the left and "2" on the right.
    fn engine() -> (LayoutEngine, MonitorId, MonitorId) {
        let mut engine = LayoutEngine::new(Settings::default(), &[]);
        let a = engine.add_monitor(rect(0.0, 0.0, 1000.0, 800.0));
        let b = engine.add_monitor(rect(1000.0, 0.0, 1000.0, 800.0));
        (engine, a, b)
    }

    fn open(engine: &mut LayoutEngine, monitor: MonitorId, wid: WindowId) {
        let ws = engine.active_workspace(monitor);
        engine.add_tiled(wid, ws, None);
        let _ = engine.focus_window(wid, monitor);
    }

    fn frame_of(engine: &LayoutEngine, wid: WindowId) -> Rect {
        engine.calculate_frames().into_iter().find(|(w, _)| *w == wid).unwrap().1
    }

    #[test]
    fn tiles_on_monitor_and_parks_hidden_windows() {
        let (mut engine, a, _) = engine();
        open(&mut engine, a, w(1));
        open(&mut engine, a, w(2));
        assert_eq!(frame_of(&engine, w(1)), rect(0.0, 0.0, 500.0, 800.0));
        assert_eq!(frame_of(&engine, w(2)), rect(500.0, 0.0, 500.0, 800.0));

        let _ = engine.handle_command(a, &LayoutCommand::SwitchWorkspace("3".into()));
        let parked = frame_of(&engine, w(1));
        assert_eq!(parked.origin(), Point::new(999.0, 799.0));
        assert_eq!(parked.size(), rect(0.0, 0.0, 500.0, 800.0).size());
        engine.check_invariants();
    }

    #[test]
    fn switch_to_visible_workspace_focuses_its_monitor() {
        let (mut engine, a, b) = engine();
        let resp = engine.handle_command(a, &LayoutCommand::SwitchWorkspace("2".into()));
        assert_eq!(resp.focus_monitor, Some(b));
        assert_eq!(engine.workspaces().name(engine.workspaces().active_on(a).unwrap()), "1");
    }

    #[test]
    fn switching_away_collects_empty_workspace() {
        let (mut engine, a, _) = engine();
        let _ = engine.handle_command(a, &LayoutCommand::SwitchWorkspace("9".into()));
        assert!(engine.workspaces().by_name("1").is_none());
        assert!(engine.workspaces().by_name("9").is_some());
    }

    #[test]
    fn hit_test_prefers_floating() {
        let (mut engine, a, _) = engine();
        open(&mut engine, a, w(1));
        let ws = engine.active_workspace(a);
        engine.add_floating(w(2), ws, Some(rect(100.0, 100.0, 50.0, 50.0)));
        assert_eq!(engine.window_at(Point::new(120.0, 120.0)), Some(w(2)));
        assert_eq!(engine.window_at(Point::new(500.0, 500.0)), Some(w(1)));
        assert_eq!(engine.window_at(Point::new(1500.0, 500.0)), None);
        // Outside every monitor: resolved against the nearest one.
        assert_eq!(engine.window_at(Point::new(-10.0, 500.0)), None);
    }

    #[test]
    fn move_window_at_edge_crosses_monitor() {
        let (mut engine, a, b) = engine();
        open(&mut engine, a, w(1));
        open(&mut engine, a, w(2));
        let resp = engine.handle_command(a, &LayoutCommand::MoveWindow(Direction::Right));
        assert_eq!(resp, EventResponse { focus_monitor: Some(b), focus_window: Some(w(2)) });
        assert_eq!(frame_of(&engine, w(2)), rect(1000.0, 0.0, 1000.0, 800.0));
        assert_eq!(frame_of(&engine, w(1)), rect(0.0, 0.0, 1000.0, 800.0));
        engine.check_invariants();
    }

    #[test]
    fn move_focus_is_geometric_across_monitors() {
        let (mut engine, a, b) = engine();
        open(&mut engine, a, w(1));
        open(&mut engine, a, w(2));
        open(&mut engine, b, w(3));
        let resp = engine.handle_command(a, &LayoutCommand::MoveFocus(Direction::Right));
        assert_eq!(resp, EventResponse { focus_monitor: Some(b), focus_window: Some(w(3)) });
        let resp = engine.handle_command(a, &LayoutCommand::MoveFocus(Direction::Left));
        assert_eq!(resp.focus_window, Some(w(1)));
        let resp = engine.handle_command(a, &LayoutCommand::MoveFocus(Direction::Up));
        assert_eq!(resp, EventResponse::default());
    }

    #[test]
    fn resize_in_pixels_and_floating_noop() {
        let (mut engine, a, _) = engine();
        open(&mut engine, a, w(1));
        open(&mut engine, a, w(2));
        let _ = engine.focus_window(w(1), a);
        let resize = LayoutCommand::Resize {
            dimension: ResizeDimension::Width,
            amount: ResizeValue::Pixels(100.0),
        };
        let _ = engine.handle_command(a, &resize);
        assert_eq!(frame_of(&engine, w(1)), rect(0.0, 0.0, 600.0, 800.0));

        let _ = engine.handle_command(a, &LayoutCommand::ToggleFloating);
        let floating = frame_of(&engine, w(1));
        assert_eq!(floating, rect(0.0, 0.0, 600.0, 800.0));
        let _ = engine.handle_command(a, &resize);
        assert_eq!(frame_of(&engine, w(1)), floating);
        assert_eq!(frame_of(&engine, w(2)), rect(0.0, 0.0, 1000.0, 800.0));
    }

    #[test]
    fn split_on_lone_leaf_sets_pending_orientation() {
        let (mut engine, a, _) = engine();
        open(&mut engine, a, w(1));
        let _ = engine.handle_command(a, &LayoutCommand::Split(Orientation::Vertical));
        open(&mut engine, a, w(2));
        assert_eq!(frame_of(&engine, w(1)), rect(0.0, 0.0, 1000.0, 400.0));
        assert_eq!(frame_of(&engine, w(2)), rect(0.0, 400.0, 1000.0, 400.0));
        let _ = engine.handle_command(a, &LayoutCommand::ToggleOrientation);
        assert_eq!(frame_of(&engine, w(2)), rect(500.0, 0.0, 500.0, 800.0));
    }

    #[test]
    fn floating_windows_follow_workspace_to_other_monitor() {
        let (mut engine, a, b) = engine();
        let ws = engine.active_workspace(a);
        engine.add_floating(w(1), ws, None);
        assert_eq!(frame_of(&engine, w(1)), rect(250.0, 200.0, 500.0, 400.0));
        let _ = engine.handle_command(a, &LayoutCommand::MoveWorkspaceToMonitor(MonitorTarget::Next));
        assert_eq!(engine.workspaces().active_on(b), Some(ws));
        assert_eq!(frame_of(&engine, w(1)), rect(1250.0, 200.0, 500.0, 400.0));
        engine.check_invariants();
    }

    #[test]
    fn floating_windows_follow_a_moved_monitor() {
        let (mut engine, a, b) = engine();
        let ws_a = engine.active_workspace(a);
        let ws_b = engine.active_workspace(b);
        engine.add_floating(w(1), ws_a, Some(rect(10.0, 10.0, 100.0, 100.0)));
        engine.add_floating(w(2), ws_b, Some(rect(1010.0, 10.0, 100.0, 100.0)));

        assert!(engine.update_monitor(b, rect(-1000.0, 200.0, 1000.0, 800.0)));
        assert_eq!(frame_of(&engine, w(2)), rect(-990.0, 210.0, 100.0, 100.0));
        assert_eq!(frame_of(&engine, w(1)), rect(10.0, 10.0, 100.0, 100.0));
        assert_eq!(engine.monitors().ids().collect::<Vec<_>>(), vec![b, a]);

        assert!(!engine.update_monitor(MonitorId::new(9), rect(0.0, 0.0, 10.0, 10.0)));
        engine.check_invariants();
    }

    #[test]
    fn drag_swaps_within_workspace_and_moves_across() {
        let (mut engine, a, b) = engine();
        open(&mut engine, a, w(1));
        open(&mut engine, a, w(2));
        open(&mut engine, b, w(3));
        let _ = engine.window_moved(w(1), Point::new(700.0, 300.0));
        assert_eq!(frame_of(&engine, w(1)), rect(500.0, 0.0, 500.0, 800.0));

        let resp = engine.window_moved(w(1), Point::new(1200.0, 300.0));
        assert_eq!(resp.focus_monitor, Some(b));
        assert_eq!(frame_of(&engine, w(3)), rect(1000.0, 0.0, 500.0, 800.0));
        assert_eq!(frame_of(&engine, w(1)), rect(1500.0, 0.0, 500.0, 800.0));
        assert_eq!(frame_of(&engine, w(2)), rect(0.0, 0.0, 1000.0, 800.0));
        engine.check_invariants();
    }

    #[test]
    fn dragged_floating_window_changes_workspace() {
        let (mut engine, a, b) = engine();
        let ws_a = engine.active_workspace(a);
        engine.add_floating(w(1), ws_a, Some(rect(10.0, 10.0, 100.0, 100.0)));
        let _ = engine.window_moved(w(1), Point::new(1400.0, 20.0));
        assert_eq!(engine.workspace_for_window(w(1)), engine.workspaces().active_on(b));
        assert_eq!(frame_of(&engine, w(1)), rect(1400.0, 20.0, 100.0, 100.0));
    }

    #[test]
    fn monitor_removal_hides_and_rehomes() {
        let (mut engine, a, b) = engine();
        open(&mut engine, b, w(1));
        assert!(engine.remove_monitor(b));
        assert!(!engine.remove_monitor(b));
        let ws = engine.workspace_for_window(w(1)).unwrap();
        assert!(!engine.workspaces().is_visible(ws));
        assert_eq!(frame_of(&engine, w(1)).origin(), Point::new(999.0, 799.0));
        let _ = engine.handle_command(a, &LayoutCommand::SwitchWorkspace("2".into()));
        assert_eq!(frame_of(&engine, w(1)), rect(0.0, 0.0, 1000.0, 800.0));
        engine.check_invariants();
    }

    #[test]
    fn command_names_deserialize() {
        let cmd: LayoutCommand =
            serde_json::from_str(r#"{"resize":{"dimension":"width","amount":"-10%"}}"#).unwrap();
        assert_eq!(
            cmd,
            LayoutCommand::Resize {
                dimension: ResizeDimension::Width,
                amount: ResizeValue::Percent(-0.1),
            }
        );
        let cmd: LayoutCommand =
            serde_json::from_str(r#"{"move_window_to_monitor":{"direction":"left"}}"#).unwrap();
        assert_eq!(cmd, LayoutCommand::MoveWindowToMonitor(MonitorTarget::Direction(Direction::Left)));
        let cmd: LayoutCommand = serde_json::from_str(r#""toggle_floating""#).unwrap();
        assert_eq!(cmd, LayoutCommand::ToggleFloating);
    }
}
