use std::cmp::Ordering;

use slotmap::{SlotMap, new_key_type};
use tracing::{debug, trace};

use crate::common::collections::{HashMap, HashSet};
use crate::layout_engine::{FloatingManager, Orientation};
use crate::model::monitor::{MonitorId, MonitorRegistry};
use crate::model::tree::LayoutTree;
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::{Point, Rect};

new_key_type! {
    pub struct WorkspaceId;
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub name: String,
    home: Option<MonitorId>,
    pub tree: LayoutTree,
    pub floating: FloatingManager,
    last_focused: Option<WindowId>,
    /// Orientation requested with `split` while the tree held a single leaf;
    /// used for the root container once a second window arrives.
    pending_orientation: Option<Orientation>,
}

impl Workspace {
    fn new(name: String) -> Self {
        Self {
            name,
            home: None,
            tree: LayoutTree::new(),
            floating: FloatingManager::new(),
            last_focused: None,
            pending_orientation: None,
        }
    }

    pub fn home(&self) -> Option<MonitorId> { self.home }

    pub fn contains_window(&self, wid: WindowId) -> bool {
        self.tree.contains_window(wid) || self.floating.contains(wid)
    }

    pub fn is_floating(&self, wid: WindowId) -> bool { self.floating.contains(wid) }

    /// Tiled windows in tree order, then floating windows bottom to top.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = self.tree.windows();
        out.extend(self.floating.windows());
        out
    }

    pub fn is_empty(&self) -> bool { self.tree.is_empty() && self.floating.is_empty() }

    pub fn last_focused(&self) -> Option<WindowId> { self.last_focused }

    pub fn set_last_focused(&mut self, wid: Option<WindowId>) { self.last_focused = wid; }

    pub fn pending_orientation(&self) -> Option<Orientation> { self.pending_orientation }

    pub fn set_pending_orientation(&mut self, orientation: Option<Orientation>) {
        self.pending_orientation = orientation;
    }

    fn forget_window(&mut self, wid: WindowId) -> bool {
        let removed = self.tree.remove_window(wid) | self.floating.remove(wid).is_some();
        if self.last_focused == Some(wid) {
            self.last_focused = self.tree.windows().last().copied().or_else(|| self.floating.windows().last());
        }
        removed
    }
}

/// Orders workspace names so that numeric names sort numerically and before
/// everything else.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[derive(Debug, Default)]
pub struct WorkspaceManager {
    workspaces: SlotMap<WorkspaceId, Workspace>,
    by_name: HashMap<String, WorkspaceId>,
    active_per_monitor: HashMap<MonitorId, WorkspaceId>,
    window_to_workspace: HashMap<WindowId, WorkspaceId>,
    persistent: HashSet<String>,
}

impl WorkspaceManager {
    pub fn new(persistent: &[String]) -> Self {
        let mut manager = Self::default();
        for name in persistent {
            manager.persistent.insert(name.clone());
            manager.ensure(name);
        }
        manager
    }

    fn create(&mut self, name: String) -> WorkspaceId {
        assert!(
            !self.by_name.contains_key(&name),
            "workspace name {name:?} already exists"
        );
        let id = self.workspaces.insert(Workspace::new(name.clone()));
        self.by_name.insert(name, id);
        debug!(?id, name = %self.workspaces[id].name, "workspace created");
        id
    }

    /// Returns the workspace called `name`, creating it on first reference.
    pub fn ensure(&mut self, name: &str) -> WorkspaceId {
        match self.by_name.get(name) {
            Some(&id) => id,
            None => self.create(name.to_string()),
        }
    }

    pub fn by_name(&self, name: &str) -> Option<WorkspaceId> { self.by_name.get(name).copied() }

    pub fn get(&self, id: WorkspaceId) -> Option<&Workspace> { self.workspaces.get(id) }

    pub fn get_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> { self.workspaces.get_mut(id) }

    pub fn name(&self, id: WorkspaceId) -> &str { &self.workspaces[id].name }

    pub fn iter(&self) -> impl Iterator<Item = (WorkspaceId, &Workspace)> { self.workspaces.iter() }

    pub fn len(&self) -> usize { self.workspaces.len() }

    pub fn is_empty(&self) -> bool { self.workspaces.is_empty() }

    /// The workspace currently shown on `monitor`, without creating one.
    pub fn active_on(&self, monitor: MonitorId) -> Option<WorkspaceId> {
        self.active_per_monitor.get(&monitor).copied()
    }

    /// The monitor `id` is shown on, if it is visible.
    pub fn monitor_of(&self, id: WorkspaceId) -> Option<MonitorId> {
        self.active_per_monitor.iter().find(|(_, ws)| **ws == id).map(|(m, _)| *m)
    }

    pub fn is_visible(&self, id: WorkspaceId) -> bool { self.monitor_of(id).is_some() }

    /// The workspace shown on `monitor`. A monitor without one gets one
    /// assigned: a hidden workspace homed there, otherwise a hidden workspace
    /// without a home, otherwise a new one named after the smallest unused
    /// positive integer.
    pub fn active_workspace(&mut self, monitor: MonitorId) -> WorkspaceId {
        if let Some(id) = self.active_on(monitor) {
            return id;
        }
        let id = self.pick_for(monitor);
        self.workspaces[id].home = Some(monitor);
        self.active_per_monitor.insert(monitor, id);
        debug!(%monitor, workspace = %self.workspaces[id].name, "assigned workspace to monitor");
        id
    }

    fn pick_for(&mut self, monitor: MonitorId) -> WorkspaceId {
        let visible: HashSet<WorkspaceId> = self.active_per_monitor.values().copied().collect();
        let hidden = |home: Option<MonitorId>| {
            let mut candidates: Vec<_> = self
                .workspaces
                .iter()
                .filter(|(id, ws)| !visible.contains(id) && ws.home == home)
                .map(|(id, ws)| (id, ws.name.as_str()))
                .collect();
            candidates.sort_by(|a, b| natural_cmp(a.1, b.1));
            candidates.first().map(|(id, _)| *id)
        };
        if let Some(id) = hidden(Some(monitor)).or_else(|| hidden(None)) {
            return id;
        }
        let name = (1u64..)
            .map(|n| n.to_string())
            .find(|name| !self.by_name.contains_key(name))
            .unwrap_or_default();
        self.create(name)
    }

    /// Shows `id` on `monitor` and returns the workspace it replaced there.
    ///
    /// The replaced workspace keeps its tree and becomes hidden. If `id` was
    /// visible on another monitor, that monitor gets a replacement right away.
    pub fn switch_to(&mut self, id: WorkspaceId, monitor: MonitorId) -> Option<WorkspaceId> {
        let previous = self.active_on(monitor);
        if previous == Some(id) {
            return None;
        }
        let vacated = self.monitor_of(id);
        if let Some(other) = vacated {
            self.active_per_monitor.remove(&other);
        }
        self.workspaces[id].home = Some(monitor);
        self.active_per_monitor.insert(monitor, id);
        if let Some(other) = vacated {
            self.active_workspace(other);
        }
        trace!(
            workspace = %self.workspaces[id].name,
            %monitor,
            evicted = ?previous.map(|p| self.workspaces[p].name.as_str()),
            "switched workspace"
        );
        previous
    }

    pub fn assign_window(&mut self, wid: WindowId, id: WorkspaceId) {
        if let Some(old) = self.window_to_workspace.insert(wid, id) {
            if old != id {
                self.workspaces[old].forget_window(wid);
            }
        }
    }

    pub fn workspace_for_window(&self, wid: WindowId) -> Option<WorkspaceId> {
        self.window_to_workspace.get(&wid).copied()
    }

    /// Drops the window from its workspace's tree or floating set and from the
    /// membership map.
    pub fn remove_window(&mut self, wid: WindowId) -> Option<WorkspaceId> {
        let id = self.window_to_workspace.remove(&wid)?;
        self.workspaces[id].forget_window(wid);
        Some(id)
    }

    pub fn remove_windows_for_app(&mut self, pid: pid_t) -> Vec<WindowId> {
        let windows: Vec<_> =
            self.window_to_workspace.keys().filter(|wid| wid.pid == pid).copied().collect();
        for &wid in &windows {
            self.remove_window(wid);
        }
        windows
    }

    fn sorted_ids(&self) -> Vec<WorkspaceId> {
        let mut ids: Vec<_> = self.workspaces.keys().collect();
        ids.sort_by(|&a, &b| natural_cmp(&self.workspaces[a].name, &self.workspaces[b].name));
        ids
    }

    pub fn next(&self, current: WorkspaceId) -> Option<WorkspaceId> { self.step(current, true) }

    pub fn prev(&self, current: WorkspaceId) -> Option<WorkspaceId> { self.step(current, false) }

    fn step(&self, current: WorkspaceId, forward: bool) -> Option<WorkspaceId> {
        let ids = self.sorted_ids();
        let pos = ids.iter().position(|&id| id == current)?;
        let len = ids.len();
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        ids.get(next).copied()
    }

    /// Removes hidden, empty workspaces that are not persistent. Returns the
    /// names dropped.
    pub fn gc(&mut self) -> Vec<String> {
        let visible: HashSet<WorkspaceId> = self.active_per_monitor.values().copied().collect();
        let doomed: Vec<WorkspaceId> = self
            .workspaces
            .iter()
            .filter(|(id, ws)| {
                !visible.contains(id) && ws.is_empty() && !self.persistent.contains(&ws.name)
            })
            .map(|(id, _)| id)
            .collect();
        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(ws) = self.workspaces.remove(id) {
                self.by_name.remove(&ws.name);
                removed.push(ws.name);
            }
        }
        if !removed.is_empty() {
            trace!(?removed, "garbage-collected workspaces");
        }
        removed
    }

    /// Handles a monitor disappearing: the workspace it showed becomes hidden
    /// and every workspace homed there moves its home to the remaining monitor
    /// nearest to `old_rect`.
    pub fn monitor_removed(&mut self, monitor: MonitorId, old_rect: Rect, monitors: &MonitorRegistry) {
        self.active_per_monitor.remove(&monitor);
        let new_home = monitors.nearest_by_center(old_rect.center()).map(|m| m.id);
        for (_, ws) in self.workspaces.iter_mut() {
            if ws.home == Some(monitor) {
                ws.home = new_home;
            }
        }
    }

    /// Gives every registered monitor an active workspace.
    pub fn ensure_monitors(&mut self, monitors: &MonitorRegistry) {
        for id in monitors.ids() {
            self.active_workspace(id);
        }
    }

    /// Moves floating windows of `id` along with the workspace when it is
    /// shown on a monitor whose origin differs from `from`'s.
    pub fn translate_floating(&mut self, id: WorkspaceId, delta: Point) {
        if delta != Point::ZERO {
            self.workspaces[id].floating.translate_all(delta);
        }
    }

    /// Panics on a broken invariant: a workspace shown on two monitors, a
    /// window claimed by two workspaces, or a stale name index.
    pub fn check_invariants(&self) {
        let mut shown = HashSet::default();
        for ws in self.active_per_monitor.values() {
            assert!(shown.insert(*ws), "workspace {ws:?} active on two monitors");
            assert!(self.workspaces.contains_key(*ws), "active workspace {ws:?} does not exist");
        }
        assert_eq!(self.by_name.len(), self.workspaces.len(), "workspace name index out of sync");
        let mut owners: HashMap<WindowId, WorkspaceId> = HashMap::default();
        for (id, ws) in &self.workspaces {
            assert_eq!(self.by_name.get(&ws.name), Some(&id));
            ws.tree.check_invariants();
            for wid in ws.windows() {
                if let Some(other) = owners.insert(wid, id) {
                    panic!("window {wid} is in workspaces {other:?} and {id:?}");
                }
                assert_eq!(self.window_to_workspace.get(&wid), Some(&id), "membership of {wid}");
            }
        }
        assert_eq!(owners.len(), self.window_to_workspace.len());
    }
}
