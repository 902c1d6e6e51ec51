use tracing::{debug, trace, warn};

use crate::actor::reactor::{FrameSink, Reactor};
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::{Point, Rect};

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_window_created<S: FrameSink>(
        reactor: &mut Reactor<S>,
        wid: WindowId,
        app: &str,
        frame: Option<Rect>,
    ) {
        if reactor.layout.workspace_for_window(wid).is_some() {
            debug!(%wid, "Received WindowCreated for known window - ignoring");
            return;
        }
        let Some(focused) = reactor.context.focused_monitor else {
            warn!(%wid, "window created with no monitor connected - ignoring");
            return;
        };
        let rule = reactor.config.rule_for(app).cloned();
        let ws = match rule.as_ref().and_then(|r| r.workspace.as_deref()) {
            Some(name) => reactor.layout.workspace_named(name),
            None => reactor.layout.active_workspace(focused),
        };
        if rule.as_ref().is_some_and(|r| r.floating) {
            reactor.layout.add_floating(wid, ws, frame);
        } else {
            reactor.layout.add_tiled(wid, ws, None);
        }
        trace!(%wid, app, ?rule, "window added");
        if reactor.layout.workspaces().is_visible(ws) {
            let response = reactor.layout.focus_window(wid, focused);
            reactor.handle_layout_response(response);
        }
    }

    pub fn handle_window_closed<S: FrameSink>(reactor: &mut Reactor<S>, wid: WindowId) {
        if reactor.layout.remove_window(wid).is_none() {
            debug!(%wid, "Received WindowClosed for unknown window - ignoring");
        }
        reactor.forget_frame(wid);
    }

    pub fn handle_window_moved<S: FrameSink>(reactor: &mut Reactor<S>, wid: WindowId, point: Point) {
        if !reactor.context.enabled {
            reactor.forget_frame(wid);
            return;
        }
        let response = reactor.layout.window_moved(wid, point);
        reactor.handle_layout_response(response);
        // The window is wherever it was dropped; send it its frame again.
        reactor.forget_frame(wid);
    }

    pub fn handle_window_focused<S: FrameSink>(reactor: &mut Reactor<S>, wid: WindowId) {
        let Some(focused) = reactor.context.focused_monitor else {
            return;
        };
        let response = reactor.layout.focus_window(wid, focused);
        reactor.handle_layout_response(response);
    }

    pub fn handle_mouse_down<S: FrameSink>(reactor: &mut Reactor<S>, point: Point) {
        let Some(monitor) = reactor.layout.monitor_at(point) else {
            return;
        };
        reactor.context.focused_monitor = Some(monitor);
        if let Some(wid) = reactor.layout.window_at(point) {
            let response = reactor.layout.focus_window(wid, monitor);
            reactor.handle_layout_response(response);
        }
    }

    pub fn handle_app_terminated<S: FrameSink>(reactor: &mut Reactor<S>, pid: pid_t) {
        let removed = reactor.layout.remove_windows_for_app(pid);
        debug!(pid, count = removed.len(), "app terminated");
        for wid in removed {
            reactor.forget_frame(wid);
        }
    }
}
