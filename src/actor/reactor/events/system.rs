use tracing::{debug, warn};

use crate::actor::reactor::{FrameSink, Reactor};
use crate::model::monitor::MonitorId;
use crate::sys::geometry::Rect;

pub struct SystemEventHandler;

impl SystemEventHandler {
    pub fn handle_monitor_added<S: FrameSink>(reactor: &mut Reactor<S>, rect: Rect) {
        let id = reactor.layout.add_monitor(rect);
        if reactor.context.focused_monitor.is_none() {
            reactor.context.focused_monitor = Some(id);
        }
    }

    pub fn handle_monitor_removed<S: FrameSink>(reactor: &mut Reactor<S>, id: MonitorId) {
        let Some(monitor) = reactor.layout.monitors().get(id).copied() else {
            debug!(%id, "Received MonitorRemoved for unknown monitor - ignoring");
            return;
        };
        if reactor.layout.monitors().len() == 1 {
            warn!(%id, "refusing to remove the last monitor");
            return;
        }
        reactor.layout.remove_monitor(id);
        if reactor.context.focused_monitor == Some(id) {
            reactor.context.focused_monitor = reactor.layout.nearest_monitor(monitor.rect.center());
        }
    }

    pub fn handle_monitor_changed<S: FrameSink>(reactor: &mut Reactor<S>, id: MonitorId, rect: Rect) {
        if !reactor.layout.update_monitor(id, rect) {
            debug!(%id, "Received MonitorChanged for unknown monitor - ignoring");
        }
    }
}
