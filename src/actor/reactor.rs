//! The Reactor's job is to keep the layout model coherent with what the system
//! reports.
//!
//! It takes events (monitors coming and going, windows opening, closing and
//! being dragged, key presses) on a single control thread, feeds them to the
//! layout engine, pushes changed frames out through a [`FrameSink`], and
//! publishes a [`StatusSnapshot`] for the status tray.

mod error;
mod events;

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

pub use self::error::{FrameError, ReactorError};
use self::events::command::CommandEventHandler;
use self::events::system::SystemEventHandler;
use self::events::window::WindowEventHandler;
use crate::actor;
use crate::common::collections::HashMap;
use crate::common::config::{Config, MAIN_MODE};
use crate::layout_engine::{EventResponse, LayoutCommand, LayoutEngine};
use crate::model::monitor::MonitorId;
use crate::model::published::Published;
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::{Point, Rect};
use crate::ui::menu_bar::{MonitorStatus, StatusSnapshot};

pub type Sender = actor::ThreadSender<Event>;
pub type Receiver = actor::ThreadReceiver<Event>;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A display was connected. Monitors get ids in the order they are added,
    /// starting from 0.
    MonitorAdded { rect: Rect },
    MonitorRemoved(MonitorId),
    /// A display changed resolution or position.
    MonitorChanged { id: MonitorId, rect: Rect },

    /// A window appeared. `app` is the owning application's name, which
    /// window rules are matched against.
    WindowCreated {
        wid: WindowId,
        app: String,
        #[serde(default)]
        frame: Option<Rect>,
    },
    WindowClosed(WindowId),
    /// The user dragged a window; `point` is where it was dropped.
    WindowMoved { wid: WindowId, point: Point },
    /// The system moved focus to a window.
    WindowFocused(WindowId),
    /// The primary mouse button went down at `point`.
    MouseDown(Point),
    AppTerminated(pid_t),

    Hotkey(String),
    Command(WmCommand),

    #[serde(skip)]
    ConfigUpdated(Box<Config>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum WmCommand {
    Wm(WmCmd),
    Layout(LayoutCommand),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WmCmd {
    EnterMode(String),
    /// Pause or resume tiling. While paused the model keeps tracking windows
    /// but no frames are sent and layout commands are ignored.
    ToggleEnabled,
    /// Log the layout tree of every workspace.
    DumpTrees,
}

impl WmCommand {
    /// The mode this command switches to, if it is a mode change.
    pub fn entered_mode(&self) -> Option<&str> {
        match self {
            WmCommand::Wm(WmCmd::EnterMode(mode)) => Some(mode),
            _ => None,
        }
    }
}

/// Where window frames end up. Implemented by whatever actually moves windows.
pub trait FrameSink {
    fn apply_frame(&mut self, wid: WindowId, frame: Rect) -> Result<(), FrameError>;
}

/// Interaction state that is not part of the layout model.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub active_mode: String,
    pub focused_monitor: Option<MonitorId>,
    /// Whether frames are being applied.
    pub enabled: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            active_mode: MAIN_MODE.to_string(),
            focused_monitor: None,
            enabled: true,
        }
    }
}

pub struct Reactor<S> {
    pub(crate) config: Config,
    pub(crate) layout: LayoutEngine,
    pub(crate) context: Context,
    sink: S,
    /// Last frame the sink accepted for each window.
    applied: HashMap<WindowId, Rect>,
    status: Arc<Published<StatusSnapshot>>,
}

impl<S: FrameSink> Reactor<S> {
    pub fn new(config: Config, sink: S) -> Self {
        let layout = LayoutEngine::new(config.settings.clone(), &config.workspaces.persistent);
        Reactor {
            config,
            layout,
            context: Context::default(),
            sink,
            applied: HashMap::default(),
            status: Arc::new(Published::new(StatusSnapshot::default())),
        }
    }

    /// Starts a reactor on its own thread. Returns the event sender, the
    /// published status, and the thread handle, which finishes once every
    /// sender is dropped.
    pub fn spawn(
        config: Config,
        sink: S,
    ) -> std::io::Result<(Sender, Arc<Published<StatusSnapshot>>, thread::JoinHandle<()>)>
    where S: Send + 'static {
        let (events_tx, events) = actor::thread_channel();
        let reactor = Reactor::new(config, sink);
        let status = reactor.status();
        let handle = thread::Builder::new()
            .name("reactor".to_string())
            .spawn(move || reactor.run(events))?;
        Ok((events_tx, status, handle))
    }

    /// Handles events until every sender is dropped.
    pub fn run(mut self, events: Receiver) {
        for (span, event) in events {
            let _guard = span.enter();
            if let Err(err) = self.handle_event(event) {
                warn!(%err, "event left frames unapplied");
            }
        }
        debug!("reactor channel closed");
    }

    pub fn status(&self) -> Arc<Published<StatusSnapshot>> { self.status.clone() }

    pub fn context(&self) -> &Context { &self.context }

    pub fn layout(&self) -> &LayoutEngine { &self.layout }

    pub fn sink(&self) -> &S { &self.sink }

    fn log_event(&self, event: &Event) {
        match event {
            Event::MouseDown(..) | Event::WindowFocused(..) => trace!(?event, "Event"),
            _ => debug!(?event, "Event"),
        }
    }

    /// Applies one event and brings frames and status up to date. Frames the
    /// sink rejects are reported and retried on the next event; the model
    /// keeps its new state either way.
    #[instrument(name = "reactor::handle_event", skip(self, event))]
    pub fn handle_event(&mut self, event: Event) -> Result<(), ReactorError> {
        self.log_event(&event);
        match event {
            Event::MonitorAdded { rect } => SystemEventHandler::handle_monitor_added(self, rect),
            Event::MonitorRemoved(id) => SystemEventHandler::handle_monitor_removed(self, id),
            Event::MonitorChanged { id, rect } => {
                SystemEventHandler::handle_monitor_changed(self, id, rect)
            }
            Event::WindowCreated { wid, app, frame } => {
                WindowEventHandler::handle_window_created(self, wid, &app, frame)
            }
            Event::WindowClosed(wid) => WindowEventHandler::handle_window_closed(self, wid),
            Event::WindowMoved { wid, point } => {
                WindowEventHandler::handle_window_moved(self, wid, point)
            }
            Event::WindowFocused(wid) => WindowEventHandler::handle_window_focused(self, wid),
            Event::MouseDown(point) => WindowEventHandler::handle_mouse_down(self, point),
            Event::AppTerminated(pid) => WindowEventHandler::handle_app_terminated(self, pid),
            Event::Hotkey(key) => CommandEventHandler::handle_hotkey(self, &key),
            Event::Command(cmd) => CommandEventHandler::handle_command(self, cmd),
            Event::ConfigUpdated(config) => {
                CommandEventHandler::handle_config_updated(self, *config)
            }
        }

        let result = self.update_layout();
        self.publish_status();
        if cfg!(debug_assertions) {
            self.layout.check_invariants();
        }
        result
    }

    pub(crate) fn handle_layout_response(&mut self, response: EventResponse) {
        if let Some(monitor) = response.focus_monitor {
            self.context.focused_monitor = Some(monitor);
        }
        if let Some(wid) = response.focus_window {
            let Some(fallback) = self.context.focused_monitor else {
                return;
            };
            let follow = self.layout.focus_window(wid, fallback);
            if let Some(monitor) = follow.focus_monitor {
                self.context.focused_monitor = Some(monitor);
            }
        }
    }

    pub(crate) fn forget_frame(&mut self, wid: WindowId) { self.applied.remove(&wid); }

    /// Windows may have been moved by hand while tiling was paused, so every
    /// frame is sent again on the next update.
    pub(crate) fn forget_all_frames(&mut self) { self.applied.clear(); }

    /// Sends every frame that differs from what the sink last accepted.
    /// Sends nothing while tiling is paused.
    pub fn update_layout(&mut self) -> Result<(), ReactorError> {
        if !self.context.enabled {
            return Ok(());
        }
        let mut rejected = Vec::new();
        for (wid, frame) in self.layout.calculate_frames() {
            if self.applied.get(&wid) == Some(&frame) {
                continue;
            }
            match self.sink.apply_frame(wid, frame) {
                Ok(()) => {
                    trace!(%wid, ?frame, "applied frame");
                    self.applied.insert(wid, frame);
                }
                Err(err) => {
                    warn!(%wid, %err, "frame rejected");
                    self.applied.remove(&wid);
                    rejected.push((wid, err));
                }
            }
        }
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(ReactorError::FramesRejected(rejected))
        }
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        let workspaces = self.layout.workspaces();
        let monitors = self
            .layout
            .monitors()
            .ids()
            .map(|monitor| MonitorStatus {
                monitor,
                workspace: workspaces
                    .active_on(monitor)
                    .map(|ws| workspaces.name(ws).to_string())
                    .unwrap_or_default(),
                focused: self.context.focused_monitor == Some(monitor),
            })
            .collect();
        StatusSnapshot::new(&self.context.active_mode, self.context.enabled, monitors)
    }

    fn publish_status(&self) {
        if self.status.publish(self.status_snapshot()) {
            trace!(text = %self.status.load().text, "status changed");
        }
    }
}
